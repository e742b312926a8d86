//! Acceptor
//!
//! Binds the configured endpoint and serves one client session at a time.
//! A [`ServerHandle`] stops the loop from another thread (signal handler,
//! tests) by clearing the running flag, shutting down the active session's
//! socket and waking the blocked `accept`.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{Config, Endpoint};
use crate::device::DeviceLink;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::registry::Registry;
use super::{remove_socket_file, Connection, Listener, Stream};

/// State shared between the accept loop and its handles
struct Shared {
    running: AtomicBool,

    /// Socket of the session in progress, if any
    active: Mutex<Option<Stream>>,

    /// Where to connect to unblock `accept`
    wake: Endpoint,
}

/// Single-session acceptor over a device context `C`
pub struct Server<C> {
    config: Config,
    listener: Listener,
    dispatcher: Dispatcher<C>,

    /// Device context; survives across sessions
    context: C,

    shared: Arc<Shared>,

    /// Unix socket path to unlink on cleanup
    socket_path: Option<PathBuf>,
}

/// Cloneable stop control for a running [`Server`]
#[derive(Clone)]
pub struct ServerHandle {
    shared: Arc<Shared>,
}

impl<C: DeviceLink> Server<C> {
    /// Bind the configured endpoint
    ///
    /// For a Unix endpoint an existing file at the path is removed first.
    pub fn bind(config: Config, registry: Arc<Registry<C>>, context: C) -> Result<Self> {
        let listener = Listener::bind(&config.endpoint)?;

        let (wake, socket_path) = match &config.endpoint {
            Endpoint::Tcp(addr) => {
                let bound = listener.local_addr();
                let wake = bound
                    .map(|a| Endpoint::Tcp(loopback(a).to_string()))
                    .unwrap_or_else(|| Endpoint::Tcp(addr.clone()));
                (wake, None)
            }
            Endpoint::Unix(path) => (Endpoint::Unix(path.clone()), Some(path.clone())),
        };

        match listener.local_addr() {
            Some(addr) => tracing::info!("Server listening on tcp://{}", addr),
            None => tracing::info!("Server listening on {}", config.endpoint),
        }

        Ok(Self {
            config,
            listener,
            dispatcher: Dispatcher::new(registry),
            context,
            shared: Arc::new(Shared {
                running: AtomicBool::new(true),
                active: Mutex::new(None),
                wake,
            }),
            socket_path,
        })
    }

    /// Accept and serve clients until stopped (blocking)
    ///
    /// Session faults are logged and the next client is accepted.
    pub fn run(&mut self) -> Result<()> {
        while self.shared.running.load(Ordering::SeqCst) {
            tracing::debug!("Waiting for client on {}", self.config.endpoint);

            let (stream, peer) = match self.listener.accept() {
                Ok(pair) => pair,
                Err(_) if !self.shared.running.load(Ordering::SeqCst) => break,
                Err(e) => {
                    tracing::error!("Accept failed: {}", e);
                    continue;
                }
            };

            if !self.shared.running.load(Ordering::SeqCst) {
                tracing::debug!("Shutdown requested, dropping connection from {}", peer);
                break;
            }

            tracing::info!("New client connection from {}", peer);
            self.serve(stream, peer);
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    fn serve(&mut self, stream: Stream, peer: String) {
        let mut connection = match Connection::new(stream, peer, self.config.max_line_len) {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!("Failed to set up session: {}", e);
                return;
            }
        };

        if let Err(e) =
            connection.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)
        {
            tracing::warn!("Failed to set timeouts for {}: {}", connection.peer_addr(), e);
        }

        match connection.try_clone_stream() {
            Ok(stream) => *self.shared.active.lock() = Some(stream),
            Err(e) => tracing::debug!("Session cannot be interrupted by stop: {}", e),
        }

        let result = connection.handle(&self.dispatcher, &mut self.context, &self.shared.running);
        if let Err(e) = result {
            tracing::error!("Session with {} ended by fault: {}", connection.peer_addr(), e);
        }

        connection.close();
        *self.shared.active.lock() = None;
    }
}

impl<C> Server<C> {
    /// Get a stop handle for this server
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Bound TCP address (None for Unix endpoints)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Unix socket path, while it has not been cleaned up
    pub fn socket_path(&self) -> Option<&Path> {
        self.socket_path.as_deref()
    }

    /// Remove the Unix socket file, if any. Safe to call more than once.
    pub fn cleanup(&mut self) {
        if let Some(path) = self.socket_path.take() {
            tracing::info!("Removing UNIX socket endpoint {}", path.display());
            if let Err(e) = remove_socket_file(&path) {
                tracing::error!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

impl<C> Drop for Server<C> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl ServerHandle {
    /// Stop the server: end the active session and unblock `accept`
    ///
    /// Calling it again is a no-op.
    pub fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Stopping server");

        if let Some(stream) = self.shared.active.lock().as_ref() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                tracing::debug!("Failed to shutdown active session: {}", e);
            }
        }

        // Self-connect so the blocked accept returns and sees the cleared flag
        if let Err(e) = Stream::connect(&self.shared.wake) {
            tracing::debug!("Wake-up connect to {} failed: {}", self.shared.wake, e);
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

/// Map a wildcard bind address to the matching loopback address
fn loopback(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}
