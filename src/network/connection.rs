//! Connection Handler
//!
//! Runs one client session: read a line, dispatch it, write the answer.

use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::net::Shutdown;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::device::DeviceLink;
use crate::dispatch::Dispatcher;
use crate::error::{BridgeError, Result};
use crate::protocol::{read_line, write_response, Line, Response};
use super::Stream;

/// Handles a single client session
pub struct Connection {
    /// Stream reader (buffered for line framing)
    reader: BufReader<Stream>,

    /// Stream writer (buffered, flushed after every response)
    writer: BufWriter<Stream>,

    /// Peer address for logging
    peer_addr: String,

    /// Longest accepted request line
    max_line_len: usize,

    closed: bool,
}

impl Connection {
    /// Create a new session over `stream`
    pub fn new(stream: Stream, peer_addr: impl Into<String>, max_line_len: usize) -> Result<Self> {
        stream.set_nodelay()?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            peer_addr: peer_addr.into(),
            max_line_len,
            closed: false,
        })
    }

    /// Configure connection timeouts (0 = block forever)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Another handle to the underlying socket, used to interrupt the session
    pub fn try_clone_stream(&self) -> Result<Stream> {
        Ok(self.reader.get_ref().try_clone()?)
    }

    /// Run the session until the peer leaves, `running` is cleared, or a
    /// fault the dispatcher cannot recover from occurs
    pub fn handle<C: DeviceLink>(
        &mut self,
        dispatcher: &Dispatcher<C>,
        ctx: &mut C,
        running: &AtomicBool,
    ) -> Result<()> {
        tracing::debug!("Session started with {}", self.peer_addr);

        while running.load(Ordering::SeqCst) {
            let line = match read_line(&mut self.reader, self.max_line_len) {
                Ok(Line::Message(line)) => line,
                Ok(Line::Oversized(len)) => {
                    tracing::warn!(
                        "Line of {} bytes from {} exceeds limit of {}",
                        len, self.peer_addr, self.max_line_len
                    );
                    if !self.respond(&Response::nack())? {
                        return Ok(());
                    }
                    continue;
                }
                Ok(Line::Eof) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(BridgeError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Connection to {} lost: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(BridgeError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // Windows reports TimedOut where Unix reports WouldBlock
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::trace!("Received {:?} from {}", line, self.peer_addr);

            let response = dispatcher.handle(&line, ctx)?;

            if !self.respond(&response)? {
                return Ok(());
            }
        }

        tracing::debug!("Session with {} interrupted by shutdown", self.peer_addr);
        Ok(())
    }

    /// Write one response; `Ok(false)` when the peer has already gone
    fn respond(&mut self, response: &Response) -> Result<bool> {
        match write_response(&mut self.writer, response) {
            Ok(()) => Ok(true),
            Err(BridgeError::Io(ref e)) if is_disconnect(e.kind()) => {
                tracing::debug!(
                    "Client {} disconnected before response could be sent: {}",
                    self.peer_addr, e
                );
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                Err(e)
            }
        }
    }

    /// Half-close the write side, then close the socket
    ///
    /// Failures are logged and otherwise ignored. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.writer.flush() {
            tracing::debug!("Failed to flush {} before close: {}", self.peer_addr, e);
        }

        let stream = self.writer.get_ref();
        match stream.shutdown(Shutdown::Write) {
            Ok(()) => tracing::debug!("Socket to {} shut down for writing", self.peer_addr),
            Err(e) => tracing::debug!("Failed to shutdown socket to {}: {}", self.peer_addr, e),
        }
        match stream.shutdown(Shutdown::Both) {
            Ok(()) => tracing::info!("Closed connection to {}", self.peer_addr),
            Err(e) => tracing::debug!("Failed to close socket to {}: {}", self.peer_addr, e),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected
    )
}
