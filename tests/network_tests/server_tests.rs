//! Tests for Server and Connection
//!
//! These tests verify:
//! - Request/response over TCP and Unix domain sockets
//! - Session continuity after failed requests
//! - One client at a time, device context kept across sessions
//! - Fatal session faults close the client and the acceptor moves on
//! - Stop handle, stale socket removal and idempotent cleanup

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use regatron_bridge::config::{Config, Endpoint};
use regatron_bridge::device::{CommStatus, DeviceLink, SimulatedGateway, SimulatorHandle};
use regatron_bridge::instrument::{standard_registry, Instrument};
use regatron_bridge::network::{remove_socket_file, Client, Server, ServerHandle};
use regatron_bridge::protocol::Response;
use regatron_bridge::{Binding, BridgeError, Registry, Result};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const TIMEOUT: Duration = Duration::from_secs(5);

fn spawn_server<C>(mut server: Server<C>) -> (ServerHandle, JoinHandle<Result<()>>)
where
    C: DeviceLink + Send + 'static,
{
    let handle = server.handle();
    let thread = thread::spawn(move || server.run());
    (handle, thread)
}

fn spawn_instrument(config: Config) -> (Option<SocketAddr>, SimulatorHandle, ServerHandle, JoinHandle<Result<()>>) {
    let gateway = SimulatedGateway::new();
    let sim = gateway.handle();
    let instrument = Instrument::new(gateway, config.device_ports);
    let registry = Arc::new(standard_registry().unwrap());

    let server = Server::bind(config, registry, instrument).unwrap();
    let addr = server.local_addr();
    let (handle, thread) = spawn_server(server);
    (addr, sim, handle, thread)
}

fn connect(addr: SocketAddr) -> Client {
    let client = Client::connect(&Endpoint::Tcp(addr.to_string())).unwrap();
    client.set_timeout(Some(TIMEOUT)).unwrap();
    client
}

fn tcp_config() -> Config {
    Config::builder().tcp("127.0.0.1:0").build()
}

/// Context whose `crash` command raises an error that ends the session
#[derive(Default)]
struct Flaky {
    value: f64,
}

impl DeviceLink for Flaky {
    fn ensure_connected(&mut self) -> bool {
        true
    }

    fn comm_status(&mut self) -> CommStatus {
        CommStatus::Ok
    }

    fn force_disconnect(&mut self) {}
}

fn flaky_registry() -> Arc<Registry<Flaky>> {
    let mut builder = Registry::builder();
    builder
        .register(Binding::setting(
            "value",
            |f: &mut Flaky| Ok(f.value),
            |f: &mut Flaky, v| {
                f.value = v;
                Ok(())
            },
        ))
        .unwrap()
        .register(Binding::reader("crash", |_: &mut Flaky| {
            Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "transport failure",
            )))
        }))
        .unwrap();
    Arc::new(builder.build())
}

// =============================================================================
// TCP Session Tests
// =============================================================================

#[test]
fn test_tcp_get_and_set() {
    let (addr, _sim, handle, thread) = spawn_instrument(tcp_config());
    let mut client = connect(addr.unwrap());

    assert_eq!(client.set("sysVoltageRef", 12.5).unwrap(), Response::value("sysVoltageRef", "ACK"));
    assert_eq!(client.get("sysVoltageRef").unwrap().result(), Some("12.5"));
    assert_eq!(client.get("moduleID").unwrap().result(), Some("0"));

    handle.stop();
    thread.join().unwrap().unwrap();
}

#[test]
fn test_session_continues_after_failures() {
    let (addr, _sim, handle, thread) = spawn_instrument(tcp_config());
    let mut client = connect(addr.unwrap());

    for failing in [
        "get doesNotExist",
        "set moduleID 1.0",
        "set debug abc",
        "set debug 1.0 extra",
        "set sysVoltageRef 5000",
        "hello",
    ] {
        assert!(client.request(failing).unwrap().is_nack(), "request {:?}", failing);
        assert_eq!(client.get("debug").unwrap().result(), Some("0"));
    }

    handle.stop();
    thread.join().unwrap().unwrap();
}

#[test]
fn test_device_fault_recovers_within_session() {
    let (addr, sim, handle, thread) = spawn_instrument(tcp_config());
    let mut client = connect(addr.unwrap());

    assert!(!client.get("moduleID").unwrap().is_nack());
    sim.fail_next(regatron_bridge::device::InjectedFault::Communication);

    assert!(client.get("sysReadings").unwrap().is_nack());
    assert!(!client.get("sysReadings").unwrap().is_nack());
    assert_eq!(sim.connect_attempts(), 2);

    handle.stop();
    thread.join().unwrap().unwrap();
}

#[test]
fn test_pipelined_requests_answered_in_order() {
    let (addr, _sim, handle, thread) = spawn_instrument(tcp_config());

    let mut stream = TcpStream::connect(addr.unwrap()).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();
    stream
        .write_all(b"set debug 7\nget debug\nget nope\r\nget debug\n")
        .unwrap();

    let mut reader = BufReader::new(stream);
    let mut lines = Vec::new();
    for _ in 0..4 {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        lines.push(line);
    }
    assert_eq!(lines, vec!["debug ACK\n", "debug 7\n", "NACK\n", "debug 7\n"]);

    handle.stop();
    thread.join().unwrap().unwrap();
}

#[test]
fn test_oversized_line_is_rejected() {
    let config = Config::builder().tcp("127.0.0.1:0").max_line_len(32).build();
    let (addr, _sim, handle, thread) = spawn_instrument(config);
    let mut client = connect(addr.unwrap());

    let long = format!("get {}", "x".repeat(100));
    assert!(client.request(&long).unwrap().is_nack());
    assert_eq!(client.get("debug").unwrap().result(), Some("0"));

    handle.stop();
    thread.join().unwrap().unwrap();
}

// =============================================================================
// Acceptor Tests
// =============================================================================

#[test]
fn test_sequential_clients_share_device_context() {
    let (addr, sim, handle, thread) = spawn_instrument(tcp_config());
    let addr = addr.unwrap();

    {
        let mut first = connect(addr);
        assert!(!first.set("debug", 4.25).unwrap().is_nack());
    }

    let mut second = connect(addr);
    assert_eq!(second.get("debug").unwrap().result(), Some("4.25"));
    assert_eq!(sim.connect_attempts(), 1);

    handle.stop();
    thread.join().unwrap().unwrap();
}

#[test]
fn test_fatal_fault_ends_session_only() {
    let server = Server::bind(tcp_config(), flaky_registry(), Flaky::default()).unwrap();
    let addr = server.local_addr().unwrap();
    let (handle, thread) = spawn_server(server);

    let mut first = connect(addr);
    assert!(!first.set("value", 2.0).unwrap().is_nack());
    assert!(first.get("crash").is_err());

    let mut second = connect(addr);
    assert_eq!(second.get("value").unwrap().result(), Some("2"));

    handle.stop();
    thread.join().unwrap().unwrap();
}

#[test]
fn test_stop_interrupts_active_session() {
    let (addr, _sim, handle, thread) = spawn_instrument(tcp_config());
    let mut client = connect(addr.unwrap());
    assert!(!client.get("debug").unwrap().is_nack());

    handle.stop();
    thread.join().unwrap().unwrap();

    assert!(client.get("debug").is_err());
    assert!(!handle.is_running());
}

#[test]
fn test_stop_without_client_and_twice() {
    let (_addr, _sim, handle, thread) = spawn_instrument(tcp_config());
    assert!(handle.is_running());

    handle.stop();
    handle.stop();
    thread.join().unwrap().unwrap();
}

// =============================================================================
// Unix Socket Tests
// =============================================================================

#[cfg(unix)]
#[test]
fn test_unix_socket_session_and_cleanup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bridge.sock");
    let config = Config::builder().unix(&path).build();

    let (addr, _sim, handle, thread) = spawn_instrument(config);
    assert!(addr.is_none());
    assert!(path.exists());

    let endpoint = Endpoint::Unix(path.clone());
    let mut client = Client::connect(&endpoint).unwrap();
    client.set_timeout(Some(TIMEOUT)).unwrap();
    assert_eq!(client.set("debug", 1.5).unwrap().result(), Some("ACK"));
    assert_eq!(client.get("debug").unwrap().result(), Some("1.5"));
    drop(client);

    handle.stop();
    thread.join().unwrap().unwrap();
    assert!(!path.exists());
}

#[cfg(unix)]
#[test]
fn test_stale_socket_file_is_replaced() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stale.sock");
    fs::write(&path, b"left over").unwrap();

    let config = Config::builder().unix(&path).build();
    let mut server = Server::bind(config, flaky_registry(), Flaky::default()).unwrap();
    assert_eq!(server.socket_path(), Some(path.as_path()));

    server.cleanup();
    assert!(!path.exists());
    assert_eq!(server.socket_path(), None);

    server.cleanup();
    drop(server);
    assert!(!path.exists());
}

#[test]
fn test_remove_missing_socket_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.sock");
    remove_socket_file(&path).unwrap();
    remove_socket_file(&path).unwrap();
}

#[test]
fn test_bind_busy_port_fails() {
    let first = Server::bind(tcp_config(), flaky_registry(), Flaky::default()).unwrap();
    let addr = first.local_addr().unwrap();

    let config = Config::builder().tcp(addr.to_string()).build();
    assert!(Server::bind(config, flaky_registry(), Flaky::default()).is_err());
}
