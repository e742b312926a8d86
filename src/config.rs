//! Configuration for the bridge
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;

use crate::error::{BridgeError, Result};

/// Main configuration for a bridge instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Listening endpoint (exactly one per process)
    pub endpoint: Endpoint,

    /// Connection read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,

    /// Longest accepted request line in bytes, newline excluded
    pub max_line_len: usize,

    // -------------------------------------------------------------------------
    // Device Configuration
    // -------------------------------------------------------------------------
    /// Serial port numbers searched for the device on every connect
    pub device_ports: PortRange,
}

/// Where the server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP listen address (host:port)
    Tcp(String),

    /// Filesystem path of a Unix domain socket
    Unix(PathBuf),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Inclusive range of device port numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub from: u32,
    pub to: u32,
}

impl PortRange {
    /// Create a range, rejecting `from > to`
    pub fn new(from: u32, to: u32) -> Result<Self> {
        if from > to {
            return Err(BridgeError::Config(format!(
                "invalid device port range: from {} to {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// A range covering exactly one port
    pub fn single(port: u32) -> Self {
        Self { from: port, to: port }
    }

    pub fn is_single(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{:02}", self.from)
        } else {
            write!(f, "{:02}..={:02}", self.from, self.to)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Tcp("0.0.0.0:20005".to_string()),
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            max_line_len: 4096,
            device_ports: PortRange::single(1),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Listen on a TCP address (host:port)
    pub fn tcp(mut self, addr: impl Into<String>) -> Self {
        self.config.endpoint = Endpoint::Tcp(addr.into());
        self
    }

    /// Listen on a Unix domain socket path
    pub fn unix(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.endpoint = Endpoint::Unix(path.into());
        self
    }

    /// Set the endpoint directly
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.config.endpoint = endpoint;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the maximum request line length (in bytes)
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.config.max_line_len = len;
        self
    }

    /// Set the device port search range
    pub fn device_ports(mut self, ports: PortRange) -> Self {
        self.config.device_ports = ports;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
