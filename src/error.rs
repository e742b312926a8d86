//! Error types for the bridge
//!
//! Provides a unified error type for all operations, plus the fault
//! classification the session loop uses to pick a recovery policy.

use thiserror::Error;

use crate::device::CommStatus;

/// Result type alias using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Unified error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(String),

    // -------------------------------------------------------------------------
    // Operation Faults
    // -------------------------------------------------------------------------
    /// The device gateway reported a command or communication failure
    #[error("Device fault ({status}): {message}")]
    Device { status: CommStatus, message: String },

    /// The operation rejected a syntactically valid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Runtime fault: {0}")]
    Runtime(String),
}

/// Recovery class of an error raised while executing a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Fail the request and force the device link closed
    Device,

    /// Fail the request, link untouched
    InvalidArgument,

    /// Fail the request, link untouched
    Runtime,

    /// Not recoverable at the dispatch boundary; ends the session
    Fatal,
}

impl BridgeError {
    /// Build a device fault carrying the gateway status
    pub fn device(status: CommStatus, message: impl Into<String>) -> Self {
        BridgeError::Device {
            status,
            message: message.into(),
        }
    }

    /// Classify this error for the session's fault policy
    pub fn fault_class(&self) -> FaultClass {
        match self {
            BridgeError::Device { .. } => FaultClass::Device,
            BridgeError::InvalidArgument(_) => FaultClass::InvalidArgument,
            BridgeError::Runtime(_) => FaultClass::Runtime,
            BridgeError::Io(_)
            | BridgeError::Protocol(_)
            | BridgeError::Config(_)
            | BridgeError::Registry(_) => FaultClass::Fatal,
        }
    }
}
