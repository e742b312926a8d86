//! # Regatron Bridge
//!
//! Exposes a programmable power supply, reachable only through its vendor
//! communication driver, as a line-oriented ASCII request/response service:
//! - `get <name>` / `set <name> <number>` commands, one per line
//! - Static registry of named read/write operations built at startup
//! - Per-request fault policy (reconnect the device link, or just fail)
//! - One client at a time over TCP or a Unix domain socket
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Connection Acceptor (Server)                 │
//! │                   (One Client at a Time)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                Session Loop (Connection)                     │
//! │        read line → dispatch → write response line            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │             Line Dispatcher + Fault Policy                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Registry   │          │ Instrument  │
//!   │ (Bindings)  │─────────▶│  (Context)  │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │   Device    │
//!                           │  Gateway    │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod registry;
pub mod dispatch;
pub mod device;
pub mod instrument;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BridgeError, FaultClass, Result};
pub use config::{Config, Endpoint, PortRange};
pub use dispatch::Dispatcher;
pub use registry::{Binding, Registry};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the bridge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
