//! Network Module
//!
//! Listening endpoint, session loop and client.
//!
//! ## Architecture
//! - Single thread, fully blocking
//! - One client session at a time; the next `accept` happens only after
//!   the previous session ends
//! - TCP or Unix domain socket, chosen by the configured endpoint
//! - Requests routed through the [`Dispatcher`](crate::Dispatcher)

mod stream;
mod server;
mod connection;
mod client;

pub use stream::{Listener, Stream, remove_socket_file};
pub use server::{Server, ServerHandle};
pub use connection::Connection;
pub use client::Client;
