//! Response definitions
//!
//! Represents responses to clients.

use crate::error::{BridgeError, Result};

/// Result text of writes that carry no value
pub const ACK: &str = "ACK";

/// Failure token, sent alone on its line
pub const NACK: &str = "NACK";

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `<name> <result>`
    Value { name: String, result: String },

    /// Any failed request
    Nack,
}

impl Response {
    /// Create a success response
    pub fn value(name: impl Into<String>, result: impl Into<String>) -> Self {
        Response::Value {
            name: name.into(),
            result: result.into(),
        }
    }

    /// Create a failure response
    pub fn nack() -> Self {
        Response::Nack
    }

    pub fn is_nack(&self) -> bool {
        matches!(self, Response::Nack)
    }

    /// Result text of a success response
    pub fn result(&self) -> Option<&str> {
        match self {
            Response::Value { result, .. } => Some(result),
            Response::Nack => None,
        }
    }

    /// Render the full response line, newline included
    pub fn encode(&self) -> String {
        match self {
            Response::Value { name, result } => format!("{} {}\n", name, result),
            Response::Nack => format!("{}\n", NACK),
        }
    }

    /// Parse a response line (with or without its trailing newline)
    pub fn decode(line: &str) -> Result<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        if line == NACK {
            return Ok(Response::Nack);
        }

        match line.split_once(' ') {
            Some((name, result)) if !name.is_empty() => Ok(Response::value(name, result)),
            _ => Err(BridgeError::Protocol(format!(
                "Malformed response line: {:?}",
                line
            ))),
        }
    }
}
