//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (ASCII, one request per line)
//!
//! ### Request Format
//! ```text
//! get <name>\n
//! set <name> <number>\n
//! ```
//!
//! `<name>` is a registered command name (no whitespace). `<number>` is a
//! decimal literal: optional sign, optional fraction, optional exponent.
//! Nothing may follow the number.
//!
//! ### Response Format
//! ```text
//! <name> <result>\n     success
//! NACK\n                any failure
//! ```
//!
//! Writes that carry no value answer `ACK` as their result text.

mod command;
mod response;
mod codec;

pub use command::{Command, Verb};
pub use response::{Response, ACK, NACK};
pub use codec::{
    parse_command, parse_number,
    read_line, write_request, read_response, write_response,
    Line,
};
