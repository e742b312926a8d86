//! Client
//!
//! Blocking request/response client for the bridge protocol.

use std::io::{BufReader, BufWriter};
use std::time::Duration;

use crate::config::Endpoint;
use crate::error::Result;
use crate::protocol::{read_response, write_request, Response, Verb};
use super::Stream;

/// Longest response line the client accepts
const MAX_RESPONSE_LEN: usize = 64 * 1024;

/// Connected bridge client
pub struct Client {
    reader: BufReader<Stream>,
    writer: BufWriter<Stream>,
}

impl Client {
    /// Connect to a bridge listening on `endpoint`
    pub fn connect(endpoint: &Endpoint) -> Result<Self> {
        let stream = Stream::connect(endpoint)?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Bound every read and write (None = block forever)
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        self.writer.get_ref().set_write_timeout(timeout)?;
        Ok(())
    }

    /// Send a raw request line and wait for its response
    pub fn request(&mut self, line: &str) -> Result<Response> {
        write_request(&mut self.writer, line)?;
        read_response(&mut self.reader, MAX_RESPONSE_LEN)
    }

    /// `get <name>`
    pub fn get(&mut self, name: &str) -> Result<Response> {
        self.request(&format!("{}{}", Verb::Get.prefix(), name))
    }

    /// `set <name> <value>`
    pub fn set(&mut self, name: &str, value: f64) -> Result<Response> {
        self.request(&format!("{}{} {}", Verb::Set.prefix(), name, value))
    }
}
