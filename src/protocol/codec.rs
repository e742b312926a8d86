//! Protocol codec
//!
//! Line framing and request parsing for the wire protocol.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────────────────────────┬────┐
//! │ ASCII text (no '\n')         │ \n │
//! └──────────────────────────────┴────┘
//! ```
//!
//! A `\r` right before the newline is dropped. Lines longer than the
//! configured limit are skipped through their newline and reported as
//! [`Line::Oversized`] so the session can answer them with `NACK`.

use std::io::{BufRead, ErrorKind, Write};

use crate::error::{BridgeError, Result};
use super::{Command, Response, Verb};

/// Outcome of reading one line from a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A complete line, terminator stripped
    Message(String),

    /// A line over the length limit; carries its length in bytes
    Oversized(usize),

    /// Peer closed the stream (a partial trailing line is dropped)
    Eof,
}

// =============================================================================
// Request Parsing
// =============================================================================

/// Parse one request line
///
/// Never fails: lines outside the grammar come back as
/// [`Command::Malformed`] or [`Command::Unsupported`].
pub fn parse_command(line: &str) -> Command<'_> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    if let Some(rest) = line.strip_prefix(Verb::Get.prefix()) {
        if is_name(rest) {
            return Command::Get { name: rest };
        }
        return Command::Malformed { verb: Verb::Get, rest };
    }

    if let Some(rest) = line.strip_prefix(Verb::Set.prefix()) {
        if let Some((name, number)) = rest.split_once(' ') {
            if is_name(name) {
                if let Some(value) = parse_number(number) {
                    return Command::Set { name, value };
                }
            }
        }
        return Command::Malformed { verb: Verb::Set, rest };
    }

    Command::Unsupported
}

/// Parse a decimal literal covering the whole input
///
/// Accepts `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`.
/// `inf`/`nan` spellings and values that overflow to infinity are rejected.
pub fn parse_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut pos = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        pos += 1;
    }

    let int_digits = count_digits(&bytes[pos..]);
    pos += int_digits;

    let mut frac_digits = 0;
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        frac_digits = count_digits(&bytes[pos..]);
        pos += frac_digits;
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(pos), Some(b'e') | Some(b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+') | Some(b'-')) {
            pos += 1;
        }
        let exp_digits = count_digits(&bytes[pos..]);
        if exp_digits == 0 {
            return None;
        }
        pos += exp_digits;
    }

    if pos != bytes.len() {
        return None;
    }

    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

fn is_name(text: &str) -> bool {
    !text.is_empty() && !text.chars().any(char::is_whitespace)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one newline-terminated line from a stream
///
/// Blocks until a newline or end of stream. Input that is not UTF-8 is
/// decoded lossily; it can never match a command name.
pub fn read_line<R: BufRead>(reader: &mut R, max_len: usize) -> Result<Line> {
    let mut buf: Vec<u8> = Vec::new();
    let mut oversized: Option<usize> = None;

    loop {
        let available = match reader.fill_buf() {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        if available.is_empty() {
            if !buf.is_empty() || oversized.is_some() {
                tracing::trace!("Dropping unterminated line at end of stream");
            }
            return Ok(Line::Eof);
        }

        let (chunk, complete) = match available.iter().position(|&b| b == b'\n') {
            Some(idx) => (&available[..idx], true),
            None => (available, false),
        };
        let consumed = chunk.len() + usize::from(complete);

        match oversized.as_mut() {
            Some(total) => *total += chunk.len(),
            None if buf.len() + chunk.len() > max_len => {
                oversized = Some(buf.len() + chunk.len());
                buf.clear();
            }
            None => buf.extend_from_slice(chunk),
        }

        reader.consume(consumed);

        if complete {
            if let Some(total) = oversized {
                return Ok(Line::Oversized(total));
            }
            let mut text = String::from_utf8_lossy(&buf).into_owned();
            if text.ends_with('\r') {
                text.pop();
            }
            return Ok(Line::Message(text));
        }
    }
}

/// Write a response line to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(response.encode().as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Write a request line to a stream, appending the newline if missing
pub fn write_request<W: Write>(writer: &mut W, request: &str) -> Result<()> {
    writer.write_all(request.as_bytes())?;
    if !request.ends_with('\n') {
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a complete response line from a stream
pub fn read_response<R: BufRead>(reader: &mut R, max_len: usize) -> Result<Response> {
    match read_line(reader, max_len)? {
        Line::Message(line) => Response::decode(&line),
        Line::Oversized(len) => Err(BridgeError::Protocol(format!(
            "Response line too long: {} bytes (max {})",
            len, max_len
        ))),
        Line::Eof => Err(BridgeError::Io(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            "connection closed before response",
        ))),
    }
}
