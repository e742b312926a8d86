//! Command definitions
//!
//! Represents one parsed request line.

/// Request verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Set,
}

impl Verb {
    /// Wire prefix of the verb, including the separating space
    pub fn prefix(&self) -> &'static str {
        match self {
            Verb::Get => "get ",
            Verb::Set => "set ",
        }
    }
}

/// A parsed request line
///
/// Borrows the name from the line it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub enum Command<'a> {
    /// Read a named value
    Get { name: &'a str },

    /// Write a numeric value to a named operation
    Set { name: &'a str, value: f64 },

    /// Starts with a known verb but the rest does not follow the grammar
    Malformed { verb: Verb, rest: &'a str },

    /// Does not start with `get ` or `set `
    Unsupported,
}

impl Command<'_> {
    /// Get the verb, if the line carried one
    pub fn verb(&self) -> Option<Verb> {
        match self {
            Command::Get { .. } => Some(Verb::Get),
            Command::Set { .. } => Some(Verb::Set),
            Command::Malformed { verb, .. } => Some(*verb),
            Command::Unsupported => None,
        }
    }

    /// Get the command name for well-formed requests
    pub fn name(&self) -> Option<&str> {
        match self {
            Command::Get { name } | Command::Set { name, .. } => Some(name),
            Command::Malformed { .. } | Command::Unsupported => None,
        }
    }
}
