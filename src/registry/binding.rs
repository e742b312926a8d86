//! Operation binding
//!
//! A named pair of optional accessors, plus adapters that build bindings
//! from plain getters, setters and actions.

use std::fmt;

use crate::error::{BridgeError, Result};
use crate::protocol::{Verb, ACK};

/// Zero-argument read producing the display string
pub type ReadFn<C> = Box<dyn Fn(&mut C) -> Result<String> + Send + Sync>;

/// One-argument write producing the acknowledgement or result string
pub type WriteFn<C> = Box<dyn Fn(&mut C, f64) -> Result<String> + Send + Sync>;

/// A named operation exposed to the wire protocol
pub struct Binding<C> {
    name: String,
    read: Option<ReadFn<C>>,
    write: Option<WriteFn<C>>,
}

impl<C> Binding<C> {
    /// Create a binding from optional accessors
    ///
    /// Validation (name rules, at least one accessor) happens on registration.
    pub fn new(name: impl Into<String>, read: Option<ReadFn<C>>, write: Option<WriteFn<C>>) -> Self {
        Self {
            name: name.into(),
            read,
            write,
        }
    }

    /// Read-only binding
    pub fn reader<R>(name: impl Into<String>, read: R) -> Self
    where
        R: Fn(&mut C) -> Result<String> + Send + Sync + 'static,
    {
        Self::new(name, Some(Box::new(read)), None)
    }

    /// Write-only binding
    pub fn writer<W>(name: impl Into<String>, write: W) -> Self
    where
        W: Fn(&mut C, f64) -> Result<String> + Send + Sync + 'static,
    {
        Self::new(name, None, Some(Box::new(write)))
    }

    /// Binding with both accessors
    pub fn read_write<R, W>(name: impl Into<String>, read: R, write: W) -> Self
    where
        R: Fn(&mut C) -> Result<String> + Send + Sync + 'static,
        W: Fn(&mut C, f64) -> Result<String> + Send + Sync + 'static,
    {
        Self::new(name, Some(Box::new(read)), Some(Box::new(write)))
    }

    /// Read-only numeric value, displayed with `{}`
    pub fn value<G>(name: impl Into<String>, getter: G) -> Self
    where
        C: 'static,
        G: Fn(&mut C) -> Result<f64> + Send + Sync + 'static,
    {
        Self::reader(name, move |ctx: &mut C| getter(ctx).map(|v| v.to_string()))
    }

    /// Numeric value with a setter; writes answer `ACK`
    pub fn setting<G, S>(name: impl Into<String>, getter: G, setter: S) -> Self
    where
        C: 'static,
        G: Fn(&mut C) -> Result<f64> + Send + Sync + 'static,
        S: Fn(&mut C, f64) -> Result<()> + Send + Sync + 'static,
    {
        Self::read_write(
            name,
            move |ctx: &mut C| getter(ctx).map(|v| v.to_string()),
            move |ctx: &mut C, value| setter(ctx, value).map(|()| ACK.to_string()),
        )
    }

    /// Write-only action; the argument is passed through, writes answer `ACK`
    pub fn action<A>(name: impl Into<String>, action: A) -> Self
    where
        C: 'static,
        A: Fn(&mut C, f64) -> Result<()> + Send + Sync + 'static,
    {
        Self::writer(name, move |ctx: &mut C, value| action(ctx, value).map(|()| ACK.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn can_read(&self) -> bool {
        self.read.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.write.is_some()
    }

    /// Whether this binding serves requests with `verb`
    pub fn supports(&self, verb: Verb) -> bool {
        match verb {
            Verb::Get => self.can_read(),
            Verb::Set => self.can_write(),
        }
    }

    /// Invoke the read accessor
    pub fn read(&self, ctx: &mut C) -> Result<String> {
        match &self.read {
            Some(read) => read(ctx),
            None => Err(BridgeError::Runtime(format!("{} has no read operation", self.name))),
        }
    }

    /// Invoke the write accessor
    pub fn write(&self, ctx: &mut C, value: f64) -> Result<String> {
        match &self.write {
            Some(write) => write(ctx, value),
            None => Err(BridgeError::Runtime(format!("{} has no write operation", self.name))),
        }
    }
}

impl<C> fmt::Debug for Binding<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("read", &self.can_read())
            .field("write", &self.can_write())
            .finish()
    }
}
