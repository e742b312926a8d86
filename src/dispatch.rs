//! Dispatch Module
//!
//! Matches request lines against the registry, invokes the binding and
//! applies the per-request fault policy.
//!
//! ## Fault policy
//! | Fault            | Response | Device link          | Session   |
//! |------------------|----------|----------------------|-----------|
//! | no match         | `NACK`   | untouched            | continues |
//! | device fault     | `NACK`   | forced closed        | continues |
//! | invalid argument | `NACK`   | untouched            | continues |
//! | runtime fault    | `NACK`   | untouched            | continues |
//! | anything else    | none     | untouched            | ends      |
//!
//! Before any matching, the device link is brought up if needed. When that
//! fails the request is answered with `NACK` and no binding runs.

use std::sync::Arc;

use crate::device::DeviceLink;
use crate::error::{BridgeError, FaultClass, Result};
use crate::protocol::{parse_command, Command, Response, Verb};
use crate::registry::{Binding, Registry};

/// Line dispatcher over a shared registry
pub struct Dispatcher<C> {
    registry: Arc<Registry<C>>,
}

impl<C> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<C> Dispatcher<C> {
    /// Create a dispatcher over `registry`
    pub fn new(registry: Arc<Registry<C>>) -> Self {
        Self { registry }
    }

    /// Get the registry this dispatcher resolves against
    pub fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    /// Match one line and invoke its binding
    ///
    /// Unmatched lines yield `Ok(NACK)`. Errors are faults raised by the
    /// binding and are left for the caller to classify.
    pub fn dispatch(&self, line: &str, ctx: &mut C) -> Result<Response> {
        match parse_command(line) {
            Command::Get { name } => match self.registry.lookup(Verb::Get, name) {
                Some(binding) => invoke(binding, |b| b.read(ctx)),
                None => Ok(no_match(line)),
            },
            Command::Set { name, value } => match self.registry.lookup(Verb::Set, name) {
                Some(binding) => invoke(binding, |b| b.write(ctx, value)),
                None => Ok(no_match(line)),
            },
            Command::Malformed { .. } => Ok(no_match(line)),
            Command::Unsupported => {
                tracing::warn!("Unsupported message {:?}", line);
                Ok(Response::nack())
            }
        }
    }
}

impl<C: DeviceLink> Dispatcher<C> {
    /// Handle one line end to end: link check, dispatch, fault recovery
    ///
    /// Returns `Err` only for faults that must end the session.
    pub fn handle(&self, line: &str, ctx: &mut C) -> Result<Response> {
        if !ctx.ensure_connected() {
            tracing::warn!("Device link unavailable, rejecting {:?}", line);
            return Ok(Response::nack());
        }

        match self.dispatch(line, ctx) {
            Ok(response) => Ok(response),
            Err(fault) => recover(line, ctx, fault),
        }
    }
}

fn invoke<C, F>(binding: &Binding<C>, call: F) -> Result<Response>
where
    F: FnOnce(&Binding<C>) -> Result<String>,
{
    let _span = tracing::debug_span!("command", name = binding.name()).entered();
    let result = call(binding)?;
    tracing::trace!("{} -> {}", binding.name(), result);
    Ok(Response::value(binding.name(), result))
}

fn no_match(line: &str) -> Response {
    tracing::warn!("No compatible action for {:?}", line);
    Response::nack()
}

fn recover<C: DeviceLink>(line: &str, ctx: &mut C, fault: BridgeError) -> Result<Response> {
    match fault.fault_class() {
        FaultClass::Device => {
            tracing::error!("Device fault while handling {:?}: {}", line, fault);
            let status = ctx.comm_status();
            tracing::error!("Communication status after fault: {}", status);
            ctx.force_disconnect();
            Ok(Response::nack())
        }
        FaultClass::InvalidArgument => {
            tracing::error!("Invalid argument in {:?}: {}", line, fault);
            Ok(Response::nack())
        }
        FaultClass::Runtime => {
            tracing::error!("Unexpected fault while handling {:?}: {}", line, fault);
            Ok(Response::nack())
        }
        FaultClass::Fatal => Err(fault),
    }
}
