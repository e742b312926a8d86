//! Registry Module
//!
//! Named get/set operations exposed to the wire protocol.
//!
//! ## Responsibilities
//! - Hold each operation as a [`Binding`]: a name plus an optional read
//!   function and an optional write function
//! - Reject duplicate names, malformed names and empty bindings at startup
//! - Resolve `(verb, name)` pairs in constant time
//!
//! ## Lifecycle
//! Built once through [`RegistryBuilder`], immutable afterwards, shared
//! read-only (typically behind an `Arc`) by every session.
//!
//! Bindings are generic over a context type `C`: the state they operate on
//! (for the instrument, the device link and its cached values) is passed in
//! by the caller on every invocation instead of being captured.

mod binding;
mod table;

pub use binding::{Binding, ReadFn, WriteFn};
pub use table::{Registry, RegistryBuilder};
