//! Command registry
//!
//! Ordered bindings plus a name index built at registration time.

use std::collections::HashMap;

use crate::error::{BridgeError, Result};
use crate::protocol::Verb;
use super::Binding;

/// Immutable table of named operations
pub struct Registry<C> {
    /// Bindings in registration order
    bindings: Vec<Binding<C>>,

    /// Name → position in `bindings`
    index: HashMap<String, usize>,
}

impl<C> Registry<C> {
    /// Start building a registry
    pub fn builder() -> RegistryBuilder<C> {
        RegistryBuilder::default()
    }

    /// Find the binding serving `verb` for `name`
    ///
    /// Exact, case-sensitive match. A name registered without the accessor
    /// the verb needs resolves to `None`, same as an unknown name.
    pub fn lookup(&self, verb: Verb, name: &str) -> Option<&Binding<C>> {
        self.get(name).filter(|binding| binding.supports(verb))
    }

    /// Find a binding by name regardless of verb
    pub fn get(&self, name: &str) -> Option<&Binding<C>> {
        self.index.get(name).map(|&idx| &self.bindings[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate over bindings in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Binding<C>> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Builder for Registry
pub struct RegistryBuilder<C> {
    registry: Registry<C>,
}

impl<C> Default for RegistryBuilder<C> {
    fn default() -> Self {
        Self {
            registry: Registry {
                bindings: Vec::new(),
                index: HashMap::new(),
            },
        }
    }
}

impl<C> RegistryBuilder<C> {
    /// Add a binding
    ///
    /// Fails if the name is empty, contains whitespace or is already taken,
    /// or if the binding has neither accessor.
    pub fn register(&mut self, binding: Binding<C>) -> Result<&mut Self> {
        let name = binding.name();

        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(BridgeError::Registry(format!(
                "invalid command name {:?}",
                name
            )));
        }

        if !binding.can_read() && !binding.can_write() {
            return Err(BridgeError::Registry(format!(
                "{} has neither a read nor a write operation",
                name
            )));
        }

        if self.registry.index.contains_key(name) {
            return Err(BridgeError::Registry(format!(
                "{} is already registered",
                name
            )));
        }

        tracing::trace!("Registered {:?}", binding);

        let idx = self.registry.bindings.len();
        self.registry.index.insert(name.to_string(), idx);
        self.registry.bindings.push(binding);
        Ok(self)
    }

    /// Add several bindings, stopping at the first failure
    pub fn register_all(&mut self, bindings: impl IntoIterator<Item = Binding<C>>) -> Result<&mut Self> {
        for binding in bindings {
            self.register(binding)?;
        }
        Ok(self)
    }

    pub fn build(self) -> Registry<C> {
        self.registry
    }
}
