//! Interface registry — declared type → interface, with ancestor chains
//!
//! The registry is plain state owned by whoever drives verification
//! (usually a [`crate::Session`]). Declaration needs `&mut`, so there is
//! exactly one writer at a time. When a test runner parallelizes across
//! worker processes, each worker builds its own registry.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Result;
use crate::interface::Interface;
use crate::invocation::RecordedInvocation;
use crate::types::TypeRef;
use crate::value::Value;

/// Map from declared type to its interface
#[derive(Debug, Clone, Default)]
pub struct InterfaceRegistry {
    interfaces: BTreeMap<TypeRef, Interface>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or create the interface for `ty` and apply `build` to it.
    ///
    /// Repeated declaration is cumulative; names that collide are replaced.
    /// If `build` fails, the registry keeps the interface as it was before.
    pub fn declare<F>(&mut self, ty: &TypeRef, build: F) -> Result<&Interface>
    where
        F: FnOnce(&mut Interface) -> Result<()>,
    {
        let mut interface = match self.interfaces.get(ty) {
            Some(existing) => {
                let mut interface = existing.clone();
                interface.rebind(ty);
                interface
            }
            None => Interface::new(ty),
        };
        build(&mut interface)?;
        debug!(
            owner = %ty,
            methods = interface.methods().len(),
            type_methods = interface.type_methods().len(),
            "interface declared"
        );
        self.interfaces.remove(ty);
        self.interfaces.insert(ty.clone(), interface);
        Ok(&self.interfaces[ty])
    }

    /// Store a complete interface, replacing any existing one for its owner
    pub fn insert(&mut self, interface: Interface) {
        self.interfaces.insert(interface.owner().clone(), interface);
    }

    pub fn get(&self, ty: &TypeRef) -> Option<&Interface> {
        self.interfaces.get(ty)
    }

    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.interfaces.contains_key(ty)
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Interfaces ordered by type name
    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.values()
    }

    /// Forget every declaration
    pub fn reset(&mut self) {
        self.interfaces.clear();
    }

    /// Interfaces of `ty` and then of each ancestor, in method-resolution
    /// order, skipping ancestors that declare none.
    pub fn chain_for(&self, ty: &TypeRef) -> Vec<&Interface> {
        ty.ancestors()
            .iter()
            .filter_map(|t| self.interfaces.get(t))
            .collect()
    }

    /// Type whose contract governs the invocation: the owner's contract-type
    /// override, else the owner itself when it is a type, else its class.
    pub fn resolve_owner_type(invocation: &RecordedInvocation) -> TypeRef {
        match &invocation.owner {
            Value::Object(obj) => obj
                .contract_type()
                .cloned()
                .unwrap_or_else(|| obj.class().clone()),
            Value::Type(ty) => ty.clone(),
            other => other.class_of(),
        }
    }

    /// Canonical text of every declared interface
    pub fn render(&self) -> String {
        self.iter().map(Interface::render).collect()
    }

    /// SHA-256 hex digest of [`InterfaceRegistry::render`]. Stable across
    /// runs as long as the declarations are unchanged.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.render().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
