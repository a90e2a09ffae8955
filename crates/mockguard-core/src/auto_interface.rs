//! Auto-derived interfaces
//!
//! Derives a permissive contract from a type's real members: any return
//! value, any argument values, but the real arity. Useful as a first line of
//! defence for types nobody has written a contract for yet.

use tracing::debug;

use crate::descriptor::{MethodDescriptor, MethodScope};
use crate::error::{Error, Result};
use crate::interface::Interface;
use crate::matcher::Matcher;
use crate::registry::InterfaceRegistry;
use crate::types::{required_arguments, Arity, TypeRef, MAX_ARGUMENTS};

/// Derive interfaces for `ty` and each of its ancestors that has none yet.
/// Returns how many interfaces were added.
pub fn define(registry: &mut InterfaceRegistry, ty: &TypeRef) -> Result<usize> {
    let mut added = 0;
    for ancestor in ty.ancestors() {
        if define_interface(registry, &ancestor)? {
            added += 1;
        }
    }
    Ok(added)
}

/// Derive the interface of one type; `false` if it already has one
pub fn define_interface(registry: &mut InterfaceRegistry, ty: &TypeRef) -> Result<bool> {
    if registry.contains(ty) {
        return Ok(false);
    }
    let mut interface = Interface::new(ty);
    for (name, arity) in ty.own_type_methods() {
        let descriptor = derived_descriptor(name, arity)?.in_scope(MethodScope::Type);
        interface.declare(descriptor);
    }
    for (name, arity) in ty.own_instance_methods() {
        interface.declare(derived_descriptor(name, arity)?);
    }
    debug!(owner = %ty, "interface derived from real members");
    registry.insert(interface);
    Ok(true)
}

fn derived_descriptor(name: &str, arity: Arity) -> Result<MethodDescriptor> {
    let arguments = arity_arguments(arity).ok_or_else(|| Error::InvalidDeclaration {
        method: name.to_string(),
        reason: format!("arity {} exceeds {} arguments", arity, MAX_ARGUMENTS),
    })?;
    MethodDescriptor::new(name, Matcher::Anything, arguments)
}

/// Argument matchers reproducing a real arity; `None` past [`MAX_ARGUMENTS`]
pub fn arity_arguments(arity: Arity) -> Option<Vec<Matcher>> {
    let required = required_arguments(arity);
    if required > MAX_ARGUMENTS {
        return None;
    }
    let mut args = vec![Matcher::Anything; required];
    if arity < 0 {
        args.push(Matcher::splat(Matcher::Anything));
    }
    Some(args)
}
