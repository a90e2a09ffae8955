//! Sanity checker — declared contracts against the real types
//!
//! A contract that drifted from its type would keep validating doubles
//! against an implementation that no longer exists. Run once at suite start:
//! every descriptor of every interface must name a member the real type
//! defines, with the same arity. The first failure stops the run.
//!
//! Pattern-named descriptors are skipped; they cannot be resolved to one
//! concrete member.

use tracing::debug;

use crate::descriptor::MethodDescriptor;
use crate::error::{Error, Result};
use crate::interface::Interface;
use crate::registry::InterfaceRegistry;
use crate::types::{Arity, TypeRef};
use crate::value::{Object, Value};

/// Check every interface in the registry
pub fn check_registry(registry: &InterfaceRegistry) -> Result<()> {
    for interface in registry.iter() {
        check_interface(interface)?;
    }
    Ok(())
}

/// Check every descriptor, instance-level and type-level
pub fn check_interface(interface: &Interface) -> Result<()> {
    for descriptor in interface.descriptors() {
        check_method(interface.owner(), descriptor)?;
    }
    Ok(())
}

pub fn check_method(owner: &TypeRef, descriptor: &MethodDescriptor) -> Result<()> {
    verify_method_defined(owner, descriptor)?;
    verify_method_arity(owner, descriptor)?;
    debug!(owner = %owner, method = %descriptor.name(), "sanity ok");
    Ok(())
}

/// The real member must exist
pub fn verify_method_defined(owner: &TypeRef, descriptor: &MethodDescriptor) -> Result<()> {
    let Some(name) = descriptor.name().as_exact() else {
        return Ok(());
    };
    match real_arity(owner, descriptor, name) {
        Some(_) => Ok(()),
        None => Err(Error::SanityMethodUndefined {
            owner: owner.name().to_string(),
            method: name.to_string(),
        }),
    }
}

/// The real member's arity must equal the declared one
pub fn verify_method_arity(owner: &TypeRef, descriptor: &MethodDescriptor) -> Result<()> {
    let Some(name) = descriptor.name().as_exact() else {
        return Ok(());
    };
    let actual = real_arity(owner, descriptor, name).ok_or_else(|| {
        Error::SanityMethodUndefined {
            owner: owner.name().to_string(),
            method: name.to_string(),
        }
    })?;
    let declared = descriptor.arity();
    if actual != declared {
        return Err(Error::SanityArityMismatch {
            owner: owner.name().to_string(),
            method: name.to_string(),
            actual,
            declared,
        });
    }
    Ok(())
}

// Type-level members resolve on the type itself, instance members on an
// uninitialized placeholder instance.
fn real_arity(owner: &TypeRef, descriptor: &MethodDescriptor, name: &str) -> Option<Arity> {
    let receiver = if descriptor.is_type_level() {
        Value::Type(owner.clone())
    } else {
        Value::Object(Object::allocate(owner))
    };
    receiver.method_arity(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MethodName, MethodScope};
    use crate::matcher::Matcher;
    use crate::types::{builtins, variadic};

    fn text() -> TypeRef {
        TypeRef::builder("Text")
            .method("concat", variadic(0))
            .method("replace_all", variadic(1))
            .method("truncate", 1)
            .type_method("parse", 1)
            .build()
    }

    fn desc(name: &str, args: Vec<Matcher>) -> MethodDescriptor {
        MethodDescriptor::new(name, Matcher::Anything, args).unwrap()
    }

    #[test]
    fn test_undefined_method_fails() {
        let err = verify_method_defined(&text(), &desc("foo_isnt_here", vec![])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "sanity: method `foo_isnt_here` is not defined for `Text`"
        );
    }

    #[test]
    fn test_inherited_method_is_defined() {
        assert!(verify_method_defined(&text(), &desc("to_string", vec![])).is_ok());
    }

    #[test]
    fn test_arity_mismatch_names_both_arities() {
        let d = desc(
            "concat",
            vec![
                Matcher::kind_of(&builtins::string()),
                Matcher::kind_of(&builtins::numeric()),
            ],
        );
        let err = verify_method_arity(&text(), &d).unwrap_err();
        assert_eq!(
            err,
            Error::SanityArityMismatch {
                owner: "Text".into(),
                method: "concat".into(),
                actual: -1,
                declared: 2,
            }
        );
        assert_eq!(
            err.to_string(),
            "sanity: method `concat` of `Text` mismatch interface arity, -1 for 2"
        );
    }

    #[test]
    fn test_matching_arity_passes() {
        assert!(verify_method_arity(&text(), &desc("truncate", vec![Matcher::Anything])).is_ok());
        let variadic_decl = desc(
            "replace_all",
            vec![Matcher::Anything, Matcher::splat(Matcher::Anything)],
        );
        assert!(verify_method_arity(&text(), &variadic_decl).is_ok());
    }

    #[test]
    fn test_patterns_are_skipped() {
        let d = MethodDescriptor::new(
            MethodName::pattern("concat_.*").unwrap(),
            Matcher::Anything,
            vec![Matcher::Anything, Matcher::Anything],
        )
        .unwrap();
        assert!(check_method(&text(), &d).is_ok());
    }

    #[test]
    fn test_type_level_resolves_on_the_type() {
        let d = desc("parse", vec![Matcher::Anything]).in_scope(MethodScope::Type);
        assert!(check_method(&text(), &d).is_ok());
        let as_instance = desc("parse", vec![Matcher::Anything]);
        assert!(matches!(
            check_method(&text(), &as_instance),
            Err(Error::SanityMethodUndefined { .. })
        ));
    }

    #[test]
    fn test_registry_check_stops_at_first_failure() {
        let mut registry = InterfaceRegistry::new();
        registry
            .declare(&text(), |i| {
                i.method("truncate", Matcher::Anything, vec![Matcher::Anything])?;
                i.method("missing", Matcher::Anything, vec![])?;
                i.type_method("parse", Matcher::Anything, vec![])?;
                Ok(())
            })
            .unwrap();
        assert!(matches!(
            check_registry(&registry),
            Err(Error::SanityMethodUndefined { ref method, .. }) if method == "missing"
        ));
    }
}
