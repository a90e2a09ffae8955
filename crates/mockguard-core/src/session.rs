//! Session — the one object a test harness holds
//!
//! Owns the interface registry and the configuration, and exposes the
//! lifecycle a suite goes through: declare contracts, sanity-check them once,
//! verify what each test recorded, reset between suites.

use tracing::info;

use crate::auto_interface;
use crate::config::Config;
use crate::error::Result;
use crate::interface::Interface;
use crate::invocation::InvocationSource;
use crate::registry::InterfaceRegistry;
use crate::sanity;
use crate::types::TypeRef;
use crate::verifier::{VerificationResult, Verifier};

#[derive(Debug, Clone, Default)]
pub struct Session {
    registry: InterfaceRegistry,
    config: Config,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            registry: InterfaceRegistry::new(),
            config,
        }
    }

    pub fn with_registry(registry: InterfaceRegistry, config: Config) -> Self {
        Self { registry, config }
    }

    /// Declare (or extend) the interface of `ty`. Nothing is stored if
    /// `build` fails.
    pub fn declare_interface<F>(&mut self, ty: &TypeRef, build: F) -> Result<&Interface>
    where
        F: FnOnce(&mut Interface) -> Result<()>,
    {
        self.registry.declare(ty, build)
    }

    /// Derive permissive interfaces for `ty` and its undeclared ancestors
    pub fn auto_interface(&mut self, ty: &TypeRef) -> Result<usize> {
        auto_interface::define(&mut self.registry, ty)
    }

    /// Check every declared contract against its real type.
    ///
    /// # Errors
    /// The first `SanityMethodUndefined` or `SanityArityMismatch` found.
    pub fn run_sanity_checks(&self) -> Result<()> {
        sanity::check_registry(&self.registry)?;
        info!(interfaces = self.registry.len(), "sanity checks passed");
        Ok(())
    }

    pub fn verifier(&self) -> Verifier<'_> {
        Verifier::new(&self.registry, &self.config)
    }

    /// Verify everything `source` recorded.
    ///
    /// # Errors
    /// `Violations` carrying every failure when any invocation breaks its
    /// contract. Advisories alone do not fail.
    pub fn verify_all(&self, source: &dyn InvocationSource) -> Result<VerificationResult> {
        let result = self.verifier().verify_all(source);
        info!(
            checked = result.checked,
            errors = result.errors().len(),
            advisories = result.warnings().len(),
            "verification finished"
        );
        result.into_result()
    }

    pub fn set_require_declared_interfaces(&mut self, required: bool) {
        self.config.require_declared_interfaces = required;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &InterfaceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut InterfaceRegistry {
        &mut self.registry
    }

    /// Forget every declared interface; configuration is kept
    pub fn reset(&mut self) {
        self.registry.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::invocation::RecordedInvocation;
    use crate::matcher::Matcher;
    use crate::types::{builtins, variadic};
    use crate::value::Value;

    fn text() -> TypeRef {
        TypeRef::builder("Text")
            .method("concat", variadic(0))
            .method("length", 0)
            .build()
    }

    fn declared() -> Session {
        let mut session = Session::default();
        session
            .declare_interface(&text(), |i| {
                i.method("length", &builtins::integer(), vec![])?;
                i.method(
                    "concat",
                    &text(),
                    vec![Matcher::splat(Matcher::kind_of(&text()))],
                )?;
                Ok(())
            })
            .unwrap();
        session
    }

    #[test]
    fn test_lifecycle() {
        let mut session = declared();
        assert!(session.run_sanity_checks().is_ok());

        let calls = vec![
            RecordedInvocation::new(Value::object(&text()), "length").returning(vec![3.into()]),
            RecordedInvocation::new(Value::object(&text()), "concat")
                .with_arguments(vec![Value::object(&text()), Value::object(&text())])
                .returning(vec![Value::object(&text())]),
        ];
        let result = session.verify_all(&calls).unwrap();
        assert_eq!(result.checked, 2);

        session.reset();
        assert!(session.registry().is_empty());
        assert!(session.verify_all(&calls).is_ok());
    }

    #[test]
    fn test_failures_aggregate() {
        let session = declared();
        let calls = vec![
            RecordedInvocation::new(Value::object(&text()), "length")
                .returning(vec!["three".into()]),
            RecordedInvocation::new(Value::object(&text()), "trim"),
        ];
        let err = session.verify_all(&calls).unwrap_err();
        let violations = err.violations();
        assert_eq!(violations.len(), 2);
        assert!(matches!(violations[0], Error::ReturnMismatch { .. }));
        assert!(matches!(violations[1], Error::MethodNotDeclared { .. }));
    }

    #[test]
    fn test_strictness_toggle() {
        let mut session = Session::default();
        let calls = vec![RecordedInvocation::new(Value::object(&text()), "length")];
        assert_eq!(session.verify_all(&calls).unwrap().warnings().len(), 1);

        session.set_require_declared_interfaces(true);
        assert!(session.config().require_declared_interfaces);
        let err = session.verify_all(&calls).unwrap_err();
        assert!(matches!(
            err.violations()[0],
            Error::InterfaceChainEmpty { .. }
        ));
    }

    #[test]
    fn test_auto_interface_then_sanity() {
        let mut session = Session::new(Config::strict());
        assert_eq!(session.auto_interface(&text()).unwrap(), 2);
        assert!(session.run_sanity_checks().is_ok());
        session
            .declare_interface(&text(), |i| {
                i.method("length", Matcher::Anything, vec![Matcher::Anything])?;
                Ok(())
            })
            .unwrap();
        assert!(matches!(
            session.run_sanity_checks(),
            Err(Error::SanityArityMismatch { actual: 0, declared: 1, .. })
        ));
    }
}
