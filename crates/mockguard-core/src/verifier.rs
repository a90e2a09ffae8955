//! Verification driver — checks recorded invocations against contracts
//!
//! For each recorded invocation:
//!
//! 1. **Resolve** the owner type (contract-type override, type, or class)
//! 2. **Chain** the interfaces of that type and its ancestors
//! 3. **Find** the first descriptor answering the method, in chain order
//! 4. **Verify** arguments and return values against it
//!
//! An empty chain is the one policy-controlled outcome: a failure under
//! strict configuration, an advisory otherwise. Everything else that goes
//! wrong is always a failure.
//!
//! [`Verifier::verify_all`] accumulates diagnostics over every invocation
//! rather than stopping at the first, giving a complete picture per test.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::invocation::{InvocationSource, RecordedInvocation};
use crate::registry::InterfaceRegistry;

// ── Verification Result Types ─────────────────────────────

/// Result of verifying a batch of invocations — accumulates all diagnostics
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationResult {
    pub checked: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl VerificationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no errors were found (advisories are OK)
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Returns only error-level diagnostics
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect()
    }

    /// Returns only advisory diagnostics
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect()
    }

    /// `Ok(self)` when valid, otherwise every error as one aggregate
    pub fn into_result(self) -> Result<Self> {
        if self.is_valid() {
            return Ok(self);
        }
        let errors: Vec<Error> = self
            .diagnostics
            .into_iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.error)
            .collect();
        Err(Error::Violations(errors))
    }

    fn add_error(&mut self, subject: String, error: Error) {
        for single in error.violations() {
            self.diagnostics
                .push(Diagnostic::new(Severity::Error, subject.clone(), single.clone()));
        }
    }

    fn add_warning(&mut self, subject: String, error: Error) {
        self.diagnostics
            .push(Diagnostic::new(Severity::Warning, subject, error));
    }
}

/// A single verification diagnostic
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Invocation label, e.g. `Person#full_info`
    pub subject: String,
    pub message: String,
    #[serde(skip)]
    pub error: Error,
}

impl Diagnostic {
    fn new(severity: Severity, subject: String, error: Error) -> Self {
        Self {
            severity,
            kind: DiagnosticKind::of(&error),
            subject,
            message: error.to_string(),
            error,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{} [{}] {}: {}", prefix, self.kind, self.subject, self.message)
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Category of verification issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Declaration,
    UndeclaredMethod,
    ArgumentsArity,
    ArgumentValue,
    ReturnValue,
    UndeclaredInterface,
    Sanity,
    Other,
}

impl DiagnosticKind {
    pub fn of(error: &Error) -> Self {
        match error {
            Error::MatcherConstruction(_) | Error::InvalidDeclaration { .. } => {
                DiagnosticKind::Declaration
            }
            Error::MethodNotDeclared { .. } => DiagnosticKind::UndeclaredMethod,
            Error::ArgumentsArity { .. } => DiagnosticKind::ArgumentsArity,
            Error::ArgumentMismatch { .. } => DiagnosticKind::ArgumentValue,
            Error::ReturnMismatch { .. } => DiagnosticKind::ReturnValue,
            Error::InterfaceChainEmpty { .. } => DiagnosticKind::UndeclaredInterface,
            Error::SanityMethodUndefined { .. } | Error::SanityArityMismatch { .. } => {
                DiagnosticKind::Sanity
            }
            Error::Violations(_) | Error::Manifest(_) | Error::Config(_) => DiagnosticKind::Other,
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DiagnosticKind::Declaration => write!(f, "declaration"),
            DiagnosticKind::UndeclaredMethod => write!(f, "undeclared-method"),
            DiagnosticKind::ArgumentsArity => write!(f, "arity"),
            DiagnosticKind::ArgumentValue => write!(f, "argument"),
            DiagnosticKind::ReturnValue => write!(f, "return"),
            DiagnosticKind::UndeclaredInterface => write!(f, "undeclared-interface"),
            DiagnosticKind::Sanity => write!(f, "sanity"),
            DiagnosticKind::Other => write!(f, "other"),
        }
    }
}

/// Outcome of verifying one invocation that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Matched a descriptor and conformed to it
    Verified,
    /// No interface anywhere in the chain; lenient mode let it pass
    Unchecked(Error),
}

// ── Driver ────────────────────────────────────────────────

/// Verifies invocations against a registry under one configuration
#[derive(Debug, Clone, Copy)]
pub struct Verifier<'a> {
    registry: &'a InterfaceRegistry,
    config: &'a Config,
}

impl<'a> Verifier<'a> {
    pub fn new(registry: &'a InterfaceRegistry, config: &'a Config) -> Self {
        Self { registry, config }
    }

    /// Verify one invocation.
    ///
    /// # Errors
    /// `InterfaceChainEmpty` (strict only), `MethodNotDeclared`, or any
    /// descriptor failure.
    pub fn verify_invocation(&self, invocation: &RecordedInvocation) -> Result<Verdict> {
        let owner = InterfaceRegistry::resolve_owner_type(invocation);
        let chain = self.registry.chain_for(&owner);

        if chain.is_empty() {
            let error = Error::InterfaceChainEmpty {
                owner: owner.name().to_string(),
            };
            if self.config.require_declared_interfaces {
                return Err(error);
            }
            warn!("{}", error);
            return Ok(Verdict::Unchecked(error));
        }

        let descriptor = chain
            .iter()
            .find_map(|interface| interface.find_method(invocation))
            .ok_or_else(|| Error::MethodNotDeclared {
                owner: owner.name().to_string(),
                method: invocation.method.clone(),
            })?;

        descriptor.verify(invocation)?;
        debug!(invocation = %invocation, descriptor = %descriptor, "invocation conforms");
        Ok(Verdict::Verified)
    }

    /// Verify every invocation the source recorded, accumulating diagnostics
    pub fn verify_all(&self, source: &dyn InvocationSource) -> VerificationResult {
        let mut result = VerificationResult::new();
        for invocation in source.recorded_invocations() {
            result.checked += 1;
            let subject = invocation.to_string();
            match self.verify_invocation(&invocation) {
                Ok(Verdict::Verified) => {}
                Ok(Verdict::Unchecked(advisory)) => result.add_warning(subject, advisory),
                Err(error) => result.add_error(subject, error),
            }
        }
        result
    }
}
