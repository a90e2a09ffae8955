//! Method descriptors — one method's declared contract
//!
//! A descriptor pairs a method name (exact or pattern) with a return matcher
//! and ordered argument matchers. Arity is derived from the argument
//! matchers, never declared directly:
//!
//! | argument shape                 | arity      | required | max       |
//! |--------------------------------|------------|----------|-----------|
//! | `k` plain matchers             | `k`        | `k`      | `k`       |
//! | `k` plain, then `Optional`     | `-(k + 1)` | `k`      | count     |
//! | `k` plain, then ... `Splat`    | `-(k + 1)` | `k`      | unbounded |
//!
//! Verification runs the argument check and the return check independently;
//! both are always attempted.

use std::fmt;

use regex::Regex;
use tracing::trace;

use crate::error::{ArityBound, Error, Result};
use crate::invocation::RecordedInvocation;
use crate::matcher::Matcher;
use crate::types::Arity;
use crate::value::Value;

// ── Names ─────────────────────────────────────────────────

/// Declared method name: an exact name or a whole-name pattern
#[derive(Debug, Clone)]
pub enum MethodName {
    Exact(String),
    Pattern { source: String, regex: Regex },
}

impl MethodName {
    pub fn exact(name: impl Into<String>) -> Self {
        MethodName::Exact(name.into())
    }

    /// Compile a pattern that must match the *whole* method name
    pub fn pattern(source: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
            Error::InvalidDeclaration {
                method: format!("/{}/", source),
                reason: e.to_string(),
            }
        })?;
        Ok(MethodName::Pattern {
            source: source.to_string(),
            regex,
        })
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, MethodName::Pattern { .. })
    }

    pub fn matches(&self, method: &str) -> bool {
        match self {
            MethodName::Exact(name) => name == method,
            MethodName::Pattern { regex, .. } => regex.is_match(method),
        }
    }

    /// The exact name, if this is not a pattern
    pub fn as_exact(&self) -> Option<&str> {
        match self {
            MethodName::Exact(name) => Some(name),
            MethodName::Pattern { .. } => None,
        }
    }
}

impl PartialEq for MethodName {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MethodName::Exact(a), MethodName::Exact(b)) => a == b,
            (MethodName::Pattern { source: a, .. }, MethodName::Pattern { source: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodName::Exact(name) => f.write_str(name),
            MethodName::Pattern { source, .. } => write!(f, "/{}/", source),
        }
    }
}

impl From<&str> for MethodName {
    fn from(name: &str) -> Self {
        MethodName::Exact(name.to_string())
    }
}

impl From<String> for MethodName {
    fn from(name: String) -> Self {
        MethodName::Exact(name)
    }
}

/// Namespace a descriptor lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodScope {
    Instance,
    Type,
}

// ── Descriptor ────────────────────────────────────────────

/// One method's contract
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    name: MethodName,
    returns: Matcher,
    arguments: Vec<Matcher>,
    scope: MethodScope,
}

impl MethodDescriptor {
    /// Build an instance-level descriptor.
    ///
    /// # Errors
    /// `InvalidDeclaration` if a `Splat` is not the last argument matcher,
    /// or is nested inside another matcher.
    pub fn new(
        name: impl Into<MethodName>,
        returns: impl Into<Matcher>,
        arguments: Vec<Matcher>,
    ) -> Result<Self> {
        let name = name.into();
        if let Some(nested) = arguments.iter().find(|m| m.nests_splat()) {
            return Err(Error::InvalidDeclaration {
                method: name.to_string(),
                reason: format!("splat nested inside {} can only be a whole argument", nested),
            });
        }
        if let Some(pos) = arguments.iter().position(Matcher::is_splat) {
            if pos + 1 != arguments.len() {
                return Err(Error::InvalidDeclaration {
                    method: name.to_string(),
                    reason: format!(
                        "splat at position {} must be the last argument matcher",
                        pos
                    ),
                });
            }
        }
        Ok(Self {
            name,
            returns: returns.into(),
            arguments,
            scope: MethodScope::Instance,
        })
    }

    /// Same descriptor, living in the given namespace
    pub fn in_scope(mut self, scope: MethodScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn name(&self) -> &MethodName {
        &self.name
    }

    pub fn returns(&self) -> &Matcher {
        &self.returns
    }

    pub fn arguments(&self) -> &[Matcher] {
        &self.arguments
    }

    pub fn scope(&self) -> MethodScope {
        self.scope
    }

    pub fn is_type_level(&self) -> bool {
        self.scope == MethodScope::Type
    }

    // ── Arity ─────────────────────────────────────────────

    /// Derived arity; negative once an optional or splat position appears
    pub fn arity(&self) -> Arity {
        match self.arguments.iter().position(Matcher::is_optional_position) {
            Some(before) => -(before as Arity + 1),
            None => self.arguments.len() as Arity,
        }
    }

    pub fn required_arity(&self) -> usize {
        let arity = self.arity();
        if arity >= 0 {
            arity as usize
        } else {
            (-arity - 1) as usize
        }
    }

    /// Upper bound on argument count; `None` when a splat makes it unbounded
    pub fn max_arguments(&self) -> Option<usize> {
        match self.arguments.last() {
            Some(last) if last.is_splat() => None,
            _ => Some(self.arguments.len()),
        }
    }

    // ── Verification ──────────────────────────────────────

    /// Check arguments and return values of one invocation.
    ///
    /// Both checks run; a single failure is returned as is, two failures
    /// come back as `Error::Violations`.
    pub fn verify(&self, invocation: &RecordedInvocation) -> Result<()> {
        trace!(method = %self.name, "verifying {}", invocation);
        let failures = [
            self.verify_arguments(invocation),
            self.verify_return(invocation),
        ]
        .into_iter()
        .filter_map(|r| r.err())
        .collect();
        Error::collect(failures)
    }

    /// Arity check, then each argument against its position's matcher.
    /// A splat position consumes every remaining argument.
    pub fn verify_arguments(&self, invocation: &RecordedInvocation) -> Result<()> {
        let args = &invocation.arguments;
        self.check_arity(&invocation.method, args.len())?;

        let mut rest: &[Value] = args;
        for matcher in &self.arguments {
            if rest.is_empty() {
                break;
            }
            let (checked, remaining) = if matcher.is_splat() {
                (rest, &rest[rest.len()..])
            } else {
                rest.split_at(1)
            };
            let inner = match matcher {
                Matcher::Splat(inner) => inner.as_ref(),
                other => other,
            };
            if let Some(value) = inner.first_mismatch(checked) {
                return Err(Error::ArgumentMismatch {
                    method: invocation.method.clone(),
                    value: value.to_string(),
                    matcher: matcher.to_string(),
                });
            }
            rest = remaining;
        }
        Ok(())
    }

    /// Every configured return value against the return matcher
    pub fn verify_return(&self, invocation: &RecordedInvocation) -> Result<()> {
        match self.returns.first_mismatch(&invocation.returned) {
            Some(value) => Err(Error::ReturnMismatch {
                method: invocation.method.clone(),
                value: value.to_string(),
                matcher: self.returns.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn check_arity(&self, method: &str, sent: usize) -> Result<()> {
        let arity = self.arity();
        let violated = if arity >= 0 {
            (sent != arity as usize).then_some(ArityBound::Exactly(arity as usize))
        } else if sent < self.required_arity() {
            Some(ArityBound::AtLeast(self.required_arity()))
        } else {
            self.max_arguments()
                .filter(|max| sent > *max)
                .map(ArityBound::AtMost)
        };
        match violated {
            Some(expected) => Err(Error::ArgumentsArity {
                method: method.to_string(),
                expected,
                sent,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sigil = match self.scope {
            MethodScope::Instance => '#',
            MethodScope::Type => '.',
        };
        write!(f, "{}{}(", sigil, self.name)?;
        for (i, m) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", m)?;
        }
        write!(f, ") -> {}", self.returns)
    }
}
