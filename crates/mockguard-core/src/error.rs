//! Error types for the mockguard engine
//!
//! All fallible operations return `Result<T, Error>`.
//! Every variant carries enough detail (owner, method, expected vs. actual)
//! to pinpoint the drifted contract without re-running anything.

use std::fmt;

use thiserror::Error;

use crate::types::Arity;

/// Mockguard error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A contract declaration used a value no matcher variant can represent
    #[error("can't create matcher for {0}")]
    MatcherConstruction(String),

    /// A method declaration is structurally invalid
    #[error("invalid declaration for `{method}`: {reason}")]
    InvalidDeclaration { method: String, reason: String },

    /// Invocation names a method absent from every interface in the chain
    #[error("method `{method}` was not defined for `{owner}` interface")]
    MethodNotDeclared { owner: String, method: String },

    /// Invocation argument count violates the declared arity
    #[error("error on mock method `{method}`, expected {expected}, {sent} sent")]
    ArgumentsArity {
        method: String,
        expected: ArityBound,
        sent: usize,
    },

    /// An argument value was rejected by its position's matcher
    #[error("argument value {value} of `{method}` doesn't match with {matcher}")]
    ArgumentMismatch {
        method: String,
        value: String,
        matcher: String,
    },

    /// A configured return value was rejected by the return matcher
    #[error("return value {value} of `{method}` doesn't match with {matcher}")]
    ReturnMismatch {
        method: String,
        value: String,
        matcher: String,
    },

    /// No interface declared anywhere in the owner's ancestor chain
    #[error("unsafe mocking on `{owner}`, please declare an interface for it")]
    InterfaceChainEmpty { owner: String },

    /// Sanity: declared method does not exist on the real type
    #[error("sanity: method `{method}` is not defined for `{owner}`")]
    SanityMethodUndefined { owner: String, method: String },

    /// Sanity: real arity differs from the declared one
    #[error("sanity: method `{method}` of `{owner}` mismatch interface arity, {actual} for {declared}")]
    SanityArityMismatch {
        owner: String,
        method: String,
        actual: Arity,
        declared: Arity,
    },

    /// Several independent violations found in one pass
    #[error("{} contract violations:\n{}", .0.len(), render_all(.0))]
    Violations(Vec<Error>),

    /// Manifest document is malformed or references unknown names
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Configuration value could not be interpreted
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Flattens nested aggregates into the individual violations.
    pub fn violations(&self) -> Vec<&Error> {
        match self {
            Error::Violations(all) => all.iter().flat_map(|e| e.violations()).collect(),
            other => vec![other],
        }
    }

    /// Combine independent failures: none is `Ok`, one is itself.
    pub(crate) fn collect(mut failures: Vec<Error>) -> Result<()> {
        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(Error::Violations(failures)),
        }
    }
}

fn render_all(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Expected side of an arity failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityBound {
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
}

impl fmt::Display for ArityBound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArityBound::Exactly(n) => write!(f, "{} arguments", n),
            ArityBound::AtLeast(n) => write!(f, "at least {}", n),
            ArityBound::AtMost(n) => write!(f, "at most {}", n),
        }
    }
}

/// Result type alias for mockguard operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_message_matches_mock_wording() {
        let err = Error::ArgumentsArity {
            method: "some".into(),
            expected: ArityBound::Exactly(2),
            sent: 1,
        };
        assert_eq!(
            err.to_string(),
            "error on mock method `some`, expected 2 arguments, 1 sent"
        );
    }

    #[test]
    fn test_collect_keeps_single_failure_unwrapped() {
        let only = Error::Manifest("x".into());
        assert_eq!(Error::collect(vec![only.clone()]), Err(only));
        assert_eq!(Error::collect(vec![]), Ok(()));
    }

    #[test]
    fn test_violations_flatten_nested_aggregates() {
        let nested = Error::Violations(vec![
            Error::Manifest("a".into()),
            Error::Violations(vec![Error::Config("b".into()), Error::Config("c".into())]),
        ]);
        assert_eq!(nested.violations().len(), 3);
        assert!(nested.to_string().starts_with("2 contract violations:"));
    }
}
