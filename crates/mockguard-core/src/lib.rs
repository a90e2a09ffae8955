//! Mockguard Core - interface contracts for test doubles
//!
//! A test double only proves something if it behaves like the thing it
//! replaces. Mockguard keeps doubles honest: interfaces declare what each
//! member accepts and returns, recorded calls are checked against them, and
//! the interfaces themselves are checked against the real types.
//!
//! # Architecture
//!
//! ```text
//! TypeRef ──→ InterfaceRegistry ←── Interface ←── MethodDescriptor ←── Matcher
//!                   │                                   ↑
//!                   ├──→ sanity     (contracts vs real types, suite start)
//!                   │
//!                   └──→ Verifier   (recorded invocations vs contracts, per test)
//!                              ↑
//!                    InvocationSource / Manifest
//! ```
//!
//! # Guarantees
//!
//! - **Order-preserving**: interface lookup follows the ancestor chain, nearest first
//! - **Atomic**: a failed declaration leaves the registry untouched
//! - **Complete**: batch verification reports every violation, not just the first
//! - **Deterministic**: the registry fingerprint depends only on its contents

pub mod auto_interface;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod interface;
pub mod invocation;
pub mod manifest;
pub mod matcher;
pub mod registry;
pub mod sanity;
pub mod session;
pub mod types;
pub mod value;
pub mod verifier;

pub use config::Config;
pub use descriptor::{MethodDescriptor, MethodName, MethodScope};
pub use error::{ArityBound, Error, Result};
pub use interface::Interface;
pub use invocation::{InvocationSource, RecordedInvocation};
pub use manifest::Manifest;
pub use matcher::{Matcher, ValueMatcher};
pub use registry::InterfaceRegistry;
pub use session::Session;
pub use types::{builtins, variadic, Arity, TypeBuilder, TypeRef};
pub use value::{Object, Value};
pub use verifier::{Diagnostic, DiagnosticKind, Severity, VerificationResult, Verdict, Verifier};

/// Version of this library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
