//! Recorded invocations — the boundary with the host mock framework
//!
//! The engine never looks inside a mock framework. An adapter translates the
//! framework's stubs and expectations into [`RecordedInvocation`]s and hands
//! them over through [`InvocationSource`].

use std::fmt;

use crate::value::Value;

/// One simulated call captured by a test double
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedInvocation {
    /// Instance or type the call was made on
    pub owner: Value,
    pub method: String,
    /// Values the double was configured to return on consecutive calls;
    /// empty when no return was configured
    pub returned: Vec<Value>,
    /// Positional arguments the call was matched against
    pub arguments: Vec<Value>,
}

impl RecordedInvocation {
    pub fn new(owner: impl Into<Value>, method: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            method: method.into(),
            returned: Vec::new(),
            arguments: Vec::new(),
        }
    }

    pub fn returning(mut self, values: Vec<Value>) -> Self {
        self.returned = values;
        self
    }

    pub fn with_arguments(mut self, values: Vec<Value>) -> Self {
        self.arguments = values;
        self
    }

    /// Call made on a type rather than on an instance
    pub fn is_type_level(&self) -> bool {
        matches!(self.owner, Value::Type(_))
    }
}

impl fmt::Display for RecordedInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Value::Type(ty) => write!(f, "{}.{}", ty, self.method),
            owner => write!(f, "{}#{}", owner.type_name(), self.method),
        }
    }
}

/// Supplier of recorded invocations, implemented by mock-framework adapters
pub trait InvocationSource {
    fn recorded_invocations(&self) -> Vec<RecordedInvocation>;
}

impl InvocationSource for [RecordedInvocation] {
    fn recorded_invocations(&self) -> Vec<RecordedInvocation> {
        self.to_vec()
    }
}

impl InvocationSource for Vec<RecordedInvocation> {
    fn recorded_invocations(&self) -> Vec<RecordedInvocation> {
        self.clone()
    }
}
