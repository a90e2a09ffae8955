//! Interfaces — the declared contract of one type
//!
//! Instance methods and type-level methods are separate namespaces.
//! Redeclaring a name in a namespace replaces the previous descriptor.

use crate::descriptor::{MethodDescriptor, MethodName, MethodScope};
use crate::error::{Error, Result};
use crate::invocation::RecordedInvocation;
use crate::matcher::Matcher;
use crate::types::TypeRef;

/// Named collection of method descriptors for one declared type
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    owner: TypeRef,
    methods: Vec<MethodDescriptor>,
    type_methods: Vec<MethodDescriptor>,
}

impl Interface {
    pub fn new(owner: &TypeRef) -> Self {
        Self {
            owner: owner.clone(),
            methods: Vec::new(),
            type_methods: Vec::new(),
        }
    }

    /// Point the interface at a newer definition of the same type
    pub(crate) fn rebind(&mut self, owner: &TypeRef) {
        self.owner = owner.clone();
    }

    pub fn owner(&self) -> &TypeRef {
        &self.owner
    }

    /// Instance-level descriptors, in declaration order
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Type-level descriptors, in declaration order
    pub fn type_methods(&self) -> &[MethodDescriptor] {
        &self.type_methods
    }

    /// Every descriptor, instance-level first
    pub fn descriptors(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.iter().chain(self.type_methods.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.type_methods.is_empty()
    }

    // ── Declaration ───────────────────────────────────────

    /// Declare an instance method
    pub fn method(
        &mut self,
        name: impl Into<MethodName>,
        returns: impl Into<Matcher>,
        arguments: Vec<Matcher>,
    ) -> Result<&MethodDescriptor> {
        let descriptor = MethodDescriptor::new(name, returns, arguments)?;
        Ok(self.declare(descriptor))
    }

    /// Declare a type-level method
    pub fn type_method(
        &mut self,
        name: impl Into<MethodName>,
        returns: impl Into<Matcher>,
        arguments: Vec<Matcher>,
    ) -> Result<&MethodDescriptor> {
        let descriptor =
            MethodDescriptor::new(name, returns, arguments)?.in_scope(MethodScope::Type);
        Ok(self.declare(descriptor))
    }

    /// Insert a descriptor into its namespace, replacing any prior one with
    /// the same name. A replaced descriptor keeps its declaration position.
    pub fn declare(&mut self, descriptor: MethodDescriptor) -> &MethodDescriptor {
        let namespace = match descriptor.scope() {
            MethodScope::Instance => &mut self.methods,
            MethodScope::Type => &mut self.type_methods,
        };
        let index = match namespace.iter().position(|d| d.name() == descriptor.name()) {
            Some(index) => {
                namespace[index] = descriptor;
                index
            }
            None => {
                namespace.push(descriptor);
                namespace.len() - 1
            }
        };
        &namespace[index]
    }

    // ── Lookup ────────────────────────────────────────────

    /// Descriptor answering the invocation, if any.
    ///
    /// Type-level calls search the type-level namespace, instance calls the
    /// instance namespace. Exact names win over patterns; otherwise the
    /// first declaration wins.
    pub fn find_method(&self, invocation: &RecordedInvocation) -> Option<&MethodDescriptor> {
        let namespace = if invocation.is_type_level() {
            &self.type_methods
        } else {
            &self.methods
        };
        let method = invocation.method.as_str();
        namespace
            .iter()
            .find(|d| d.name().as_exact() == Some(method))
            .or_else(|| {
                namespace
                    .iter()
                    .find(|d| d.name().is_pattern() && d.name().matches(method))
            })
    }

    /// Find the descriptor and verify the invocation against it
    pub fn verify(&self, invocation: &RecordedInvocation) -> Result<()> {
        match self.find_method(invocation) {
            Some(descriptor) => descriptor.verify(invocation),
            None => Err(Error::MethodNotDeclared {
                owner: self.owner.name().to_string(),
                method: invocation.method.clone(),
            }),
        }
    }

    /// Canonical text form, one descriptor per line
    pub fn render(&self) -> String {
        let mut out = format!("interface {}\n", self.owner);
        for d in self.descriptors() {
            out.push_str(&format!("  {}\n", d));
        }
        out
    }
}
