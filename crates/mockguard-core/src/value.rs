//! Runtime values observed by doubles — arguments and configured returns
//!
//! A [`Value`] is whatever a test double was called with or told to return.
//! Matchers inspect values through a small reflective surface: the value's
//! type, its ancestry, and which members it answers to.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{builtins, Arity, TypeRef};

// ── Core Types ────────────────────────────────────────────

/// A heterogeneous runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value; passes every nil-tolerant matcher
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Interned name
    Symbol(String),
    List(Vec<Value>),
    /// Keyed mapping (BTreeMap for deterministic iteration)
    Map(BTreeMap<String, Value>),
    /// Instance of a declared type
    Object(Object),
    /// A type used as a value (receiver of type-level calls)
    Type(TypeRef),
}

/// An instance of a declared type
///
/// Stand-ins and doubles are objects too: they may answer extra singleton
/// members and may pose as another type for contract purposes.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    class: TypeRef,
    singleton_methods: BTreeMap<String, Arity>,
    contract_type: Option<TypeRef>,
}

impl Object {
    pub fn new(class: &TypeRef) -> Self {
        Self {
            class: class.clone(),
            singleton_methods: BTreeMap::new(),
            contract_type: None,
        }
    }

    /// Uninitialized placeholder instance of `class`, used to look up
    /// instance members without running any constructor.
    pub fn allocate(class: &TypeRef) -> Self {
        Self::new(class)
    }

    /// A bare stand-in answering only `Object` members plus the ones added
    /// through [`Object::with_method`].
    pub fn double() -> Self {
        Self::new(&builtins::object())
    }

    /// Add a member to this instance only
    pub fn with_method(mut self, name: impl Into<String>, arity: Arity) -> Self {
        self.singleton_methods.insert(name.into(), arity);
        self
    }

    /// Treat this instance as `contract_type` when resolving interfaces
    pub fn posing_as(mut self, contract_type: &TypeRef) -> Self {
        self.contract_type = Some(contract_type.clone());
        self
    }

    pub fn class(&self) -> &TypeRef {
        &self.class
    }

    pub fn contract_type(&self) -> Option<&TypeRef> {
        self.contract_type.as_ref()
    }

    pub fn method_arity(&self, name: &str) -> Option<Arity> {
        self.singleton_methods
            .get(name)
            .copied()
            .or_else(|| self.class.instance_method_arity(name))
    }
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn symbol(s: impl Into<String>) -> Self {
        Value::Symbol(s.into())
    }

    pub fn object(class: &TypeRef) -> Self {
        Value::Object(Object::new(class))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The runtime type of this value
    pub fn class_of(&self) -> TypeRef {
        match self {
            Value::Nil => builtins::nil(),
            Value::Boolean(_) => builtins::boolean(),
            Value::Integer(_) => builtins::integer(),
            Value::Float(_) => builtins::float(),
            Value::String(_) => builtins::string(),
            Value::Symbol(_) => builtins::symbol(),
            Value::List(_) => builtins::list(),
            Value::Map(_) => builtins::map(),
            Value::Object(obj) => obj.class.clone(),
            Value::Type(_) => builtins::type_type(),
        }
    }

    /// Instance of `ty` or of a subtype. A stand-in posing as a type counts
    /// as an instance of that type as well.
    pub fn is_kind_of(&self, ty: &TypeRef) -> bool {
        if let Value::Object(Object {
            contract_type: Some(posed),
            ..
        }) = self
        {
            if posed.is_a(ty) {
                return true;
            }
        }
        self.class_of().is_a(ty)
    }

    /// Exactly an instance of `ty`, subtypes excluded
    pub fn is_instance_of(&self, ty: &TypeRef) -> bool {
        if let Value::Object(Object {
            contract_type: Some(posed),
            ..
        }) = self
        {
            if posed == ty {
                return true;
            }
        }
        self.class_of() == *ty
    }

    /// Arity of the member `name` as seen from this value, if it has one
    pub fn method_arity(&self, name: &str) -> Option<Arity> {
        match self {
            Value::Object(obj) => obj.method_arity(name),
            Value::Type(ty) => ty.type_method_arity(name),
            other => other.class_of().instance_method_arity(name),
        }
    }

    pub fn responds_to(&self, name: &str) -> bool {
        self.method_arity(name).is_some()
    }

    /// Type name for error messages
    pub fn type_name(&self) -> String {
        self.class_of().name().to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Symbol(s) => write!(f, ":{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object(obj) => match &obj.contract_type {
                Some(posed) => write!(f, "#<{} as {}>", obj.class, posed),
                None => write!(f, "#<{}>", obj.class),
            },
            Value::Type(ty) => write!(f, "{}", ty),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl From<TypeRef> for Value {
    fn from(ty: TypeRef) -> Self {
        Value::Type(ty)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}
