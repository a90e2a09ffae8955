//! Runtime object model — declared types, their members and ancestry
//!
//! Contracts are checked against *real* types, so the engine needs a finite,
//! explicit description of each type: its supertype, mixins, and the members
//! it defines with their real arity. Nothing here is discovered by open-ended
//! reflection; hosts describe their types once through [`TypeBuilder`].
//!
//! # Arity encoding
//!
//! A non-negative arity is a fixed argument count. A negative arity `-(n + 1)`
//! means "at least `n` required, the rest optional or variadic". Descriptors
//! derive their arity with the same rule so the two can be compared directly.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Signed arity, see module docs for the encoding
pub type Arity = i32;

/// Largest argument count a real member may declare
pub const MAX_ARGUMENTS: usize = 255;

/// Arity for "at least `required` arguments, unbounded rest"
pub fn variadic(required: usize) -> Arity {
    -(required as Arity + 1)
}

/// Number of required arguments an arity encodes. Total over every `Arity`,
/// including `Arity::MIN`.
pub fn required_arguments(arity: Arity) -> usize {
    if arity >= 0 {
        arity.unsigned_abs() as usize
    } else {
        (arity.unsigned_abs() - 1) as usize
    }
}

/// True if the arity describes at most [`MAX_ARGUMENTS`] required arguments
pub fn is_valid_arity(arity: Arity) -> bool {
    required_arguments(arity) <= MAX_ARGUMENTS
}

// ── Type Definitions ──────────────────────────────────────

/// Immutable description of one type
#[derive(Debug)]
pub struct TypeDef {
    name: String,
    superclass: Option<TypeRef>,
    mixins: Vec<TypeRef>,
    instance_methods: BTreeMap<String, Arity>,
    type_methods: BTreeMap<String, Arity>,
}

/// Shared handle to a [`TypeDef`]. Identity is the type name.
#[derive(Clone)]
pub struct TypeRef(Arc<TypeDef>);

impl TypeRef {
    /// Start describing a type that extends `Object`
    pub fn builder(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name).extends(&builtins::object())
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn superclass(&self) -> Option<&TypeRef> {
        self.0.superclass.as_ref()
    }

    pub fn mixins(&self) -> &[TypeRef] {
        &self.0.mixins
    }

    /// Instance members defined directly on this type
    pub fn own_instance_methods(&self) -> impl Iterator<Item = (&str, Arity)> {
        self.0.instance_methods.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Type-level members defined directly on this type
    pub fn own_type_methods(&self) -> impl Iterator<Item = (&str, Arity)> {
        self.0.type_methods.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Method-resolution order: self, mixins (last included first), then the
    /// supertype's ancestors. Each type appears once, at its first position.
    pub fn ancestors(&self) -> Vec<TypeRef> {
        let mut order = Vec::new();
        self.collect_ancestors(&mut order);
        order
    }

    fn collect_ancestors(&self, order: &mut Vec<TypeRef>) {
        self.collect_with_mixins(order);
        if let Some(parent) = &self.0.superclass {
            parent.collect_ancestors(order);
        }
    }

    // A mixin contributes itself and its own mixins, never its supertype.
    fn collect_with_mixins(&self, order: &mut Vec<TypeRef>) {
        if order.contains(self) {
            return;
        }
        order.push(self.clone());
        for mixin in self.0.mixins.iter().rev() {
            mixin.collect_with_mixins(order);
        }
    }

    /// True if `self` is `other` or has it among its ancestors
    pub fn is_a(&self, other: &TypeRef) -> bool {
        self == other || self.ancestors().iter().any(|t| t == other)
    }

    /// Arity of an instance member, searching the ancestor chain
    pub fn instance_method_arity(&self, name: &str) -> Option<Arity> {
        self.ancestors()
            .iter()
            .find_map(|t| t.0.instance_methods.get(name).copied())
    }

    /// Arity of a type-level member. Type-level members are inherited along
    /// the ancestor chain; every type additionally answers the members of
    /// the builtin `Type` type.
    pub fn type_method_arity(&self, name: &str) -> Option<Arity> {
        self.ancestors()
            .iter()
            .find_map(|t| t.0.type_methods.get(name).copied())
            .or_else(|| builtins::type_type().instance_method_arity(name))
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl PartialOrd for TypeRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.name.cmp(&other.0.name)
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.0.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

// ── Builder ───────────────────────────────────────────────

/// Describes a type before it is frozen into a [`TypeRef`]
#[derive(Debug)]
pub struct TypeBuilder {
    def: TypeDef,
}

impl TypeBuilder {
    /// A root type with no supertype. Most callers want [`TypeRef::builder`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            def: TypeDef {
                name: name.into(),
                superclass: None,
                mixins: Vec::new(),
                instance_methods: BTreeMap::new(),
                type_methods: BTreeMap::new(),
            },
        }
    }

    pub fn extends(mut self, parent: &TypeRef) -> Self {
        self.def.superclass = Some(parent.clone());
        self
    }

    /// Detach from any supertype
    pub fn root(mut self) -> Self {
        self.def.superclass = None;
        self
    }

    pub fn includes(mut self, mixin: &TypeRef) -> Self {
        self.def.mixins.push(mixin.clone());
        self
    }

    /// Define an instance member with its real arity
    pub fn method(mut self, name: impl Into<String>, arity: Arity) -> Self {
        self.def.instance_methods.insert(name.into(), arity);
        self
    }

    /// Define a type-level member with its real arity
    pub fn type_method(mut self, name: impl Into<String>, arity: Arity) -> Self {
        self.def.type_methods.insert(name.into(), arity);
        self
    }

    pub fn build(self) -> TypeRef {
        TypeRef(Arc::new(self.def))
    }
}

// ── Builtins ──────────────────────────────────────────────

/// Builtin types every [`crate::Value`] variant maps onto.
///
/// Hierarchy:
///
/// ```text
/// Object ── Nil, Boolean, Symbol, List, Map, Type
///        ├─ Numeric (+Comparable) ── Integer, Float
///        └─ String (+Comparable)
/// ```
pub mod builtins {
    use super::*;

    struct Builtins {
        object: TypeRef,
        comparable: TypeRef,
        nil: TypeRef,
        boolean: TypeRef,
        numeric: TypeRef,
        integer: TypeRef,
        float: TypeRef,
        string: TypeRef,
        symbol: TypeRef,
        list: TypeRef,
        map: TypeRef,
        type_type: TypeRef,
    }

    fn table() -> &'static Builtins {
        static BUILTINS: OnceLock<Builtins> = OnceLock::new();
        BUILTINS.get_or_init(|| {
            let object = TypeBuilder::new("Object")
                .method("to_string", 0)
                .method("inspect", 0)
                .method("type_of", 0)
                .method("is_nil", 0)
                .method("equals", 1)
                .method("hash_code", 0)
                .method("responds_to", variadic(1))
                .method("is_a", 1)
                .method("send", variadic(1))
                .build();
            let comparable = TypeBuilder::new("Comparable")
                .method("compare", 1)
                .method("between", 2)
                .method("clamp", variadic(1))
                .build();
            let child = |name: &str| TypeBuilder::new(name).extends(&object);

            let nil = child("Nil").method("to_list", 0).build();
            let boolean = child("Boolean")
                .method("and", 1)
                .method("or", 1)
                .method("xor", 1)
                .build();
            let numeric = child("Numeric")
                .includes(&comparable)
                .method("add", 1)
                .method("sub", 1)
                .method("mul", 1)
                .method("div", 1)
                .method("abs", 0)
                .method("is_zero", 0)
                .build();
            let integer = TypeBuilder::new("Integer")
                .extends(&numeric)
                .method("succ", 0)
                .method("is_even", 0)
                .method("times", 0)
                .build();
            let float = TypeBuilder::new("Float")
                .extends(&numeric)
                .method("round", variadic(0))
                .method("floor", variadic(0))
                .method("is_nan", 0)
                .build();
            let string = child("String")
                .includes(&comparable)
                .method("length", 0)
                .method("upcase", 0)
                .method("downcase", 0)
                .method("strip", 0)
                .method("concat", variadic(0))
                .method("replace_all", variadic(1))
                .method("split", variadic(0))
                .method("starts_with", variadic(0))
                .method("is_empty", 0)
                .build();
            let symbol = child("Symbol").method("length", 0).method("to_symbol", 0).build();
            let list = child("List")
                .method("length", 0)
                .method("first", variadic(0))
                .method("last", variadic(0))
                .method("push", variadic(0))
                .method("each", 0)
                .method("map", 0)
                .method("contains", 1)
                .method("is_empty", 0)
                .build();
            let map = child("Map")
                .method("keys", 0)
                .method("values", 0)
                .method("get", 1)
                .method("insert", 2)
                .method("fetch", -2)
                .method("has_key", 1)
                .method("merge", variadic(0))
                .method("is_empty", 0)
                .build();
            let type_type = child("Type")
                .method("new", variadic(0))
                .method("allocate", 0)
                .method("name", 0)
                .method("ancestors", 0)
                .method("superclass", 0)
                .build();

            Builtins {
                object,
                comparable,
                nil,
                boolean,
                numeric,
                integer,
                float,
                string,
                symbol,
                list,
                map,
                type_type,
            }
        })
    }

    pub fn object() -> TypeRef {
        table().object.clone()
    }
    pub fn comparable() -> TypeRef {
        table().comparable.clone()
    }
    pub fn nil() -> TypeRef {
        table().nil.clone()
    }
    pub fn boolean() -> TypeRef {
        table().boolean.clone()
    }
    pub fn numeric() -> TypeRef {
        table().numeric.clone()
    }
    pub fn integer() -> TypeRef {
        table().integer.clone()
    }
    pub fn float() -> TypeRef {
        table().float.clone()
    }
    pub fn string() -> TypeRef {
        table().string.clone()
    }
    pub fn symbol() -> TypeRef {
        table().symbol.clone()
    }
    pub fn list() -> TypeRef {
        table().list.clone()
    }
    pub fn map() -> TypeRef {
        table().map.clone()
    }
    /// The type of type values themselves
    pub fn type_type() -> TypeRef {
        table().type_type.clone()
    }

    /// Every builtin, in declaration order
    pub fn all() -> Vec<TypeRef> {
        let t = table();
        vec![
            t.object.clone(),
            t.comparable.clone(),
            t.nil.clone(),
            t.boolean.clone(),
            t.numeric.clone(),
            t.integer.clone(),
            t.float.clone(),
            t.string.clone(),
            t.symbol.clone(),
            t.list.clone(),
            t.map.clone(),
            t.type_type.clone(),
        ]
    }
}
