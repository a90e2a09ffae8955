//! Matcher algebra — composable predicates over runtime values
//!
//! A matcher guards one argument position or one return value of a declared
//! method. Matchers are immutable and side-effect free; the only operation is
//! [`Matcher::matches`].
//!
//! # Nil convention
//!
//! "No value given" is never a contract violation, only a present-but-wrong
//! value is. `KindOf`, `InstanceOf`, `DuckType` and `Structural` therefore
//! accept nil. `NotNil` is the explicit opt-out. `Optional` and `Splat` do
//! not apply the convention themselves; they only shape arity (see
//! [`crate::descriptor`]).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::types::TypeRef;
use crate::value::Value;

/// Caller-supplied predicate, the passthrough variant of [`Matcher`]
pub trait ValueMatcher: Send + Sync {
    fn matches(&self, value: &Value) -> bool;

    /// Description used in failure messages
    fn describe(&self) -> String;
}

/// Predicate over one argument position or one return value
#[derive(Clone)]
pub enum Matcher {
    /// Always matches
    Anything,
    /// Nil, or an instance of the type or a subtype
    KindOf(TypeRef),
    /// Nil, or exactly an instance of the type
    InstanceOf(TypeRef),
    /// Nil, or a value answering every listed member
    DuckType(Vec<String>),
    /// At least one alternative matches
    Any(Vec<Matcher>),
    /// Nil, or a map whose declared fields match
    Structural {
        fields: BTreeMap<String, Matcher>,
        strict: bool,
    },
    /// Non-nil and the inner matcher matches
    NotNil(Box<Matcher>),
    /// Inner match; marks the position optional for arity
    Optional(Box<Matcher>),
    /// Inner match on every remaining value; marks the position variadic
    Splat(Box<Matcher>),
    /// Caller-supplied predicate
    Custom(Arc<dyn ValueMatcher>),
}

impl Matcher {
    // ── Constructors ──────────────────────────────────────

    pub fn anything() -> Self {
        Matcher::Anything
    }

    pub fn kind_of(ty: &TypeRef) -> Self {
        Matcher::KindOf(ty.clone())
    }

    pub fn instance_of(ty: &TypeRef) -> Self {
        Matcher::InstanceOf(ty.clone())
    }

    pub fn duck_type<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Matcher::DuckType(members.into_iter().map(Into::into).collect())
    }

    /// Single-member duck type
    pub fn responds_to(member: impl Into<String>) -> Self {
        Matcher::DuckType(vec![member.into()])
    }

    pub fn any_of(alternatives: Vec<Matcher>) -> Self {
        Matcher::Any(alternatives)
    }

    pub fn structural<I, K>(fields: I, strict: bool) -> Self
    where
        I: IntoIterator<Item = (K, Matcher)>,
        K: Into<String>,
    {
        Matcher::Structural {
            fields: fields.into_iter().map(|(k, m)| (k.into(), m)).collect(),
            strict,
        }
    }

    /// Loose structural map: undeclared keys are ignored
    pub fn hash_including<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Matcher)>,
        K: Into<String>,
    {
        Self::structural(fields, false)
    }

    pub fn not_nil(inner: impl Into<Matcher>) -> Self {
        Matcher::NotNil(Box::new(inner.into()))
    }

    pub fn optional(inner: impl Into<Matcher>) -> Self {
        Matcher::Optional(Box::new(inner.into()))
    }

    pub fn splat(inner: impl Into<Matcher>) -> Self {
        Matcher::Splat(Box::new(inner.into()))
    }

    pub fn custom(predicate: impl ValueMatcher + 'static) -> Self {
        Matcher::Custom(Arc::new(predicate))
    }

    // ── Matching ──────────────────────────────────────────

    /// Test one value. A `Splat` treats a list as the sequence of remaining
    /// values and any other value as a one-element sequence.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Matcher::Anything => true,
            Matcher::KindOf(ty) => value.is_nil() || value.is_kind_of(ty),
            Matcher::InstanceOf(ty) => value.is_nil() || value.is_instance_of(ty),
            Matcher::DuckType(members) => {
                value.is_nil() || members.iter().all(|m| value.responds_to(m))
            }
            Matcher::Any(alternatives) => alternatives.iter().any(|m| m.matches(value)),
            Matcher::Structural { fields, strict } => match value {
                Value::Nil => true,
                Value::Map(map) => structural_match(fields, *strict, map),
                _ => false,
            },
            Matcher::NotNil(inner) => !value.is_nil() && inner.matches(value),
            Matcher::Optional(inner) => inner.matches(value),
            Matcher::Splat(inner) => match value {
                Value::List(items) => inner.matches_all(items),
                single => inner.matches(single),
            },
            Matcher::Custom(predicate) => predicate.matches(value),
        }
    }

    /// True if every value matches; vacuously true for no values
    pub fn matches_all(&self, values: &[Value]) -> bool {
        values.iter().all(|v| self.matches(v))
    }

    /// First value the matcher rejects, if any
    pub fn first_mismatch<'v>(&self, values: &'v [Value]) -> Option<&'v Value> {
        values.iter().find(|v| !self.matches(v))
    }

    /// Position may be omitted by the caller (Optional or Splat)
    pub fn is_optional_position(&self) -> bool {
        matches!(self, Matcher::Optional(_) | Matcher::Splat(_))
    }

    pub fn is_splat(&self) -> bool {
        matches!(self, Matcher::Splat(_))
    }

    /// A `Splat` somewhere below the top level of this matcher
    pub fn nests_splat(&self) -> bool {
        self.inner_matchers()
            .iter()
            .any(|m| m.is_splat() || m.nests_splat())
    }

    fn inner_matchers(&self) -> Vec<&Matcher> {
        match self {
            Matcher::Any(alternatives) => alternatives.iter().collect(),
            Matcher::Structural { fields, .. } => fields.values().collect(),
            Matcher::NotNil(inner) | Matcher::Optional(inner) | Matcher::Splat(inner) => {
                vec![inner.as_ref()]
            }
            Matcher::Anything
            | Matcher::KindOf(_)
            | Matcher::InstanceOf(_)
            | Matcher::DuckType(_)
            | Matcher::Custom(_) => Vec::new(),
        }
    }
}

fn structural_match(
    fields: &BTreeMap<String, Matcher>,
    strict: bool,
    map: &BTreeMap<String, Value>,
) -> bool {
    if strict && (map.len() != fields.len() || map.keys().any(|k| !fields.contains_key(k))) {
        return false;
    }
    fields.iter().all(|(key, matcher)| match map.get(key) {
        Some(v) => matcher.matches(v),
        None => matcher.matches(&Value::Nil),
    })
}

// ── Equality ──────────────────────────────────────────────

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Matcher::Anything, Matcher::Anything) => true,
            (Matcher::KindOf(a), Matcher::KindOf(b)) => a == b,
            (Matcher::InstanceOf(a), Matcher::InstanceOf(b)) => a == b,
            (Matcher::DuckType(a), Matcher::DuckType(b)) => a == b,
            (Matcher::Any(a), Matcher::Any(b)) => a == b,
            (
                Matcher::Structural {
                    fields: fa,
                    strict: sa,
                },
                Matcher::Structural {
                    fields: fb,
                    strict: sb,
                },
            ) => sa == sb && fa == fb,
            (Matcher::NotNil(a), Matcher::NotNil(b)) => a == b,
            (Matcher::Optional(a), Matcher::Optional(b)) => a == b,
            (Matcher::Splat(a), Matcher::Splat(b)) => a == b,
            (Matcher::Custom(a), Matcher::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ── Rendering ─────────────────────────────────────────────

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Anything => write!(f, "anything"),
            Matcher::KindOf(ty) => write!(f, "kind_of({})", ty),
            Matcher::InstanceOf(ty) => write!(f, "instance_of({})", ty),
            Matcher::DuckType(members) => write!(f, "responds_to({})", members.join(", ")),
            Matcher::Any(alternatives) => {
                write!(f, "any_of(")?;
                for (i, m) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", m)?;
                }
                write!(f, ")")
            }
            Matcher::Structural { fields, strict } => {
                write!(f, "{}{{", if *strict { "strict" } else { "including" })?;
                for (i, (k, m)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, m)?;
                }
                write!(f, "}}")
            }
            Matcher::NotNil(inner) => write!(f, "not_nil({})", inner),
            Matcher::Optional(inner) => write!(f, "optional({})", inner),
            Matcher::Splat(inner) => write!(f, "splat({})", inner),
            Matcher::Custom(predicate) => f.write_str(&predicate.describe()),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({})", self)
    }
}

// ── Call-site sugar ───────────────────────────────────────

impl From<TypeRef> for Matcher {
    fn from(ty: TypeRef) -> Self {
        Matcher::KindOf(ty)
    }
}

impl From<&TypeRef> for Matcher {
    fn from(ty: &TypeRef) -> Self {
        Matcher::KindOf(ty.clone())
    }
}

impl From<&str> for Matcher {
    fn from(member: &str) -> Self {
        Matcher::responds_to(member)
    }
}

impl From<Vec<Matcher>> for Matcher {
    fn from(alternatives: Vec<Matcher>) -> Self {
        Matcher::Any(alternatives)
    }
}

impl From<Option<Matcher>> for Matcher {
    fn from(m: Option<Matcher>) -> Self {
        m.unwrap_or(Matcher::Anything)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::builtins;
    use crate::value::Object;

    struct Even;

    impl ValueMatcher for Even {
        fn matches(&self, value: &Value) -> bool {
            matches!(value, Value::Integer(i) if i % 2 == 0)
        }

        fn describe(&self) -> String {
            "even".into()
        }
    }

    fn map(entries: &[(&str, Value)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_anything_matches_everything() {
        assert!(Matcher::anything().matches(&Value::Nil));
        assert!(Matcher::anything().matches(&Value::Integer(1)));
    }

    #[test]
    fn test_nil_tolerant_matchers_accept_nil() {
        let all = [
            Matcher::kind_of(&builtins::string()),
            Matcher::instance_of(&builtins::integer()),
            Matcher::responds_to("full_address"),
            Matcher::hash_including([("a", Matcher::kind_of(&builtins::string()))]),
            Matcher::structural([("a", Matcher::anything())], true),
        ];
        for m in &all {
            assert!(m.matches(&Value::Nil), "{} should accept nil", m);
        }
    }

    #[test]
    fn test_kind_of_vs_instance_of() {
        let two = Value::Integer(2);
        assert!(Matcher::kind_of(&builtins::numeric()).matches(&two));
        assert!(!Matcher::instance_of(&builtins::numeric()).matches(&two));
        assert!(!Matcher::kind_of(&builtins::string()).matches(&two));
    }

    #[test]
    fn test_duck_type_requires_every_member() {
        let address = TypeRef::builder("Address")
            .method("full_address", 0)
            .method("zip", 0)
            .build();
        let value = Value::object(&address);
        assert!(Matcher::duck_type(["full_address", "zip"]).matches(&value));
        assert!(!Matcher::duck_type(["full_address", "city"]).matches(&value));
        let double = Value::Object(Object::double().with_method("city", 0));
        assert!(Matcher::responds_to("city").matches(&double));
    }

    #[test]
    fn test_any_of_is_disjunction() {
        let m = Matcher::any_of(vec![
            Matcher::not_nil(&builtins::string()),
            Matcher::not_nil(&builtins::integer()),
        ]);
        assert!(m.matches(&Value::from("a")));
        assert!(m.matches(&Value::Integer(1)));
        assert!(!m.matches(&Value::Float(1.0)));
        assert!(!m.matches(&Value::Nil));
        assert!(!Matcher::any_of(vec![]).matches(&Value::Integer(1)));
    }

    #[test]
    fn test_structural_loose_ignores_extra_keys() {
        let m = Matcher::hash_including([("name", Matcher::kind_of(&builtins::string()))]);
        assert!(m.matches(&map(&[("name", "x".into()), ("age", Value::Integer(3))])));
        assert!(m.matches(&map(&[])));
        assert!(!m.matches(&map(&[("name", Value::Integer(3))])));
        assert!(!m.matches(&Value::from("not a map")));
    }

    #[test]
    fn test_structural_strict_requires_exact_key_set() {
        let m = Matcher::structural(
            [
                ("name", Matcher::kind_of(&builtins::string())),
                ("age", Matcher::kind_of(&builtins::integer())),
            ],
            true,
        );
        assert!(m.matches(&map(&[("name", "x".into()), ("age", Value::Integer(3))])));
        assert!(!m.matches(&map(&[
            ("name", "x".into()),
            ("age", Value::Integer(3)),
            ("extra", Value::Nil),
        ])));
        assert!(!m.matches(&map(&[("name", "x".into())])));
    }

    #[test]
    fn test_not_nil_rejects_nil_only() {
        let m = Matcher::not_nil(Matcher::anything());
        assert!(!m.matches(&Value::Nil));
        assert!(m.matches(&Value::Boolean(false)));
    }

    #[test]
    fn test_splat_checks_every_element() {
        let m = Matcher::splat(&builtins::integer());
        assert!(m.matches(&Value::from(vec![1_i64, 2, 3])));
        assert!(m.matches(&Value::List(vec![])));
        assert!(!m.matches(&Value::List(vec![Value::Integer(1), "x".into()])));
        assert!(m.is_optional_position() && m.is_splat());
        assert!(!m.nests_splat());
        assert!(Matcher::optional(m.clone()).nests_splat());
        assert!(Matcher::any_of(vec![Matcher::not_nil(m)]).nests_splat());
        assert!(Matcher::optional(Matcher::anything()).is_optional_position());
    }

    #[test]
    fn test_custom_matcher_passthrough() {
        let m = Matcher::custom(Even);
        assert!(m.matches(&Value::Integer(4)));
        assert!(!m.matches(&Value::Integer(3)));
        assert_eq!(m.to_string(), "even");
        assert_eq!(m, m.clone());
        assert_ne!(m, Matcher::custom(Even));
    }

    #[test]
    fn test_equality_by_variant_and_parameters() {
        assert_eq!(
            Matcher::optional(&builtins::string()),
            Matcher::optional(Matcher::kind_of(&builtins::string()))
        );
        assert_ne!(
            Matcher::kind_of(&builtins::string()),
            Matcher::instance_of(&builtins::string())
        );
        assert_ne!(
            Matcher::structural([("a", Matcher::anything())], true),
            Matcher::structural([("a", Matcher::anything())], false)
        );
    }

    #[test]
    fn test_call_site_conversions() {
        assert_eq!(Matcher::from(builtins::string()), Matcher::kind_of(&builtins::string()));
        assert_eq!(Matcher::from("to_string"), Matcher::responds_to("to_string"));
        assert_eq!(Matcher::from(None::<Matcher>), Matcher::Anything);
        assert_eq!(
            Matcher::from(vec![Matcher::Anything]),
            Matcher::any_of(vec![Matcher::Anything])
        );
    }

    #[test]
    fn test_first_mismatch_reports_offender() {
        let values = vec![Value::Integer(1), Value::from("x"), Value::Integer(2)];
        let m = Matcher::kind_of(&builtins::integer());
        assert_eq!(m.first_mismatch(&values), Some(&Value::from("x")));
    }

    #[test]
    fn test_display_is_stable() {
        let m = Matcher::any_of(vec![
            Matcher::kind_of(&builtins::string()),
            Matcher::splat(Matcher::responds_to("length")),
        ]);
        assert_eq!(m.to_string(), "any_of(kind_of(String), splat(responds_to(length)))");
    }
}
