//! Contract manifests — types, interfaces and recorded calls as JSON
//!
//! A manifest lets contracts and recorded invocations live outside Rust
//! code: a mock-framework adapter can dump what it recorded, and the CLI
//! checks it against the declared interfaces.
//!
//! ```json
//! {
//!   "settings":   { "require_declared_interfaces": true },
//!   "types":      [{ "name": "Person", "methods": { "full_info": 1 } }],
//!   "interfaces": [{ "type": "Person",
//!                    "methods": [{ "name": "full_info", "returns": "String",
//!                                  "args": [":full_address"] }] }],
//!   "invocations": [{ "owner": { "$instance": "Person" }, "method": "full_info",
//!                     "args": [{ "$responds_to": ["full_address"] }],
//!                     "returns": ["John - Main St"] }]
//! }
//! ```
//!
//! # Matcher declarations
//!
//! | JSON                         | matcher                         |
//! |------------------------------|---------------------------------|
//! | `null`                       | anything                        |
//! | `[a, b]`                     | any of `a`, `b`                 |
//! | `":name"`                    | responds to `name`              |
//! | `"Type"`                     | kind of `Type`                  |
//! | `{"$kind_of": "Type"}` etc.  | the named variant               |
//! | `{"field": decl, ...}`       | structural map, extra keys ok   |
//! | numbers, booleans            | construction error              |
//!
//! Explicit forms: `$anything`, `$kind_of`, `$instance_of`, `$responds_to`,
//! `$any`, `$not_nil`, `$optional`, `$splat`, `$strict`, `$including`.
//!
//! # Values
//!
//! Plain JSON maps onto [`Value`]. Objects carrying `$` keys describe
//! non-JSON values: `{"$instance": "T", "$responds_to": [..], "$as": "U"}`
//! is an object of `T` (default `Object`) with extra members, posing as `U`;
//! `{"$type": "T"}` is the type itself; `{"$symbol": "s"}` is a symbol.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as Json;
use tracing::debug;

use crate::config::Config;
use crate::descriptor::MethodName;
use crate::error::{Error, Result};
use crate::interface::Interface;
use crate::invocation::RecordedInvocation;
use crate::matcher::Matcher;
use crate::session::Session;
use crate::types::{
    builtins, is_valid_arity, variadic, Arity, TypeBuilder, TypeRef, MAX_ARGUMENTS,
};
use crate::value::{Object, Value};

// ── Document Types ────────────────────────────────────────

/// Raw manifest, as deserialized
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestDocument {
    pub settings: Option<Config>,
    pub types: Vec<TypeDecl>,
    pub interfaces: Vec<InterfaceDecl>,
    pub invocations: Vec<InvocationDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDecl {
    pub name: String,
    /// Supertype name; `Object` when omitted
    #[serde(default)]
    pub extends: Option<String>,
    /// No supertype at all (mixins)
    #[serde(default)]
    pub root: bool,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub methods: BTreeMap<String, Arity>,
    #[serde(default)]
    pub type_methods: BTreeMap<String, Arity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceDecl {
    #[serde(rename = "type")]
    pub type_name: String,
    /// Derive missing interfaces from real members first
    #[serde(default)]
    pub auto: bool,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub type_methods: Vec<MethodDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDecl {
    /// Exact name, or `/pattern/`
    pub name: String,
    #[serde(default)]
    pub returns: Json,
    #[serde(default)]
    pub args: Vec<Json>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvocationDecl {
    pub owner: Json,
    pub method: String,
    #[serde(default)]
    pub returns: Vec<Json>,
    #[serde(default)]
    pub args: Vec<Json>,
}

// ── Type Table ────────────────────────────────────────────

/// Types known to a manifest by name, builtins included
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: BTreeMap<String, TypeRef>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let types = builtins::all()
            .into_iter()
            .map(|t| (t.name().to_string(), t))
            .collect();
        Self { types }
    }

    pub fn get(&self, name: &str) -> Option<&TypeRef> {
        self.types.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<TypeRef> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Manifest(format!("unknown type '{}'", name)))
    }

    /// Define a type. References must name types defined earlier.
    pub fn define(&mut self, decl: &TypeDecl) -> Result<TypeRef> {
        if self.types.contains_key(&decl.name) {
            return Err(Error::Manifest(format!(
                "type '{}' is defined twice",
                decl.name
            )));
        }
        let mut builder = TypeBuilder::new(&decl.name);
        if !decl.root {
            let parent = decl.extends.as_deref().unwrap_or("Object");
            builder = builder.extends(&self.resolve(parent)?);
        } else if decl.extends.is_some() {
            return Err(Error::Manifest(format!(
                "type '{}' cannot be both root and extend another type",
                decl.name
            )));
        }
        for mixin in &decl.includes {
            builder = builder.includes(&self.resolve(mixin)?);
        }
        for (name, arity) in decl.methods.iter().chain(&decl.type_methods) {
            if !is_valid_arity(*arity) {
                return Err(Error::Manifest(format!(
                    "arity {} of '{}' on type '{}' exceeds {} arguments",
                    arity, name, decl.name, MAX_ARGUMENTS
                )));
            }
        }
        for (name, arity) in &decl.methods {
            builder = builder.method(name, *arity);
        }
        for (name, arity) in &decl.type_methods {
            builder = builder.type_method(name, *arity);
        }
        let ty = builder.build();
        self.types.insert(decl.name.clone(), ty.clone());
        Ok(ty)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

// ── Loaded Manifest ───────────────────────────────────────

/// A manifest resolved into live types, a populated session, and the
/// invocations to verify
#[derive(Debug)]
pub struct Manifest {
    pub types: TypeTable,
    pub session: Session,
    pub invocations: Vec<RecordedInvocation>,
}

impl Manifest {
    /// Parse and resolve a manifest.
    ///
    /// # Errors
    /// `Manifest` for malformed JSON or unknown names, `MatcherConstruction`
    /// and `InvalidDeclaration` for bad contract declarations.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: ManifestDocument =
            serde_json::from_str(text).map_err(|e| Error::Manifest(e.to_string()))?;
        Self::from_document(&document)
    }

    pub fn from_document(document: &ManifestDocument) -> Result<Self> {
        let mut types = TypeTable::new();
        for decl in &document.types {
            types.define(decl)?;
        }

        let mut session = Session::new(document.settings.clone().unwrap_or_default());
        for decl in &document.interfaces {
            declare_interface(&mut session, &types, decl)?;
        }

        let invocations = document
            .invocations
            .iter()
            .map(|decl| build_invocation(decl, &types))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            types = document.types.len(),
            interfaces = session.registry().len(),
            invocations = invocations.len(),
            "manifest loaded"
        );
        Ok(Self {
            types,
            session,
            invocations,
        })
    }
}

fn declare_interface(session: &mut Session, types: &TypeTable, decl: &InterfaceDecl) -> Result<()> {
    let ty = types.resolve(&decl.type_name)?;
    if decl.auto {
        session.auto_interface(&ty)?;
    }
    session.declare_interface(&ty, |iface: &mut Interface| {
        for method in &decl.methods {
            let (name, returns, args) = build_method(method, types)?;
            iface.method(name, returns, args)?;
        }
        for method in &decl.type_methods {
            let (name, returns, args) = build_method(method, types)?;
            iface.type_method(name, returns, args)?;
        }
        Ok(())
    })?;
    Ok(())
}

fn build_method(decl: &MethodDecl, types: &TypeTable) -> Result<(MethodName, Matcher, Vec<Matcher>)> {
    let name = parse_method_name(&decl.name)?;
    let returns = build_matcher(&decl.returns, types)?;
    let args = decl
        .args
        .iter()
        .map(|raw| build_matcher(raw, types))
        .collect::<Result<Vec<_>>>()?;
    Ok((name, returns, args))
}

/// `/src/` is a pattern, anything else an exact name
pub fn parse_method_name(raw: &str) -> Result<MethodName> {
    match raw
        .strip_prefix('/')
        .and_then(|rest| rest.strip_suffix('/'))
    {
        Some(source) if !source.is_empty() => MethodName::pattern(source),
        _ => Ok(MethodName::exact(raw)),
    }
}

// ── Matcher Inference ─────────────────────────────────────

/// Infer a matcher from a raw declaration value
pub fn build_matcher(raw: &Json, types: &TypeTable) -> Result<Matcher> {
    match raw {
        Json::Null => Ok(Matcher::Anything),
        Json::Array(alternatives) => Ok(Matcher::Any(
            alternatives
                .iter()
                .map(|a| build_matcher(a, types))
                .collect::<Result<Vec<_>>>()?,
        )),
        Json::String(s) => match s.strip_prefix(':') {
            Some(member) if !member.is_empty() => Ok(Matcher::responds_to(member)),
            _ => Ok(Matcher::KindOf(type_for_matcher(s, types)?)),
        },
        Json::Object(map) => {
            if let Some((key, inner)) = single_dollar_key(map) {
                return build_explicit(key, inner, raw, types);
            }
            Ok(Matcher::Structural {
                fields: build_fields(map, types)?,
                strict: false,
            })
        }
        Json::Bool(_) | Json::Number(_) => Err(Error::MatcherConstruction(raw.to_string())),
    }
}

fn build_explicit(key: &str, inner: &Json, raw: &Json, types: &TypeTable) -> Result<Matcher> {
    let nested = |inner: &Json| build_matcher(inner, types).map(Box::new);
    match key {
        "$anything" => Ok(Matcher::Anything),
        "$kind_of" => Ok(Matcher::KindOf(type_for_matcher(expect_str(inner, raw)?, types)?)),
        "$instance_of" => Ok(Matcher::InstanceOf(type_for_matcher(
            expect_str(inner, raw)?,
            types,
        )?)),
        "$responds_to" => Ok(Matcher::DuckType(string_list(inner, raw)?)),
        "$any" => match inner {
            Json::Array(_) => build_matcher(inner, types),
            _ => Err(Error::MatcherConstruction(raw.to_string())),
        },
        "$not_nil" => Ok(Matcher::NotNil(nested(inner)?)),
        "$optional" => Ok(Matcher::Optional(nested(inner)?)),
        "$splat" => Ok(Matcher::Splat(nested(inner)?)),
        "$strict" | "$including" => match inner {
            Json::Object(fields) => Ok(Matcher::Structural {
                fields: build_fields(fields, types)?,
                strict: key == "$strict",
            }),
            _ => Err(Error::MatcherConstruction(raw.to_string())),
        },
        _ => Err(Error::MatcherConstruction(raw.to_string())),
    }
}

fn build_fields(
    map: &serde_json::Map<String, Json>,
    types: &TypeTable,
) -> Result<BTreeMap<String, Matcher>> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), build_matcher(v, types)?)))
        .collect()
}

fn type_for_matcher(name: &str, types: &TypeTable) -> Result<TypeRef> {
    types
        .get(name)
        .cloned()
        .ok_or_else(|| Error::MatcherConstruction(format!("\"{}\" (unknown type)", name)))
}

fn single_dollar_key(map: &serde_json::Map<String, Json>) -> Option<(&str, &Json)> {
    if map.len() != 1 {
        return None;
    }
    map.iter()
        .next()
        .filter(|(k, _)| k.starts_with('$'))
        .map(|(k, v)| (k.as_str(), v))
}

fn expect_str<'j>(inner: &'j Json, raw: &Json) -> Result<&'j str> {
    inner
        .as_str()
        .ok_or_else(|| Error::MatcherConstruction(raw.to_string()))
}

fn string_list(inner: &Json, raw: &Json) -> Result<Vec<String>> {
    match inner {
        Json::String(s) => Ok(vec![s.clone()]),
        Json::Array(items) => items
            .iter()
            .map(|i| expect_str(i, raw).map(str::to_string))
            .collect(),
        _ => Err(Error::MatcherConstruction(raw.to_string())),
    }
}

// ── Values ────────────────────────────────────────────────

/// Build a runtime value from its JSON description
pub fn build_value(raw: &Json, types: &TypeTable) -> Result<Value> {
    match raw {
        Json::Null => Ok(Value::Nil),
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(Value::Integer(i)),
            (None, Some(f)) => Ok(Value::Float(f)),
            _ => Err(Error::Manifest(format!("unsupported number {}", n))),
        },
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Array(items) => Ok(Value::List(
            items
                .iter()
                .map(|i| build_value(i, types))
                .collect::<Result<Vec<_>>>()?,
        )),
        Json::Object(map) if map.keys().any(|k| k.starts_with('$')) => {
            build_special_value(map, raw, types)
        }
        Json::Object(map) => Ok(Value::Map(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), build_value(v, types)?)))
                .collect::<Result<BTreeMap<_, _>>>()?,
        )),
    }
}

fn build_special_value(
    map: &serde_json::Map<String, Json>,
    raw: &Json,
    types: &TypeTable,
) -> Result<Value> {
    let invalid = || Error::Manifest(format!("invalid value description {}", raw));
    let name_of = |key: &str| -> Result<Option<TypeRef>> {
        match map.get(key) {
            None => Ok(None),
            Some(Json::String(name)) => types.resolve(name).map(Some),
            Some(_) => Err(invalid()),
        }
    };

    if let Some(ty) = name_of("$type")? {
        return if map.len() == 1 { Ok(Value::Type(ty)) } else { Err(invalid()) };
    }
    if let Some(symbol) = map.get("$symbol") {
        return match (symbol, map.len()) {
            (Json::String(s), 1) => Ok(Value::Symbol(s.clone())),
            _ => Err(invalid()),
        };
    }
    if map
        .keys()
        .any(|k| !matches!(k.as_str(), "$instance" | "$responds_to" | "$as"))
    {
        return Err(invalid());
    }

    let class = name_of("$instance")?.unwrap_or_else(builtins::object);
    let mut object = Object::new(&class);
    if let Some(members) = map.get("$responds_to") {
        for member in string_list(members, raw).map_err(|_| invalid())? {
            object = object.with_method(member, variadic(0));
        }
    }
    if let Some(posed) = name_of("$as")? {
        object = object.posing_as(&posed);
    }
    Ok(Value::Object(object))
}

fn build_invocation(decl: &InvocationDecl, types: &TypeTable) -> Result<RecordedInvocation> {
    let values = |raws: &[Json]| {
        raws.iter()
            .map(|r| build_value(r, types))
            .collect::<Result<Vec<_>>>()
    };
    Ok(RecordedInvocation::new(build_value(&decl.owner, types)?, decl.method.clone())
        .returning(values(decl.returns.as_slice())?)
        .with_arguments(values(decl.args.as_slice())?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PERSON_MANIFEST: &str = r#"{
        "settings": { "require_declared_interfaces": true },
        "types": [
            { "name": "Address", "methods": { "full_address": 0 } },
            { "name": "Person", "methods": { "name": 0, "full_info": 1 },
              "type_methods": { "create": 1 } }
        ],
        "interfaces": [
            { "type": "Person",
              "methods": [
                { "name": "name", "returns": "String" },
                { "name": "full_info", "returns": "String", "args": [":full_address"] }
              ],
              "type_methods": [
                { "name": "create", "returns": "Person", "args": [{ "$not_nil": "String" }] }
              ] },
            { "type": "Address",
              "methods": [{ "name": "full_address", "returns": "String" }] }
        ],
        "invocations": [
            { "owner": { "$instance": "Person" }, "method": "full_info",
              "args": [{ "$responds_to": ["full_address"], "$as": "Address" }],
              "returns": ["my name - my street"] },
            { "owner": { "$type": "Person" }, "method": "create",
              "args": ["bob"], "returns": [{ "$instance": "Person" }] }
        ]
    }"#;

    fn matcher(raw: Json) -> Result<Matcher> {
        build_matcher(&raw, &TypeTable::new())
    }

    #[test]
    fn test_matcher_inference_table() {
        assert_eq!(matcher(json!(null)).unwrap(), Matcher::Anything);
        assert_eq!(
            matcher(json!("String")).unwrap(),
            Matcher::kind_of(&builtins::string())
        );
        assert_eq!(
            matcher(json!(":length")).unwrap(),
            Matcher::responds_to("length")
        );
        assert_eq!(
            matcher(json!(["String", null])).unwrap(),
            Matcher::any_of(vec![Matcher::kind_of(&builtins::string()), Matcher::Anything])
        );
        assert_eq!(
            matcher(json!({"name": "String"})).unwrap(),
            Matcher::hash_including([("name", Matcher::kind_of(&builtins::string()))])
        );
    }

    #[test]
    fn test_explicit_matcher_forms() {
        assert_eq!(
            matcher(json!({"$instance_of": "Integer"})).unwrap(),
            Matcher::instance_of(&builtins::integer())
        );
        assert_eq!(
            matcher(json!({"$splat": {"$optional": ":length"}})).unwrap(),
            Matcher::splat(Matcher::optional(Matcher::responds_to("length")))
        );
        assert_eq!(
            matcher(json!({"$strict": {"id": "Integer"}})).unwrap(),
            Matcher::structural([("id", Matcher::kind_of(&builtins::integer()))], true)
        );
        assert_eq!(
            matcher(json!({"$responds_to": ["a", "b"]})).unwrap(),
            Matcher::duck_type(["a", "b"])
        );
        assert_eq!(matcher(json!({"$anything": true})).unwrap(), Matcher::Anything);
    }

    #[test]
    fn test_unrepresentable_declarations_fail() {
        for raw in [
            json!(5),
            json!(true),
            json!("Nope"),
            json!({"$kind_of": 3}),
            json!({"$unknown": "x"}),
            json!({"$any": "String"}),
        ] {
            assert!(
                matches!(matcher(raw.clone()), Err(Error::MatcherConstruction(_))),
                "{} should not build",
                raw
            );
        }
    }

    #[test]
    fn test_method_names() {
        assert_eq!(parse_method_name("find").unwrap(), MethodName::exact("find"));
        assert!(parse_method_name("/find_.*/").unwrap().is_pattern());
        assert_eq!(parse_method_name("/").unwrap(), MethodName::exact("/"));
    }

    #[test]
    fn test_special_values() {
        let types = TypeTable::new();
        let v = build_value(&json!({"$responds_to": "go", "$as": "String"}), &types).unwrap();
        assert!(v.responds_to("go"));
        assert!(v.is_kind_of(&builtins::string()));
        assert_eq!(
            build_value(&json!({"$type": "Integer"}), &types).unwrap(),
            Value::Type(builtins::integer())
        );
        assert_eq!(
            build_value(&json!({"$symbol": "ok"}), &types).unwrap(),
            Value::symbol("ok")
        );
        assert_eq!(build_value(&json!(1.5), &types).unwrap(), Value::Float(1.5));
        assert!(build_value(&json!({"$type": "Integer", "x": 1}), &types).is_err());
        assert!(build_value(&json!({"$bogus": 1}), &types).is_err());
    }

    #[test]
    fn test_types_resolve_in_order() {
        let mut table = TypeTable::new();
        let decl = |name: &str, extends: Option<&str>| TypeDecl {
            name: name.into(),
            extends: extends.map(Into::into),
            root: false,
            includes: vec![],
            methods: BTreeMap::new(),
            type_methods: BTreeMap::new(),
        };
        assert!(table.define(&decl("Child", Some("Parent"))).is_err());
        table.define(&decl("Parent", None)).unwrap();
        let child = table.define(&decl("Child", Some("Parent"))).unwrap();
        assert_eq!(child.superclass().unwrap().name(), "Parent");
        assert!(table.define(&decl("Parent", None)).is_err());
    }

    #[test]
    fn test_out_of_range_arities_are_manifest_errors() {
        for arity in ["-2147483648", "2000000000", "256", "-258"] {
            for section in ["methods", "type_methods"] {
                let text = format!(
                    r#"{{"types": [{{"name": "T", "{}": {{"m": {}}}}}],
                        "interfaces": [{{"type": "T", "auto": true}}]}}"#,
                    section, arity
                );
                assert!(
                    matches!(Manifest::from_json_str(&text), Err(Error::Manifest(_))),
                    "{} arity {} should be rejected",
                    section,
                    arity
                );
            }
        }
        let widest = r#"{"types": [{"name": "T", "methods": {"m": 255, "n": -256}}],
                         "interfaces": [{"type": "T", "auto": true}]}"#;
        assert!(Manifest::from_json_str(widest).is_ok());
    }

    #[test]
    fn test_nested_splat_declaration_fails() {
        let text = r#"{
            "types": [{ "name": "T", "methods": { "m": -1 } }],
            "interfaces": [{ "type": "T",
                             "methods": [{ "name": "m", "args": [{ "$optional": { "$splat": "Integer" } }] }] }]
        }"#;
        assert!(matches!(
            Manifest::from_json_str(text),
            Err(Error::InvalidDeclaration { ref method, .. }) if method == "m"
        ));
    }

    #[test]
    fn test_full_manifest_verifies() {
        let manifest = Manifest::from_json_str(PERSON_MANIFEST).unwrap();
        assert!(manifest.session.config().require_declared_interfaces);
        assert_eq!(manifest.session.registry().len(), 2);
        assert_eq!(manifest.invocations.len(), 2);
        assert!(manifest.session.run_sanity_checks().is_ok());
        let result = manifest.session.verify_all(&manifest.invocations).unwrap();
        assert_eq!(result.checked, 2);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_auto_interfaces_from_manifest() {
        let manifest = Manifest::from_json_str(
            r#"{
                "types": [{ "name": "Clock", "methods": { "tick": 0, "set": 2 } }],
                "interfaces": [{ "type": "Clock", "auto": true,
                                 "methods": [{ "name": "tick", "returns": "Integer" }] }]
            }"#,
        )
        .unwrap();
        let clock = manifest.types.resolve("Clock").unwrap();
        let iface = manifest.session.registry().get(&clock).unwrap();
        assert_eq!(iface.methods().len(), 2);
        assert!(manifest.session.registry().contains(&builtins::object()));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            Manifest::from_json_str("{"),
            Err(Error::Manifest(_))
        ));
        assert!(matches!(
            Manifest::from_json_str(r#"{"unexpected": []}"#),
            Err(Error::Manifest(_))
        ));
        assert!(matches!(
            Manifest::from_json_str(
                r#"{"interfaces": [{"type": "String", "methods": [{"name": "x", "returns": 4}]}]}"#
            ),
            Err(Error::MatcherConstruction(_))
        ));
    }
}
