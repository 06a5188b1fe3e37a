//! Shared parsing and emitting machinery for document nodes.
//!
//! Parsing never stops at the first problem: each node records violations in
//! a [`Report`] and keeps going, so the caller sees every offending field.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::reference::{OneOrMany, Reference};
use super::{Document, Family};
use crate::activity_pub::validate::{self, DateTime, Duration, MediaType};

/// Inline documents may nest at most this deep.
pub(crate) const MAX_DEPTH: usize = 64;

/// Natural language values keyed by BCP 47 tag, e.g. `contentMap`.
pub type LanguageMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct SchemaViolation {
    /// Dotted path to the offending member, e.g. `object.tag[1].href`.
    pub field: String,
    pub reason: String,
}

/// Every violation found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError(pub Vec<SchemaViolation>);

impl ValidationError {
    pub fn violations(&self) -> &[SchemaViolation] {
        &self.0
    }
    /// Whether any violation is about `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} schema violation(s)", self.0.len())?;
        for (i, violation) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{violation}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct Report(Vec<SchemaViolation>);

impl Report {
    pub(crate) fn push(&mut self, field: String, reason: impl Into<String>) {
        self.0.push(SchemaViolation {
            field,
            reason: reason.into(),
        });
    }
    pub(crate) fn finish<T>(self, value: Option<T>) -> Result<T, ValidationError> {
        match value {
            Some(value) if self.0.is_empty() => Ok(value),
            _ => Err(ValidationError(self.0)),
        }
    }
}

/// Which document families a property accepts inline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Expect(&'static [Family]);

impl Expect {
    pub(crate) const ANY: Expect = Expect(&[]);
    pub(crate) const ACTOR: Expect = Expect(&[Family::Actor]);
    pub(crate) const ACTOR_OR_LINK: Expect = Expect(&[Family::Actor, Family::Link]);
    pub(crate) const COLLECTION: Expect = Expect(&[Family::Collection]);
    pub(crate) const COLLECTION_OR_LINK: Expect = Expect(&[Family::Collection, Family::Link]);
    pub(crate) const LINK: Expect = Expect(&[Family::Link]);

    fn check(&self, document: &Document) -> Result<(), String> {
        match document.family() {
            // extensions satisfy anything
            None => Ok(()),
            Some(_) if self.0.is_empty() => Ok(()),
            Some(family) if self.0.contains(&family) => Ok(()),
            Some(_) => {
                let expected: Vec<_> = self.0.iter().map(Family::to_string).collect();
                Err(format!(
                    "expected {}, found {}",
                    expected.join(" or "),
                    document.type_name()
                ))
            }
        }
    }
}

/// A node that can be embedded inline where a [`Reference`] is allowed.
pub(crate) trait Inline: ToJson + Sized {
    fn parse_inline(fields: Fields<'_>) -> Option<Self>;
}

pub trait ToJson {
    fn to_json(&self) -> Value;
}

impl ToJson for String {
    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }
}
impl ToJson for bool {
    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}
impl ToJson for u64 {
    fn to_json(&self) -> Value {
        Value::Number((*self).into())
    }
}
impl ToJson for Number {
    fn to_json(&self) -> Value {
        Value::Number(self.clone())
    }
}
impl ToJson for DateTime {
    fn to_json(&self) -> Value {
        Value::String(self.as_str().to_string())
    }
}
impl ToJson for Duration {
    fn to_json(&self) -> Value {
        Value::String(self.as_str().to_string())
    }
}
impl ToJson for MediaType {
    fn to_json(&self) -> Value {
        Value::String(self.as_str().to_string())
    }
}
impl ToJson for LanguageMap {
    fn to_json(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Members of one JSON object being consumed into a typed node.
///
/// Each accessor removes its member; whatever is left at [`Fields::finish`]
/// is kept verbatim by the node.
pub(crate) struct Fields<'r> {
    map: Map<String, Value>,
    path: String,
    depth: usize,
    report: &'r mut Report,
}

impl<'r> Fields<'r> {
    pub(crate) fn new(map: Map<String, Value>, report: &'r mut Report) -> Fields<'r> {
        Fields {
            map,
            path: String::new(),
            depth: 0,
            report,
        }
    }
    fn nested(&mut self, map: Map<String, Value>, path: String) -> Fields<'_> {
        Fields {
            map,
            path,
            depth: self.depth + 1,
            report: &mut *self.report,
        }
    }
    pub(crate) fn is_top_level(&self) -> bool {
        self.depth == 0
    }
    pub(crate) fn path_of(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        }
    }
    pub(crate) fn violation(&mut self, key: &str, reason: impl Into<String>) {
        let field = self.path_of(key);
        self.report.push(field, reason);
    }
    /// Present and not null.
    pub(crate) fn has(&self, key: &str) -> bool {
        self.map.get(key).is_some_and(|v| !v.is_null())
    }
    pub(crate) fn require(&mut self, key: &str) {
        if !self.has(key) {
            self.violation(key, "is required");
        }
    }
    /// Which of `keys` are present with an explicit null.
    pub(crate) fn nulls(&self, keys: &[&str]) -> Map<String, Value> {
        keys.iter()
            .filter(|key| self.map.get(**key).is_some_and(Value::is_null))
            .map(|key| (key.to_string(), Value::Null))
            .collect()
    }
    /// Remove a member; null counts as absent.
    pub(crate) fn take(&mut self, key: &str) -> Option<Value> {
        match self.map.remove(key) {
            Some(Value::Null) | None => None,
            value => value,
        }
    }
    /// Run a text check over a string member.
    fn checked<T>(&mut self, key: &str, check: impl FnOnce(&str) -> Result<T, String>) -> Option<T> {
        let text = self.string(key)?;
        match check(&text) {
            Ok(value) => Some(value),
            Err(reason) => {
                self.violation(key, reason);
                None
            }
        }
    }

    pub(crate) fn string(&mut self, key: &str) -> Option<String> {
        match self.take(key)? {
            Value::String(s) => Some(s),
            other => {
                let reason = format!("expected a string, found {}", json_kind(&other));
                self.violation(key, reason);
                None
            }
        }
    }
    pub(crate) fn strings(&mut self, key: &str) -> Option<OneOrMany<String>> {
        match self.take(key)? {
            Value::String(s) => Some(OneOrMany::One(s)),
            Value::Array(items) if items.iter().all(Value::is_string) => Some(OneOrMany::Many(
                items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            )),
            other => {
                let reason = format!("expected strings, found {}", json_kind(&other));
                self.violation(key, reason);
                None
            }
        }
    }
    pub(crate) fn uri(&mut self, key: &str) -> Option<String> {
        self.checked(key, |text| validate::absolute_uri(text).map(|()| text.to_string()))
    }
    pub(crate) fn boolean(&mut self, key: &str) -> Option<bool> {
        match self.take(key)? {
            Value::Bool(b) => Some(b),
            other => {
                let reason = format!("expected a boolean, found {}", json_kind(&other));
                self.violation(key, reason);
                None
            }
        }
    }
    /// A non-negative integer.
    pub(crate) fn count(&mut self, key: &str) -> Option<u64> {
        let value = self.take(key)?;
        match value.as_u64() {
            Some(n) => Some(n),
            None => {
                self.violation(key, format!("expected a non-negative integer, found {value}"));
                None
            }
        }
    }
    /// A number within bounds, kept in its wire form.
    pub(crate) fn number(&mut self, key: &str, min: Option<f64>, max: Option<f64>) -> Option<Number> {
        let n = match self.take(key)? {
            Value::Number(n) => n,
            other => {
                let reason = format!("expected a number, found {}", json_kind(&other));
                self.violation(key, reason);
                return None;
            }
        };
        let Some(value) = n.as_f64() else {
            self.violation(key, format!("{n} is out of range"));
            return None;
        };
        match validate::in_range(value, min, max) {
            Ok(()) => Some(n),
            Err(reason) => {
                self.violation(key, reason);
                None
            }
        }
    }
    pub(crate) fn date_time(&mut self, key: &str) -> Option<DateTime> {
        self.checked(key, DateTime::parse)
    }
    pub(crate) fn duration(&mut self, key: &str) -> Option<Duration> {
        self.checked(key, Duration::parse)
    }
    pub(crate) fn media_type(&mut self, key: &str) -> Option<MediaType> {
        self.checked(key, MediaType::parse)
    }
    pub(crate) fn language_tag(&mut self, key: &str) -> Option<String> {
        self.checked(key, |text| {
            validate::check_language_tag(text).map(|()| text.to_string())
        })
    }
    /// Reported once per map, naming every bad key.
    pub(crate) fn language_map(&mut self, key: &str) -> Option<LanguageMap> {
        let map = match self.take(key)? {
            Value::Object(map) => map,
            other => {
                let reason = format!("expected an object, found {}", json_kind(&other));
                self.violation(key, reason);
                return None;
            }
        };
        let mut bad_keys = vec![];
        let mut bad_values = vec![];
        let mut out = LanguageMap::new();
        for (tag, value) in map {
            if validate::check_language_tag(&tag).is_err() {
                bad_keys.push(format!("{tag:?}"));
            }
            match value {
                Value::String(text) => {
                    out.insert(tag, text);
                }
                _ => bad_values.push(format!("{tag:?}")),
            }
        }
        if !bad_keys.is_empty() {
            let reason = format!("invalid language tag(s) {}", bad_keys.join(", "));
            self.violation(key, reason);
        }
        if !bad_values.is_empty() {
            let reason = format!("non-string value(s) for {}", bad_values.join(", "));
            self.violation(key, reason);
        }
        (bad_keys.is_empty() && bad_values.is_empty()).then_some(out)
    }

    /// A functional property: one URI or one inline document.
    pub(crate) fn reference(&mut self, key: &str, expect: Expect) -> Option<Reference> {
        let value = self.take(key)?;
        let path = self.path_of(key);
        self.document_ref(value, path, expect)
    }
    /// A non-functional property, keeping its singular or plural form.
    pub(crate) fn references(&mut self, key: &str, expect: Expect) -> Option<OneOrMany<Reference>> {
        let value = self.take(key)?;
        let path = self.path_of(key);
        match value {
            Value::Array(items) => {
                let mut refs = Vec::with_capacity(items.len());
                let mut complete = true;
                for (i, item) in items.into_iter().enumerate() {
                    match self.document_ref(item, format!("{path}[{i}]"), expect) {
                        Some(r) => refs.push(r),
                        None => complete = false,
                    }
                }
                complete.then_some(OneOrMany::Many(refs))
            }
            single => self.document_ref(single, path, expect).map(OneOrMany::One),
        }
    }
    /// A reference to a node type with a fixed shape, such as `publicKey`.
    pub(crate) fn inline<T: Inline>(&mut self, key: &str) -> Option<Reference<T>> {
        let value = self.take(key)?;
        let path = self.path_of(key);
        self.reference_at(value, path)
    }

    fn document_ref(&mut self, value: Value, path: String, expect: Expect) -> Option<Reference> {
        let reference = self.reference_at::<Document>(value, path.clone())?;
        if let Reference::Inline(document) = &reference {
            if let Err(reason) = expect.check(document) {
                self.report.push(path, reason);
                return None;
            }
        }
        Some(reference)
    }
    fn reference_at<T: Inline>(&mut self, value: Value, path: String) -> Option<Reference<T>> {
        match value {
            Value::String(uri) => match validate::absolute_uri(&uri) {
                Ok(()) => Some(Reference::Uri(uri)),
                Err(reason) => {
                    self.report.push(path, reason);
                    None
                }
            },
            Value::Object(map) => {
                if self.depth + 1 > MAX_DEPTH {
                    self.report
                        .push(path, format!("inline nodes nest deeper than {MAX_DEPTH} levels"));
                    return None;
                }
                T::parse_inline(self.nested(map, path)).map(|node| Reference::Inline(Box::new(node)))
            }
            other => {
                let reason = format!("expected a URI or an object, found {}", json_kind(&other));
                self.report.push(path, reason);
                None
            }
        }
    }

    /// Unconsumed members.
    pub(crate) fn finish(self) -> Map<String, Value> {
        self.map
    }
}

/// Builds the JSON form of a node.
pub(crate) struct Emit(Map<String, Value>);

impl Emit {
    pub(crate) fn new() -> Emit {
        Emit(Map::new())
    }
    pub(crate) fn put(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }
    pub(crate) fn opt<T: ToJson>(&mut self, key: &str, value: &Option<T>) {
        if let Some(value) = value {
            self.put(key, value.to_json());
        }
    }
    pub(crate) fn finish(mut self, rest: &Map<String, Value>) -> Value {
        for (key, value) in rest {
            self.0.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(self.0)
    }
}
