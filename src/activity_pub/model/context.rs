use serde_json::{Map, Value};

use super::node::{Emit, Fields, ToJson, json_kind};
use super::reference::OneOrMany;

pub const ACTIVITYSTREAMS: &str = "https://www.w3.org/ns/activitystreams";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEntry {
    Uri(String),
    /// An inline term definition map, e.g. Mastodon's `{"toot": "..."}`.
    Terms(Map<String, Value>),
}

/// A JSON-LD `@context` that includes the ActivityStreams vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context(OneOrMany<ContextEntry>);

impl Context {
    pub fn activitystreams() -> Context {
        Context(OneOrMany::One(ContextEntry::Uri(ACTIVITYSTREAMS.to_string())))
    }
    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry> {
        self.0.iter()
    }
    fn parse(value: Value) -> Result<Context, String> {
        let entries = match value {
            Value::Array(items) => OneOrMany::Many(
                items
                    .into_iter()
                    .map(entry)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            single => OneOrMany::One(entry(single)?),
        };
        let context = Context(entries);
        let has_activitystreams = context
            .entries()
            .any(|e| matches!(e, ContextEntry::Uri(uri) if uri == ACTIVITYSTREAMS));
        if !has_activitystreams {
            return Err(format!("must include {ACTIVITYSTREAMS:?}"));
        }
        Ok(context)
    }
}

fn entry(value: Value) -> Result<ContextEntry, String> {
    match value {
        Value::String(uri) => Ok(ContextEntry::Uri(uri)),
        Value::Object(terms) => Ok(ContextEntry::Terms(terms)),
        other => Err(format!(
            "expected a URI or a term map, found {}",
            json_kind(&other)
        )),
    }
}

impl ToJson for ContextEntry {
    fn to_json(&self) -> Value {
        match self {
            ContextEntry::Uri(uri) => Value::String(uri.clone()),
            ContextEntry::Terms(terms) => Value::Object(terms.clone()),
        }
    }
}

impl ToJson for Context {
    fn to_json(&self) -> Value {
        self.0.to_json()
    }
}

/// Members every document carries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    pub context: Option<Context>,
    pub id: Option<String>,
}

impl Envelope {
    /// A top-level envelope with the ActivityStreams context.
    pub fn new(id: Option<String>) -> Envelope {
        Envelope {
            context: Some(Context::activitystreams()),
            id,
        }
    }
    /// `@context` is mandatory at the top level and checked wherever present.
    pub(crate) fn parse(fields: &mut Fields<'_>) -> Envelope {
        let context = match fields.take("@context") {
            Some(value) => match Context::parse(value) {
                Ok(context) => Some(context),
                Err(reason) => {
                    fields.violation("@context", reason);
                    None
                }
            },
            None => {
                if fields.is_top_level() {
                    fields.violation("@context", "is required on a top-level document");
                }
                None
            }
        };
        let id = fields.uri("id");
        Envelope { context, id }
    }
    pub(crate) fn emit(&self, kind: Option<Value>) -> Emit {
        let mut out = Emit::new();
        out.opt("@context", &self.context);
        out.opt("id", &self.id);
        if let Some(kind) = kind {
            out.put("type", kind);
        }
        out
    }
}
