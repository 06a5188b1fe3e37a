use serde_json::{Map, Value};

use super::context::Envelope;
use super::node::Fields;

/// A document whose `type` is outside the vocabulary, or missing.
///
/// Only the envelope is checked; everything else is kept as received,
/// including explicit nulls for `@context`, `id` and `type`.
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub envelope: Envelope,
    /// The raw `type` member, which need not be a string.
    pub kind: Option<Value>,
    pub rest: Map<String, Value>,
}

impl Extension {
    pub(crate) fn parse(
        kind: Option<Value>,
        envelope: Envelope,
        fields: Fields<'_>,
        nulls: Map<String, Value>,
    ) -> Extension {
        let mut rest = fields.finish();
        rest.extend(nulls);
        Extension { envelope, kind, rest }
    }

    pub fn type_name(&self) -> &str {
        match &self.kind {
            Some(Value::String(name)) => name,
            _ => "Extension",
        }
    }

    pub fn to_value(&self) -> Value {
        self.envelope.emit(self.kind.clone()).finish(&self.rest)
    }
}
