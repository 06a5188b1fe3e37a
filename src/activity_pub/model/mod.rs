//! Typed ActivityStreams documents.
//!
//! [`Document::try_from`] dispatches on `type` to one of the closed kind sets
//! and validates the whole tree in a single pass. Unknown types become
//! [`Extension`] documents instead of errors.

#[macro_use]
mod kinds;

mod activity;
mod actor;
mod collection;
mod context;
mod extension;
mod link;
mod node;
mod object;
mod reference;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

pub use activity::{Activity, ActivityBuilder, ActivityType, Closed, Question};
pub use actor::{Actor, ActorKind, Endpoints, PublicKey};
pub use collection::{Collection, CollectionKind, Page};
pub use context::{ACTIVITYSTREAMS, Context, ContextEntry, Envelope};
pub use extension::Extension;
pub use link::{Link, LinkKind};
pub use node::{LanguageMap, SchemaViolation, ToJson, ValidationError};
pub use object::{
    Object, ObjectDetail, ObjectProperties, ObjectType, Place, Profile, Relationship, Tombstone,
};
pub use reference::{OneOrMany, Reference};

use node::{Fields, Inline, Report, json_kind};

kinds! {
    /// Groups of kinds a property may expect inline.
    pub enum Family {
        Activity,
        Actor,
        Object,
        Link,
        Collection,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Activity(Activity),
    Actor(Actor),
    Object(Object),
    Link(Link),
    Collection(Collection),
    Extension(Extension),
}

/// A recognised `type` name.
enum Variant {
    Activity(ActivityType),
    Actor(ActorKind),
    Object(ObjectType),
    Link(LinkKind),
    Collection(CollectionKind),
}

impl Variant {
    fn resolve(name: &str) -> Option<Variant> {
        ActivityType::from_name(name)
            .map(Variant::Activity)
            .or_else(|| ActorKind::from_name(name).map(Variant::Actor))
            .or_else(|| ObjectType::from_name(name).map(Variant::Object))
            .or_else(|| LinkKind::from_name(name).map(Variant::Link))
            .or_else(|| CollectionKind::from_name(name).map(Variant::Collection))
    }
}

impl Inline for Document {
    fn parse_inline(mut fields: Fields<'_>) -> Option<Document> {
        let nulls = fields.nulls(&["@context", "id", "type"]);
        let kind = fields.take("type");
        let envelope = Envelope::parse(&mut fields);
        let variant = kind.as_ref().and_then(Value::as_str).and_then(Variant::resolve);
        match variant {
            Some(Variant::Activity(k)) => Activity::parse(k, envelope, fields).map(Document::Activity),
            Some(Variant::Actor(k)) => Actor::parse(k, envelope, fields).map(Document::Actor),
            Some(Variant::Object(k)) => Object::parse(k, envelope, fields).map(Document::Object),
            Some(Variant::Link(k)) => Link::parse(k, envelope, fields).map(Document::Link),
            Some(Variant::Collection(k)) => {
                Collection::parse(k, envelope, fields).map(Document::Collection)
            }
            None => {
                debug!(target: "apub", kind = ?kind, id = ?envelope.id, "keeping unknown type as extension");
                Some(Document::Extension(Extension::parse(kind, envelope, fields, nulls)))
            }
        }
    }
}

impl Document {
    /// Parse and validate, collecting every violation.
    pub fn from_value(value: Value) -> Result<Document, ValidationError> {
        let mut report = Report::default();
        let document = match value {
            Value::Object(map) => Document::parse_inline(Fields::new(map, &mut report)),
            other => {
                let reason = format!("expected an object, found {}", json_kind(&other));
                report.push("$".to_string(), reason);
                None
            }
        };
        report.finish(document)
    }

    pub fn to_value(&self) -> Value {
        match self {
            Document::Activity(activity) => activity.to_value(),
            Document::Actor(actor) => actor.to_value(),
            Document::Object(object) => object.to_value(),
            Document::Link(link) => link.to_value(),
            Document::Collection(collection) => collection.to_value(),
            Document::Extension(extension) => extension.to_value(),
        }
    }

    pub fn envelope(&self) -> &Envelope {
        match self {
            Document::Activity(activity) => &activity.envelope,
            Document::Actor(actor) => &actor.envelope,
            Document::Object(object) => &object.envelope,
            Document::Link(link) => &link.envelope,
            Document::Collection(collection) => &collection.envelope,
            Document::Extension(extension) => &extension.envelope,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.envelope().id.as_deref()
    }

    pub fn type_name(&self) -> &str {
        match self {
            Document::Activity(activity) => activity.kind.as_str(),
            Document::Actor(actor) => actor.kind.as_str(),
            Document::Object(object) => object.kind.as_str(),
            Document::Link(link) => link.kind.as_str(),
            Document::Collection(collection) => collection.kind.as_str(),
            Document::Extension(extension) => extension.type_name(),
        }
    }

    /// `None` for extensions.
    pub fn family(&self) -> Option<Family> {
        match self {
            Document::Activity(_) => Some(Family::Activity),
            Document::Actor(_) => Some(Family::Actor),
            Document::Object(_) => Some(Family::Object),
            Document::Link(_) => Some(Family::Link),
            Document::Collection(_) => Some(Family::Collection),
            Document::Extension(_) => None,
        }
    }

    pub fn as_activity(&self) -> Option<&Activity> {
        match self {
            Document::Activity(activity) => Some(activity),
            _ => None,
        }
    }
    pub fn as_actor(&self) -> Option<&Actor> {
        match self {
            Document::Actor(actor) => Some(actor),
            _ => None,
        }
    }
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Document::Object(object) => Some(object),
            _ => None,
        }
    }
    pub fn as_link(&self) -> Option<&Link> {
        match self {
            Document::Link(link) => Some(link),
            _ => None,
        }
    }
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Document::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

impl TryFrom<Value> for Document {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Document::from_value(value)
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        document.to_value()
    }
}

impl ToJson for Document {
    fn to_json(&self) -> Value {
        self.to_value()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Document::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}
