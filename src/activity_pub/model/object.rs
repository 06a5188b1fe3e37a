//! Objects: the non-activity, non-actor members of the vocabulary.

use serde_json::{Map, Number, Value};

use super::context::Envelope;
use super::node::{Emit, Expect, Fields, LanguageMap};
use super::reference::{OneOrMany, Reference};
use crate::activity_pub::validate::{self, DateTime, Duration, MediaType};

kinds! {
    pub enum ObjectType {
        Object,
        Article,
        Document,
        Audio,
        Image,
        Page,
        Video,
        Event,
        Note,
        Place,
        Profile,
        Relationship,
        Tombstone,
    }
}

/// Properties shared by objects, activities and collections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectProperties {
    pub attachment: Option<OneOrMany<Reference>>,
    pub attributed_to: Option<OneOrMany<Reference>>,
    pub audience: Option<OneOrMany<Reference>>,
    pub content: Option<String>,
    pub content_map: Option<LanguageMap>,
    pub context: Option<OneOrMany<Reference>>,
    pub name: Option<String>,
    pub name_map: Option<LanguageMap>,
    pub end_time: Option<DateTime>,
    pub generator: Option<OneOrMany<Reference>>,
    pub icon: Option<OneOrMany<Reference>>,
    pub image: Option<OneOrMany<Reference>>,
    pub in_reply_to: Option<OneOrMany<Reference>>,
    pub location: Option<OneOrMany<Reference>>,
    pub preview: Option<OneOrMany<Reference>>,
    pub published: Option<DateTime>,
    pub replies: Option<Reference>,
    pub start_time: Option<DateTime>,
    pub summary: Option<String>,
    pub summary_map: Option<LanguageMap>,
    pub tag: Option<OneOrMany<Reference>>,
    pub updated: Option<DateTime>,
    pub url: Option<OneOrMany<Reference>>,
    pub to: Option<OneOrMany<Reference>>,
    pub bto: Option<OneOrMany<Reference>>,
    pub cc: Option<OneOrMany<Reference>>,
    pub bcc: Option<OneOrMany<Reference>>,
    pub media_type: Option<MediaType>,
    pub duration: Option<Duration>,
}

impl ObjectProperties {
    pub(crate) fn parse(fields: &mut Fields<'_>) -> ObjectProperties {
        ObjectProperties {
            attachment: fields.references("attachment", Expect::ANY),
            attributed_to: fields.references("attributedTo", Expect::ANY),
            audience: fields.references("audience", Expect::ANY),
            content: fields.string("content"),
            content_map: fields.language_map("contentMap"),
            context: fields.references("context", Expect::ANY),
            name: fields.string("name"),
            name_map: fields.language_map("nameMap"),
            end_time: fields.date_time("endTime"),
            generator: fields.references("generator", Expect::ANY),
            icon: fields.references("icon", Expect::ANY),
            image: fields.references("image", Expect::ANY),
            in_reply_to: fields.references("inReplyTo", Expect::ANY),
            location: fields.references("location", Expect::ANY),
            preview: fields.references("preview", Expect::ANY),
            published: fields.date_time("published"),
            replies: fields.reference("replies", Expect::COLLECTION),
            start_time: fields.date_time("startTime"),
            summary: fields.string("summary"),
            summary_map: fields.language_map("summaryMap"),
            tag: fields.references("tag", Expect::ANY),
            updated: fields.date_time("updated"),
            url: fields.references("url", Expect::LINK),
            to: fields.references("to", Expect::ANY),
            bto: fields.references("bto", Expect::ANY),
            cc: fields.references("cc", Expect::ANY),
            bcc: fields.references("bcc", Expect::ANY),
            media_type: fields.media_type("mediaType"),
            duration: fields.duration("duration"),
        }
    }
    pub(crate) fn emit(&self, out: &mut Emit) {
        out.opt("attachment", &self.attachment);
        out.opt("attributedTo", &self.attributed_to);
        out.opt("audience", &self.audience);
        out.opt("content", &self.content);
        out.opt("contentMap", &self.content_map);
        out.opt("context", &self.context);
        out.opt("name", &self.name);
        out.opt("nameMap", &self.name_map);
        out.opt("endTime", &self.end_time);
        out.opt("generator", &self.generator);
        out.opt("icon", &self.icon);
        out.opt("image", &self.image);
        out.opt("inReplyTo", &self.in_reply_to);
        out.opt("location", &self.location);
        out.opt("preview", &self.preview);
        out.opt("published", &self.published);
        out.opt("replies", &self.replies);
        out.opt("startTime", &self.start_time);
        out.opt("summary", &self.summary);
        out.opt("summaryMap", &self.summary_map);
        out.opt("tag", &self.tag);
        out.opt("updated", &self.updated);
        out.opt("url", &self.url);
        out.opt("to", &self.to);
        out.opt("bto", &self.bto);
        out.opt("cc", &self.cc);
        out.opt("bcc", &self.bcc);
        out.opt("mediaType", &self.media_type);
        out.opt("duration", &self.duration);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Place {
    /// Percentage, 0 to 100.
    pub accuracy: Option<Number>,
    pub altitude: Option<Number>,
    pub latitude: Option<Number>,
    pub longitude: Option<Number>,
    pub radius: Option<Number>,
    /// One of `cm`, `feet`, `inches`, `km`, `m`, `miles`, or a URI.
    pub units: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Profile {
    pub describes: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relationship {
    pub subject: Option<Reference>,
    pub object: Option<OneOrMany<Reference>>,
    pub relationship: Option<OneOrMany<Reference>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tombstone {
    pub former_type: Option<OneOrMany<String>>,
    pub deleted: Option<DateTime>,
}

/// Members only some object types define.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ObjectDetail {
    #[default]
    Plain,
    Place(Place),
    Profile(Profile),
    Relationship(Relationship),
    Tombstone(Tombstone),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub envelope: Envelope,
    pub kind: ObjectType,
    pub properties: ObjectProperties,
    pub detail: ObjectDetail,
    /// Members outside the vocabulary, kept for re-serialization.
    pub rest: Map<String, Value>,
}

impl Object {
    pub fn new(kind: ObjectType) -> Object {
        Object {
            envelope: Envelope::new(None),
            kind,
            properties: ObjectProperties::default(),
            detail: ObjectDetail::Plain,
            rest: Map::new(),
        }
    }

    pub(crate) fn parse(kind: ObjectType, envelope: Envelope, mut fields: Fields<'_>) -> Option<Object> {
        let properties = ObjectProperties::parse(&mut fields);
        let detail = match kind {
            ObjectType::Place => ObjectDetail::Place(parse_place(&mut fields)),
            ObjectType::Profile => ObjectDetail::Profile(Profile {
                describes: fields.reference("describes", Expect::ANY),
            }),
            ObjectType::Relationship => ObjectDetail::Relationship(Relationship {
                subject: fields.reference("subject", Expect::ANY),
                object: fields.references("object", Expect::ANY),
                relationship: fields.references("relationship", Expect::ANY),
            }),
            ObjectType::Tombstone => ObjectDetail::Tombstone(Tombstone {
                former_type: fields.strings("formerType"),
                deleted: fields.date_time("deleted"),
            }),
            _ => ObjectDetail::Plain,
        };
        Some(Object {
            envelope,
            kind,
            properties,
            detail,
            rest: fields.finish(),
        })
    }

    pub fn to_value(&self) -> Value {
        let mut out = self.envelope.emit(Some(Value::String(self.kind.to_string())));
        self.properties.emit(&mut out);
        match &self.detail {
            ObjectDetail::Plain => {}
            ObjectDetail::Place(place) => {
                out.opt("accuracy", &place.accuracy);
                out.opt("altitude", &place.altitude);
                out.opt("latitude", &place.latitude);
                out.opt("longitude", &place.longitude);
                out.opt("radius", &place.radius);
                out.opt("units", &place.units);
            }
            ObjectDetail::Profile(profile) => out.opt("describes", &profile.describes),
            ObjectDetail::Relationship(rel) => {
                out.opt("subject", &rel.subject);
                out.opt("object", &rel.object);
                out.opt("relationship", &rel.relationship);
            }
            ObjectDetail::Tombstone(tombstone) => {
                out.opt("formerType", &tombstone.former_type);
                out.opt("deleted", &tombstone.deleted);
            }
        }
        out.finish(&self.rest)
    }
}

fn parse_place(fields: &mut Fields<'_>) -> Place {
    let units = fields.string("units");
    if let Some(Err(reason)) = units.as_deref().map(validate::units) {
        fields.violation("units", reason);
    }
    Place {
        accuracy: fields.number("accuracy", Some(0.0), Some(100.0)),
        altitude: fields.number("altitude", None, None),
        latitude: fields.number("latitude", None, None),
        longitude: fields.number("longitude", None, None),
        radius: fields.number("radius", Some(0.0), None),
        units,
    }
}
