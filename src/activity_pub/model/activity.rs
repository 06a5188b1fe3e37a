use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::context::Envelope;
use super::node::{Emit, Expect, Fields, SchemaViolation, ToJson, ValidationError, json_kind};
use super::object::ObjectProperties;
use super::reference::{OneOrMany, Reference};
use super::Document;
use crate::activity_pub::validate::DateTime;

kinds! {
    pub enum ActivityType {
        Accept,
        Add,
        Announce,
        Arrive,
        Block,
        Create,
        Delete,
        Dislike,
        Flag,
        Follow,
        Ignore,
        Invite,
        Join,
        Leave,
        Like,
        Listen,
        Move,
        Offer,
        Question,
        Reject,
        Read,
        Remove,
        TentativeAccept,
        TentativeReject,
        Travel,
        Undo,
        Update,
        View,
    }
}

impl ActivityType {
    /// Kinds that never carry an `object`.
    pub fn is_intransitive(&self) -> bool {
        matches!(
            self,
            ActivityType::Arrive | ActivityType::Question | ActivityType::Travel
        )
    }
}

/// When a Question stops accepting answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closed {
    At(DateTime),
    Flag(bool),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Question {
    pub one_of: Option<OneOrMany<Reference>>,
    pub any_of: Option<OneOrMany<Reference>>,
    pub closed: Option<Closed>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub envelope: Envelope,
    pub kind: ActivityType,
    pub properties: ObjectProperties,
    pub actor: OneOrMany<Reference>,
    pub object: Option<OneOrMany<Reference>>,
    pub target: Option<OneOrMany<Reference>>,
    pub result: Option<OneOrMany<Reference>>,
    pub origin: Option<OneOrMany<Reference>>,
    pub instrument: Option<OneOrMany<Reference>>,
    /// Present on `Question` only.
    pub question: Option<Question>,
    pub rest: Map<String, Value>,
}

impl Activity {
    pub(crate) fn parse(kind: ActivityType, envelope: Envelope, mut fields: Fields<'_>) -> Option<Activity> {
        let properties = ObjectProperties::parse(&mut fields);
        fields.require("actor");
        let actor = fields.references("actor", Expect::ACTOR_OR_LINK);
        let object = if kind.is_intransitive() {
            if fields.take("object").is_some() {
                fields.violation("object", format!("{kind} is intransitive and takes no object"));
            }
            None
        } else {
            fields.references("object", Expect::ANY)
        };
        let target = fields.references("target", Expect::ANY);
        let result = fields.references("result", Expect::ANY);
        let origin = fields.references("origin", Expect::ANY);
        let instrument = fields.references("instrument", Expect::ANY);
        let question = (kind == ActivityType::Question).then(|| parse_question(&mut fields));
        Some(Activity {
            envelope,
            kind,
            properties,
            object,
            target,
            result,
            origin,
            instrument,
            question,
            rest: fields.finish(),
            actor: actor?,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut out = self.envelope.emit(Some(Value::String(self.kind.to_string())));
        self.properties.emit(&mut out);
        out.put("actor", self.actor.to_json());
        out.opt("object", &self.object);
        out.opt("target", &self.target);
        out.opt("result", &self.result);
        out.opt("origin", &self.origin);
        out.opt("instrument", &self.instrument);
        if let Some(question) = &self.question {
            emit_question(question, &mut out);
        }
        out.finish(&self.rest)
    }

    /// Start an activity around an existing object, the way a client's
    /// outbox post is turned into `Create` or `Update`.
    ///
    /// The object loses its `@context`; its audience and `published` are
    /// copied onto the activity.
    pub fn wrap(kind: ActivityType, object: Document) -> Result<ActivityBuilder, ValidationError> {
        if !matches!(kind, ActivityType::Create | ActivityType::Update) {
            return Err(single_violation("type", format!("{kind} does not wrap objects")));
        }
        let mut object = object;
        let properties = match &mut object {
            Document::Object(o) => {
                o.envelope.context = None;
                Some(o.properties.clone())
            }
            Document::Collection(c) => {
                c.envelope.context = None;
                Some(c.properties.clone())
            }
            Document::Activity(_) => {
                return Err(single_violation("object", "is already an activity"));
            }
            Document::Actor(a) => {
                a.envelope.context = None;
                None
            }
            Document::Link(l) => {
                l.envelope.context = None;
                None
            }
            Document::Extension(e) => {
                e.envelope.context = None;
                None
            }
        };

        let mut builder = ActivityBuilder::new(kind);
        if let Some(p) = properties {
            builder.properties.to = p.to;
            builder.properties.bto = p.bto;
            builder.properties.cc = p.cc;
            builder.properties.bcc = p.bcc;
            builder.properties.audience = p.audience;
            if let Some(published) = p.published {
                builder.properties.published = Some(published);
            }
        }
        builder.object = Some(OneOrMany::One(Reference::from(object)));
        Ok(builder)
    }
}

fn parse_question(fields: &mut Fields<'_>) -> Question {
    if fields.has("oneOf") && fields.has("anyOf") {
        fields.violation("anyOf", "a Question has either oneOf or anyOf, not both");
    }
    let closed = match fields.take("closed") {
        None => None,
        Some(Value::Bool(flag)) => Some(Closed::Flag(flag)),
        Some(Value::String(text)) => match DateTime::parse(&text) {
            Ok(at) => Some(Closed::At(at)),
            Err(reason) => {
                fields.violation("closed", reason);
                None
            }
        },
        Some(other) => {
            let reason = format!("expected a date-time or boolean, found {}", json_kind(&other));
            fields.violation("closed", reason);
            None
        }
    };
    Question {
        one_of: fields.references("oneOf", Expect::ANY),
        any_of: fields.references("anyOf", Expect::ANY),
        closed,
    }
}

fn emit_question(question: &Question, out: &mut Emit) {
    out.opt("oneOf", &question.one_of);
    out.opt("anyOf", &question.any_of);
    match &question.closed {
        Some(Closed::At(at)) => out.put("closed", Value::String(at.to_string())),
        Some(Closed::Flag(flag)) => out.put("closed", Value::Bool(*flag)),
        None => {}
    }
}

fn single_violation(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError(vec![SchemaViolation {
        field: field.to_string(),
        reason: reason.into(),
    }])
}

/// Assembles an outbound activity; `build` runs it through the same
/// validation as inbound documents.
#[derive(Debug, Clone)]
pub struct ActivityBuilder {
    kind: ActivityType,
    id: Option<String>,
    actor: Option<OneOrMany<Reference>>,
    object: Option<OneOrMany<Reference>>,
    target: Option<OneOrMany<Reference>>,
    properties: ObjectProperties,
}

impl ActivityBuilder {
    pub fn new(kind: ActivityType) -> ActivityBuilder {
        ActivityBuilder {
            kind,
            id: None,
            actor: None,
            object: None,
            target: None,
            properties: ObjectProperties::default(),
        }
    }
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
    /// Mint a time-ordered id under `base`, unless one is set already.
    pub fn mint_id(mut self, base: &str) -> Self {
        if self.id.is_none() {
            let base = base.trim_end_matches('/');
            self.id = Some(format!("{base}/activities/{}", Uuid::now_v7()));
        }
        self
    }
    pub fn actor(mut self, actor: impl Into<Reference>) -> Self {
        self.actor = Some(OneOrMany::One(actor.into()));
        self
    }
    pub fn object(mut self, object: impl Into<Reference>) -> Self {
        push(&mut self.object, object.into());
        self
    }
    pub fn target(mut self, target: impl Into<Reference>) -> Self {
        push(&mut self.target, target.into());
        self
    }
    pub fn to(mut self, recipient: impl Into<Reference>) -> Self {
        push(&mut self.properties.to, recipient.into());
        self
    }
    pub fn cc(mut self, recipient: impl Into<Reference>) -> Self {
        push(&mut self.properties.cc, recipient.into());
        self
    }
    pub fn published(mut self, at: DateTime) -> Self {
        self.properties.published = Some(at);
        self
    }

    pub fn build(mut self) -> Result<Activity, ValidationError> {
        let Some(actor) = self.actor else {
            return Err(single_violation("actor", "is required"));
        };
        if self.properties.published.is_none() {
            self.properties.published = Some(DateTime::now());
        }
        // a wrapped object without an author is attributed to the actor
        if let (Some(OneOrMany::One(Reference::Inline(object))), OneOrMany::One(author)) =
            (&mut self.object, &actor)
        {
            if let Document::Object(object) = object.as_mut() {
                if object.properties.attributed_to.is_none() {
                    object.properties.attributed_to = Some(OneOrMany::One(author.clone()));
                }
            }
        }
        let activity = Activity {
            envelope: Envelope::new(self.id),
            kind: self.kind,
            properties: self.properties,
            actor,
            object: self.object,
            target: self.target,
            result: None,
            origin: None,
            instrument: None,
            question: None,
            rest: Map::new(),
        };
        match Document::try_from(activity.to_value())? {
            Document::Activity(activity) => {
                debug!(target: "apub", kind = %activity.kind, id = ?activity.envelope.id, "activity built");
                Ok(activity)
            }
            other => Err(single_violation(
                "type",
                format!("expected an activity, found {}", other.type_name()),
            )),
        }
    }
}

fn push(slot: &mut Option<OneOrMany<Reference>>, value: Reference) {
    match slot {
        Some(list) => list.push(value),
        None => *slot = Some(OneOrMany::One(value)),
    }
}
