use serde_json::{Map, Value};

use super::context::Envelope;
use super::node::{Emit, Expect, Fields, Inline, ToJson};
use super::reference::{OneOrMany, Reference};

kinds! {
    pub enum ActorKind {
        Application,
        Group,
        Organization,
        Person,
        Service,
    }
}

/// The key an actor signs its requests with.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicKey {
    pub id: String,
    pub owner: Reference,
    pub public_key_pem: String,
    pub rest: Map<String, Value>,
}

impl Inline for PublicKey {
    fn parse_inline(mut fields: Fields<'_>) -> Option<PublicKey> {
        fields.require("id");
        fields.require("owner");
        fields.require("publicKeyPem");
        let id = fields.uri("id");
        let owner = fields.reference("owner", Expect::ACTOR);
        let public_key_pem = fields.string("publicKeyPem");
        Some(PublicKey {
            rest: fields.finish(),
            id: id?,
            owner: owner?,
            public_key_pem: public_key_pem?,
        })
    }
}

impl ToJson for PublicKey {
    fn to_json(&self) -> Value {
        let mut out = Emit::new();
        out.put("id", Value::String(self.id.clone()));
        out.put("owner", self.owner.to_json());
        out.put("publicKeyPem", Value::String(self.public_key_pem.clone()));
        out.finish(&self.rest)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Endpoints {
    pub proxy_url: Option<String>,
    pub oauth_authorization_endpoint: Option<String>,
    pub oauth_token_endpoint: Option<String>,
    pub provide_client_key: Option<String>,
    pub sign_client_key: Option<String>,
    pub shared_inbox: Option<String>,
    pub rest: Map<String, Value>,
}

impl Inline for Endpoints {
    fn parse_inline(mut fields: Fields<'_>) -> Option<Endpoints> {
        Some(Endpoints {
            proxy_url: fields.uri("proxyUrl"),
            oauth_authorization_endpoint: fields.uri("oauthAuthorizationEndpoint"),
            oauth_token_endpoint: fields.uri("oauthTokenEndpoint"),
            provide_client_key: fields.uri("provideClientKey"),
            sign_client_key: fields.uri("signClientKey"),
            shared_inbox: fields.uri("sharedInbox"),
            rest: fields.finish(),
        })
    }
}

impl ToJson for Endpoints {
    fn to_json(&self) -> Value {
        let mut out = Emit::new();
        out.opt("proxyUrl", &self.proxy_url);
        out.opt("oauthAuthorizationEndpoint", &self.oauth_authorization_endpoint);
        out.opt("oauthTokenEndpoint", &self.oauth_token_endpoint);
        out.opt("provideClientKey", &self.provide_client_key);
        out.opt("signClientKey", &self.sign_client_key);
        out.opt("sharedInbox", &self.shared_inbox);
        out.finish(&self.rest)
    }
}

/// Actors carry their mailboxes and key; descriptive members such as
/// `name` or `icon` stay in `rest`.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub envelope: Envelope,
    pub kind: ActorKind,
    pub inbox: Reference,
    pub outbox: Reference,
    pub following: Option<Reference>,
    pub followers: Option<Reference>,
    pub liked: Option<Reference>,
    pub streams: Option<OneOrMany<Reference>>,
    pub endpoints: Option<Reference<Endpoints>>,
    pub preferred_username: Option<String>,
    pub public_key: Option<Reference<PublicKey>>,
    pub manually_approves_followers: Option<bool>,
    pub discoverable: Option<bool>,
    pub rest: Map<String, Value>,
}

impl Actor {
    pub(crate) fn parse(kind: ActorKind, envelope: Envelope, mut fields: Fields<'_>) -> Option<Actor> {
        fields.require("inbox");
        fields.require("outbox");
        let inbox = fields.reference("inbox", Expect::COLLECTION);
        let outbox = fields.reference("outbox", Expect::COLLECTION);
        Some(Actor {
            envelope,
            kind,
            following: fields.reference("following", Expect::COLLECTION),
            followers: fields.reference("followers", Expect::COLLECTION),
            liked: fields.reference("liked", Expect::COLLECTION),
            streams: fields.references("streams", Expect::COLLECTION),
            endpoints: fields.inline("endpoints"),
            preferred_username: fields.string("preferredUsername"),
            public_key: fields.inline("publicKey"),
            manually_approves_followers: fields.boolean("manuallyApprovesFollowers"),
            discoverable: fields.boolean("discoverable"),
            rest: fields.finish(),
            inbox: inbox?,
            outbox: outbox?,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut out = self.envelope.emit(Some(Value::String(self.kind.to_string())));
        out.put("inbox", self.inbox.to_json());
        out.put("outbox", self.outbox.to_json());
        out.opt("following", &self.following);
        out.opt("followers", &self.followers);
        out.opt("liked", &self.liked);
        out.opt("streams", &self.streams);
        out.opt("endpoints", &self.endpoints);
        out.opt("preferredUsername", &self.preferred_username);
        out.opt("publicKey", &self.public_key);
        out.opt("manuallyApprovesFollowers", &self.manually_approves_followers);
        out.opt("discoverable", &self.discoverable);
        out.finish(&self.rest)
    }

    /// The inline key, if the actor embeds one.
    pub fn key(&self) -> Option<&PublicKey> {
        self.public_key.as_ref().and_then(Reference::as_inline)
    }

    /// `endpoints.sharedInbox`, falling back to the actor's own inbox.
    pub fn delivery_inbox(&self) -> Option<&str> {
        self.endpoints
            .as_ref()
            .and_then(Reference::as_inline)
            .and_then(|e| e.shared_inbox.as_deref())
            .or_else(|| self.inbox.id())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use super::ActorKind;
    use crate::activity_pub::model::Document;

    fn mastodon_actor() -> serde_json::Value {
        json!({
            "@context": [
                "https://www.w3.org/ns/activitystreams",
                "https://w3id.org/security/v1",
                {"manuallyApprovesFollowers": "as:manuallyApprovesFollowers",
                 "toot": "http://joinmastodon.org/ns#",
                 "discoverable": "toot:discoverable"}
            ],
            "id": "https://mastodon.example/users/alice",
            "type": "Person",
            "following": "https://mastodon.example/users/alice/following",
            "followers": "https://mastodon.example/users/alice/followers",
            "inbox": "https://mastodon.example/users/alice/inbox",
            "outbox": "https://mastodon.example/users/alice/outbox",
            "preferredUsername": "alice",
            "name": "Alice",
            "summary": "<p>hi</p>",
            "url": "https://mastodon.example/@alice",
            "manuallyApprovesFollowers": false,
            "discoverable": true,
            "published": "2022-11-05T00:00:00Z",
            "publicKey": {
                "id": "https://mastodon.example/users/alice#main-key",
                "owner": "https://mastodon.example/users/alice",
                "publicKeyPem": "-----BEGIN PUBLIC KEY-----\nMIIB\n-----END PUBLIC KEY-----\n"
            },
            "endpoints": {"sharedInbox": "https://mastodon.example/inbox"},
            "icon": {"type": "Image", "mediaType": "image/png",
                     "url": "https://files.mastodon.example/alice.png"}
        })
    }

    #[test]
    fn mastodon_actor_round_trip() -> Result<()> {
        let value = mastodon_actor();
        let document = Document::try_from(value.clone())?;
        let Document::Actor(actor) = &document else {
            panic!("expected an actor, got {document:?}");
        };
        assert_eq!(actor.kind, ActorKind::Person);
        assert_eq!(
            actor.key().map(|k| k.id.as_str()),
            Some("https://mastodon.example/users/alice#main-key")
        );
        assert_eq!(actor.delivery_inbox(), Some("https://mastodon.example/inbox"));
        assert_eq!(actor.rest.get("name"), Some(&json!("Alice")));
        assert_eq!(document.to_value(), value);
        Ok(())
    }

    #[test]
    fn mailboxes_and_key_are_checked() {
        let mut value = mastodon_actor();
        let object = value.as_object_mut().unwrap();
        object.remove("inbox");
        object.insert("outbox".to_string(), json!({"type": "Note"}));
        object.insert(
            "publicKey".to_string(),
            json!({"id": "https://mastodon.example/users/alice#main-key", "publicKeyPem": 7}),
        );
        let error = Document::try_from(value).unwrap_err();
        let fields: Vec<_> = error.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            ["inbox", "outbox", "publicKey.owner", "publicKey.publicKeyPem"]
        );
    }

    #[test]
    fn key_as_uri() -> Result<()> {
        let mut value = mastodon_actor();
        value["publicKey"] = json!("https://mastodon.example/keys/1");
        let Document::Actor(actor) = Document::try_from(value)? else {
            panic!("expected an actor");
        };
        assert!(actor.key().is_none());
        assert_eq!(
            actor.public_key.as_ref().and_then(|k| k.as_uri()),
            Some("https://mastodon.example/keys/1")
        );
        Ok(())
    }
}
