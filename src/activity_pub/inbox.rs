use http::request::Parts;
use httpsig::{
    Authenticated, AwsLcVerifier, KeyResolver, Rejection, SignatureVerifier, VerifyOptions,
    verify_request,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::model::{Document, ValidationError};

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("request rejected: {0}")]
    Rejected(#[from] Rejection),
    #[error("invalid document: {0}")]
    Invalid(#[from] ValidationError),
    #[error("body is not JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// An authenticated, validated inbox post.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivered {
    pub authenticated: Authenticated,
    pub document: Document,
}

impl Delivered {
    /// Whether the signing key belongs to the activity's actor.
    ///
    /// Compares the key id without its fragment against every `actor` id.
    pub fn signed_by_actor(&self) -> bool {
        let key_id = self.authenticated.key_id.as_str();
        let key_owner = key_id.split_once('#').map_or(key_id, |(id, _)| id);
        match &self.document {
            Document::Activity(activity) => activity
                .actor
                .iter()
                .filter_map(|actor| actor.id())
                .any(|id| id == key_owner || id == key_id),
            _ => false,
        }
    }
}

/// Server side of `POST /inbox`: authenticate first, then parse.
pub struct Inbox<R, V = AwsLcVerifier> {
    resolver: R,
    verifier: V,
    options: VerifyOptions,
}

impl<R: KeyResolver> Inbox<R> {
    /// Verifies with [`VerifyOptions::recommended`].
    pub fn new(resolver: R) -> Inbox<R> {
        Inbox {
            resolver,
            verifier: AwsLcVerifier,
            options: VerifyOptions::recommended(),
        }
    }
}

impl<R: KeyResolver, V: SignatureVerifier> Inbox<R, V> {
    pub fn with_verifier<W: SignatureVerifier>(self, verifier: W) -> Inbox<R, W> {
        Inbox {
            resolver: self.resolver,
            verifier,
            options: self.options,
        }
    }

    pub fn with_options(mut self, options: VerifyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn receive(&self, parts: &Parts, body: &[u8]) -> Result<Delivered, InboxError> {
        let authenticated = verify_request(parts, body, &self.resolver, &self.verifier, &self.options)?;
        let value: Value = serde_json::from_slice(body)?;
        let document = Document::try_from(value).inspect_err(|e| {
            warn!(target: "apub", key_id = %authenticated.key_id, error = %e, "authenticated post failed validation");
        })?;
        debug!(
            target: "apub",
            key_id = %authenticated.key_id,
            kind = document.type_name(),
            id = ?document.id(),
            "delivered"
        );
        Ok(Delivered {
            authenticated,
            document,
        })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use http::{HeaderMap, HeaderValue, Method, Request};
    use httpsig::{
        HTTP_DATE_FMT, KeyKind, Rejection, generate_digest, generate_key_pair, sign_request,
    };
    use jiff::{SignedDuration, Timestamp};
    use serde_json::json;

    use super::{Inbox, InboxError};
    use crate::activity_pub::actor_store::ActorStore;
    use crate::activity_pub::model::Document;

    const ALICE: &str = "https://a.example/users/alice";
    const KEY_ID: &str = "https://a.example/users/alice#main-key";

    fn follow() -> Vec<u8> {
        json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": "https://a.example/activities/1",
            "type": "Follow",
            "actor": ALICE,
            "object": "https://b.example/users/bob"
        })
        .to_string()
        .into_bytes()
    }

    fn setup() -> Result<(ActorStore, Box<dyn httpsig::SignatureSigner + Send + Sync>)> {
        let key = generate_key_pair(KeyKind::Rsa2048)?;
        let actor = Document::try_from(json!({
            "@context": ["https://www.w3.org/ns/activitystreams", "https://w3id.org/security/v1"],
            "type": "Person",
            "id": ALICE,
            "inbox": format!("{ALICE}/inbox"),
            "outbox": format!("{ALICE}/outbox"),
            "publicKey": {"id": KEY_ID, "owner": ALICE, "publicKeyPem": key.public_pem}
        }))?;
        Ok((ActorStore::from_documents([&actor]), key.signer()?))
    }

    fn post(body: &[u8], signed_body: &[u8], signer: &dyn httpsig::SignatureSigner) -> Result<http::request::Parts> {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("b.example"));
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/activity+json"),
        );
        sign_request(&Method::POST, "/inbox", &mut headers, Some(signed_body), KEY_ID, signer)?;
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/inbox")
            .body(body.to_vec())?;
        *request.headers_mut() = headers;
        Ok(request.into_parts().0)
    }

    #[test]
    fn post_inbox_end_to_end() -> Result<()> {
        let (store, signer) = setup()?;
        let inbox = Inbox::new(store).with_options(httpsig::VerifyOptions {
            required_headers: vec!["digest".to_string()],
            max_clock_skew: Some(SignedDuration::from_secs(300)),
        });
        let body = follow();
        let parts = post(&body, &body, signer.as_ref())?;
        let delivered = inbox.receive(&parts, &body)?;
        assert_eq!(delivered.authenticated.key_id, KEY_ID);
        assert_eq!(delivered.document.type_name(), "Follow");
        assert!(delivered.signed_by_actor());
        Ok(())
    }

    #[test]
    fn tampered_body_is_a_digest_mismatch() -> Result<()> {
        let (store, signer) = setup()?;
        let inbox = Inbox::new(store);
        let body = follow();
        let tampered = String::from_utf8(body.clone())?.replace("Follow", "Block");
        let parts = post(tampered.as_bytes(), &body, signer.as_ref())?;
        let error = inbox.receive(&parts, tampered.as_bytes()).unwrap_err();
        assert!(matches!(error, InboxError::Rejected(Rejection::DigestMismatch)), "{error}");
        Ok(())
    }

    #[test]
    fn unsigned_digest_does_not_cover_the_body() -> Result<()> {
        let (store, signer) = setup()?;
        let inbox = Inbox::new(store);
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("b.example"));
        sign_request(&Method::POST, "/inbox", &mut headers, None, KEY_ID, signer.as_ref())?;

        let body = json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": "Delete",
            "actor": ALICE,
            "object": "https://a.example/users/alice"
        })
        .to_string()
        .into_bytes();
        headers.insert("digest", generate_digest(&body).to_string().parse()?);
        let mut request = Request::post("/inbox").body(body)?;
        *request.headers_mut() = headers;
        let (parts, body) = request.into_parts();
        assert!(matches!(
            inbox.receive(&parts, &body),
            Err(InboxError::Rejected(Rejection::SignatureHeaderMissing(_)))
        ));
        Ok(())
    }

    #[test]
    fn stale_date_is_rejected_by_default() -> Result<()> {
        let (store, signer) = setup()?;
        let inbox = Inbox::new(store);
        let body = follow();
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("b.example"));
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/activity+json"),
        );
        let long_ago = Timestamp::from_second(1_402_170_695)?;
        headers.insert("date", long_ago.strftime(HTTP_DATE_FMT).to_string().parse()?);
        sign_request(&Method::POST, "/inbox", &mut headers, Some(&body), KEY_ID, signer.as_ref())?;
        let mut request = Request::post("/inbox").body(body)?;
        *request.headers_mut() = headers;
        let (parts, body) = request.into_parts();
        assert!(matches!(
            inbox.receive(&parts, &body),
            Err(InboxError::Rejected(Rejection::SignatureVerificationFailed(_)))
        ));
        Ok(())
    }

    #[test]
    fn authenticated_but_invalid() -> Result<()> {
        let (store, signer) = setup()?;
        let inbox = Inbox::new(store);

        let body = br#"{"type":"Follow","actor":"alice"}"#;
        let parts = post(body, body, signer.as_ref())?;
        let Err(InboxError::Invalid(error)) = inbox.receive(&parts, body) else {
            panic!("expected validation to fail");
        };
        assert!(error.mentions("@context"));
        assert!(error.mentions("actor"));

        let body = b"{not json";
        let parts = post(body, body, signer.as_ref())?;
        assert!(matches!(inbox.receive(&parts, body), Err(InboxError::Malformed(_))));
        Ok(())
    }

    #[test]
    fn unknown_signer() -> Result<()> {
        let (_, signer) = setup()?;
        let inbox = Inbox::new(ActorStore::default());
        let body = follow();
        let parts = post(&body, &body, signer.as_ref())?;
        assert!(matches!(
            inbox.receive(&parts, &body),
            Err(InboxError::Rejected(Rejection::KeyResolutionFailed { .. }))
        ));
        Ok(())
    }
}
