use anyhow::Result;
use http::header::{self, HeaderMap};
use http::request::Parts;
use jiff::{SignedDuration, Timestamp};
use tracing::{debug, warn};

use crate::crypto::{Algorithm, SignatureVerifier, VerifyError};
use crate::digest::check_digest_header;
use crate::params::SignatureParams;
use crate::sign::parse_http_date;
use crate::signing_string::{REQUEST_TARGET, signing_string};
use crate::Rejection;

/// Maps a `keyId` to the PEM encoded public key of its owner.
///
/// Usually backed by a network fetch plus a cache; both belong to the caller.
pub trait KeyResolver {
    fn resolve(&self, key_id: &str) -> Result<String>;
}

impl<F> KeyResolver for F
where
    F: Fn(&str) -> Result<String>,
{
    fn resolve(&self, key_id: &str) -> Result<String> {
        self(key_id)
    }
}

/// Progress of a single verification, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    DigestChecked,
    SigningStringBuilt,
    SignatureVerified,
}

#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Header names the signature must cover in addition to `(request-target)`.
    pub required_headers: Vec<String>,
    /// Reject a `date` header or `(created)` parameter further than this from now.
    pub max_clock_skew: Option<SignedDuration>,
}

impl VerifyOptions {
    /// `host` and `date` signed, at most five minutes of clock skew.
    pub fn recommended() -> VerifyOptions {
        VerifyOptions {
            required_headers: vec!["host".to_string(), "date".to_string()],
            max_clock_skew: Some(SignedDuration::from_mins(5)),
        }
    }
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub key_id: String,
    pub algorithm: Algorithm,
    pub signed_headers: Vec<String>,
}

/// Authenticate an inbound request.
///
/// An empty `body` means the request has none and skips the digest check.
/// Otherwise the signature must cover a `digest` header matching the body.
pub fn verify_request<R, V>(
    parts: &Parts,
    body: &[u8],
    resolver: &R,
    verifier: &V,
    options: &VerifyOptions,
) -> Result<Authenticated, Rejection>
where
    R: KeyResolver + ?Sized,
    V: SignatureVerifier + ?Sized,
{
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let result = verify_stages(parts, path, body, resolver, verifier, options);
    match &result {
        Ok(authenticated) => {
            debug!(target: "httpsig", key_id = %authenticated.key_id, %path, "request authenticated")
        }
        Err(rejection) => {
            warn!(target: "httpsig", method = %parts.method, %path, %rejection, "request rejected")
        }
    }
    result
}

fn verify_stages<R, V>(
    parts: &Parts,
    path: &str,
    body: &[u8],
    resolver: &R,
    verifier: &V,
    options: &VerifyOptions,
) -> Result<Authenticated, Rejection>
where
    R: KeyResolver + ?Sized,
    V: SignatureVerifier + ?Sized,
{
    let headers = &parts.headers;
    let mut stage = Stage::Received;

    if !body.is_empty() {
        let digest = headers
            .get("digest")
            .and_then(|v| v.to_str().ok())
            .ok_or(Rejection::DigestMismatch)?;
        check_digest_header(body, digest)?;
    }
    advance(&mut stage, Stage::DigestChecked);

    let params = signature_params(headers)?;
    let algorithm = match &params.algorithm {
        Some(name) => name
            .parse::<Algorithm>()
            .map_err(|_| Rejection::UnsupportedAlgorithm(name.clone()))?,
        None => Algorithm::Hs2019,
    };
    if !params.headers.iter().any(|h| h == REQUEST_TARGET) {
        return Err(Rejection::SignatureHeaderMissing(
            "headers does not cover (request-target)".to_string(),
        ));
    }
    if !body.is_empty() && !params.headers.iter().any(|h| h == "digest") {
        return Err(Rejection::SignatureHeaderMissing(
            "headers does not cover digest".to_string(),
        ));
    }
    for required in &options.required_headers {
        let required = required.to_ascii_lowercase();
        if !params.headers.contains(&required) {
            return Err(Rejection::SignatureVerificationFailed(format!(
                "signature does not cover required header {required}"
            )));
        }
    }
    check_freshness(headers, &params, options)?;

    let text = signing_string(&params.headers, &parts.method, path, headers, Some(&params))
        .map_err(|e| Rejection::SignatureVerificationFailed(format!("{e:#}")))?;
    advance(&mut stage, Stage::SigningStringBuilt);

    let public_key_pem = resolver.resolve(&params.key_id).map_err(|error| {
        debug!(target: "httpsig", key_id = %params.key_id, %error, "key resolution failed");
        Rejection::KeyResolutionFailed {
            key_id: params.key_id.clone(),
        }
    })?;
    verifier
        .verify(algorithm, &public_key_pem, text.as_bytes(), &params.signature)
        .map_err(|e| match e {
            VerifyError::Unsupported(detail) => Rejection::UnsupportedAlgorithm(detail),
            VerifyError::MalformedKey(_) => Rejection::KeyResolutionFailed {
                key_id: params.key_id.clone(),
            },
            VerifyError::Mismatch => {
                Rejection::SignatureVerificationFailed("signature does not match".to_string())
            }
        })?;
    advance(&mut stage, Stage::SignatureVerified);

    Ok(Authenticated {
        key_id: params.key_id,
        algorithm,
        signed_headers: params.headers,
    })
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!(target: "httpsig", from = ?stage, to = ?next, "verification stage");
    *stage = next;
}

fn signature_params(headers: &HeaderMap) -> Result<SignatureParams, Rejection> {
    let raw = match headers.get("signature") {
        Some(value) => value,
        None => headers
            .get(header::AUTHORIZATION)
            .filter(|v| {
                v.as_bytes()
                    .get(..10)
                    .is_some_and(|scheme| scheme.eq_ignore_ascii_case(b"signature "))
            })
            .ok_or_else(|| Rejection::SignatureHeaderMissing("no Signature header".to_string()))?,
    };
    let raw = raw
        .to_str()
        .map_err(|_| Rejection::SignatureHeaderMissing("header is not ASCII".to_string()))?;
    raw.parse()
        .map_err(|e: anyhow::Error| Rejection::SignatureHeaderMissing(format!("{e:#}")))
}

fn check_freshness(
    headers: &HeaderMap,
    params: &SignatureParams,
    options: &VerifyOptions,
) -> Result<(), Rejection> {
    let now = Timestamp::now();
    if let Some(expires) = params.expires {
        if expires < now.as_second() {
            return Err(Rejection::SignatureVerificationFailed(
                "signature has expired".to_string(),
            ));
        }
    }
    let Some(max_skew) = options.max_clock_skew else {
        return Ok(());
    };
    let signed_at = if let Some(created) = params.created {
        Timestamp::from_second(created).ok()
    } else {
        headers
            .get(header::DATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_http_date(v).ok())
    };
    let Some(signed_at) = signed_at else {
        return Err(Rejection::SignatureVerificationFailed(
            "request carries no usable date".to_string(),
        ));
    };
    if now.duration_since(signed_at).abs() > max_skew {
        return Err(Rejection::SignatureVerificationFailed(format!(
            "request date {signed_at} is outside the accepted window"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, bail};
    use http::{HeaderMap, HeaderValue, Method, Request};
    use jiff::{SignedDuration, Timestamp};

    use super::{Authenticated, VerifyOptions, verify_request};
    use crate::crypto::{Algorithm, SignatureSigner, SignatureVerifier, VerifyError};
    use crate::digest::generate_digest;
    use crate::sign::{HTTP_DATE_FMT, sign_request};
    use crate::{KeyKind, Rejection, generate_key_pair};

    const KEY_ID: &str = "https://a.example/users/alice#main-key";

    /// Signs by prefixing the message, so tests can see exactly what was signed.
    struct FakeSigner;

    impl SignatureSigner for FakeSigner {
        fn algorithm(&self) -> Algorithm {
            Algorithm::RsaSha256
        }
        fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
            Ok([b"signed:".as_slice(), message].concat())
        }
    }

    struct FakeVerifier;

    impl SignatureVerifier for FakeVerifier {
        fn verify(
            &self,
            algorithm: Algorithm,
            public_key_pem: &str,
            message: &[u8],
            signature: &[u8],
        ) -> Result<(), VerifyError> {
            if algorithm == Algorithm::Ed25519 {
                return Err(VerifyError::Unsupported("fake keys are RSA".to_string()));
            }
            assert_eq!(public_key_pem, "alice-pem");
            if signature == [b"signed:".as_slice(), message].concat() {
                Ok(())
            } else {
                Err(VerifyError::Mismatch)
            }
        }
    }

    fn alice(key_id: &str) -> Result<String> {
        if key_id == KEY_ID {
            return Ok("alice-pem".to_string());
        }
        bail!("unknown key {key_id}")
    }

    fn signed_post(body: &[u8]) -> Result<(http::request::Parts, Vec<u8>)> {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("b.example"));
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/activity+json"),
        );
        sign_request(
            &Method::POST,
            "/inbox",
            &mut headers,
            Some(body),
            KEY_ID,
            &FakeSigner,
        )?;
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/inbox")
            .body(body.to_vec())?;
        *request.headers_mut() = headers;
        let (parts, body) = request.into_parts();
        Ok((parts, body))
    }

    fn verify(parts: &http::request::Parts, body: &[u8]) -> Result<Authenticated, Rejection> {
        verify_request(parts, body, &alice, &FakeVerifier, &VerifyOptions::default())
    }

    #[test]
    fn accepts_what_it_signed() -> Result<()> {
        let (parts, body) = signed_post(br#"{"type":"Follow"}"#)?;
        let authenticated = verify(&parts, &body)?;
        assert_eq!(authenticated.key_id, KEY_ID);
        assert_eq!(authenticated.algorithm, Algorithm::RsaSha256);
        assert_eq!(
            authenticated.signed_headers,
            vec!["(request-target)", "host", "date", "digest", "content-type"]
        );
        Ok(())
    }

    #[test]
    fn body_must_match_digest() -> Result<()> {
        let (parts, _) = signed_post(br#"{"type":"Follow"}"#)?;
        assert_eq!(
            verify(&parts, br#"{"type":"Block"}"#),
            Err(Rejection::DigestMismatch)
        );

        let (mut parts, body) = signed_post(br#"{"type":"Follow"}"#)?;
        parts.headers.remove("digest");
        assert_eq!(verify(&parts, &body), Err(Rejection::DigestMismatch));
        Ok(())
    }

    #[test]
    fn consistent_tampering_fails_the_signature() -> Result<()> {
        let (mut parts, _) = signed_post(br#"{"type":"Follow"}"#)?;
        let tampered = br#"{"type":"Block"}"#;
        parts.headers.insert(
            "digest",
            generate_digest(tampered).to_string().parse()?,
        );
        assert!(matches!(
            verify(&parts, tampered),
            Err(Rejection::SignatureVerificationFailed(_))
        ));
        Ok(())
    }

    #[test]
    fn signed_digest_header_must_be_present() -> Result<()> {
        // a bodiless request still declaring digest in its signed headers
        let (mut parts, _) = signed_post(b"{}")?;
        parts.headers.remove("digest");
        assert!(matches!(
            verify(&parts, b""),
            Err(Rejection::SignatureVerificationFailed(_))
        ));
        Ok(())
    }

    #[test]
    fn body_needs_a_signed_digest() -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("b.example"));
        sign_request(&Method::POST, "/inbox", &mut headers, None, KEY_ID, &FakeSigner)?;
        let body = br#"{"type":"Delete","object":"https://b.example/users/bob"}"#;
        headers.insert("digest", generate_digest(body).to_string().parse()?);
        let mut request = Request::post("/inbox").body(body.to_vec())?;
        *request.headers_mut() = headers;
        let (parts, body) = request.into_parts();

        assert_eq!(
            verify(&parts, &body),
            Err(Rejection::SignatureHeaderMissing(
                "headers does not cover digest".to_string()
            ))
        );
        // the same signature is fine without a body
        assert!(verify(&parts, b"").is_ok());
        Ok(())
    }

    #[test]
    fn recommended_options() -> Result<()> {
        let options = VerifyOptions::recommended();
        assert_eq!(options.required_headers, ["host", "date"]);
        assert_eq!(options.max_clock_skew, Some(SignedDuration::from_secs(300)));
        let (parts, body) = signed_post(b"{}")?;
        assert!(verify_request(&parts, &body, &alice, &FakeVerifier, &options).is_ok());
        Ok(())
    }

    #[test]
    fn signature_header_problems() -> Result<()> {
        let (mut parts, body) = signed_post(b"{}")?;
        let signature = parts.headers.remove("signature").unwrap();
        assert!(matches!(
            verify(&parts, &body),
            Err(Rejection::SignatureHeaderMissing(_))
        ));

        let mut authorization = b"Signature ".to_vec();
        authorization.extend_from_slice(signature.as_bytes());
        parts
            .headers
            .insert("authorization", HeaderValue::from_bytes(&authorization)?);
        assert!(verify(&parts, &body).is_ok());
        parts.headers.remove("authorization");

        let text = signature.to_str()?;
        for (from, to) in [
            ("(request-target) ", ""),
            ("rsa-sha256", "hmac-sha256"),
            ("rsa-sha256", "ed25519"),
            (KEY_ID, "https://c.example/users/carol#main-key"),
        ] {
            parts
                .headers
                .insert("signature", text.replace(from, to).parse()?);
            let result = verify(&parts, &body);
            match from {
                "(request-target) " => {
                    assert!(matches!(result, Err(Rejection::SignatureHeaderMissing(_))))
                }
                "rsa-sha256" => {
                    assert!(matches!(result, Err(Rejection::UnsupportedAlgorithm(_))))
                }
                _ => assert!(matches!(result, Err(Rejection::KeyResolutionFailed { .. }))),
            }
        }
        Ok(())
    }

    #[test]
    fn required_headers_and_clock_skew() -> Result<()> {
        let (parts, body) = signed_post(b"{}")?;
        let options = VerifyOptions {
            required_headers: vec!["Digest".to_string(), "accept".to_string()],
            max_clock_skew: None,
        };
        assert!(matches!(
            verify_request(&parts, &body, &alice, &FakeVerifier, &options),
            Err(Rejection::SignatureVerificationFailed(_))
        ));

        let options = VerifyOptions {
            required_headers: vec!["digest".to_string()],
            max_clock_skew: Some(SignedDuration::from_secs(300)),
        };
        assert!(verify_request(&parts, &body, &alice, &FakeVerifier, &options).is_ok());

        let mut stale = HeaderMap::new();
        let long_ago = Timestamp::from_second(1_402_170_695)?;
        stale.insert("host", HeaderValue::from_static("b.example"));
        stale.insert("date", long_ago.strftime(HTTP_DATE_FMT).to_string().parse()?);
        sign_request(&Method::GET, "/outbox", &mut stale, None, KEY_ID, &FakeSigner)?;
        let mut request = Request::get("/outbox").body(Vec::<u8>::new())?;
        *request.headers_mut() = stale;
        let (parts, _) = request.into_parts();
        assert!(verify(&parts, b"").is_ok());
        assert!(matches!(
            verify_request(&parts, b"", &alice, &FakeVerifier, &options),
            Err(Rejection::SignatureVerificationFailed(_))
        ));
        Ok(())
    }

    #[test]
    fn rsa_round_trip_with_real_keys() -> Result<()> {
        let key = generate_key_pair(KeyKind::Rsa2048)?;
        let signer = key.signer()?;
        let body = br#"{"type":"Like"}"#;

        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("b.example"));
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/activity+json"),
        );
        sign_request(
            &Method::POST,
            "/inbox",
            &mut headers,
            Some(body),
            KEY_ID,
            signer.as_ref(),
        )?;
        let mut request = Request::post("/inbox").body(body.to_vec())?;
        *request.headers_mut() = headers;
        let (mut parts, body) = request.into_parts();

        let resolver = |_: &str| -> Result<String> { Ok(key.public_pem.clone()) };
        let verifier = crate::AwsLcVerifier;
        let options = VerifyOptions::default();
        assert!(verify_request(&parts, &body, &resolver, &verifier, &options).is_ok());

        // flip one byte of the signature value
        let text = parts.headers["signature"].to_str()?.to_string();
        let (head, tail) = text.split_once("signature=\"").unwrap();
        let mut sig = tail.trim_end_matches('"').as_bytes().to_vec();
        sig[0] = if sig[0] == b'A' { b'B' } else { b'A' };
        let flipped = format!("{head}signature=\"{}\"", String::from_utf8(sig)?);
        parts.headers.insert("signature", flipped.parse()?);
        assert!(matches!(
            verify_request(&parts, &body, &resolver, &verifier, &options),
            Err(Rejection::SignatureVerificationFailed(_))
        ));
        Ok(())
    }
}
