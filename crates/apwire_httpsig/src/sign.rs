use anyhow::{Context, Result, bail};
use http::header::{self, HeaderMap, HeaderValue};
use http::Method;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use jiff::Timestamp;
use tracing::debug;
use url::Url;

use crate::crypto::SignatureSigner;
use crate::digest::generate_digest;
use crate::params::SignatureParams;
use crate::signing_string::{REQUEST_TARGET, signing_string};

pub const HTTP_DATE_FMT: &str = "%a, %d %b %Y %H:%M:%S GMT";

const ACTIVITY_JSON: &str = "application/activity+json";

pub fn parse_http_date(value: &str) -> Result<Timestamp> {
    let civil = DateTime::strptime(HTTP_DATE_FMT, value)
        .with_context(|| format!("{value:?} is not an HTTP date"))?;
    Ok(civil.to_zoned(TimeZone::UTC)?.timestamp())
}

/// Sign a request in place.
///
/// Adds `Digest` when there is a body and `Date` when missing, then covers
/// `(request-target) host date` plus `digest content-type` for bodies.
pub fn sign_request(
    method: &Method,
    path: &str,
    headers: &mut HeaderMap,
    body: Option<&[u8]>,
    key_id: &str,
    signer: &dyn SignatureSigner,
) -> Result<()> {
    if !headers.contains_key(header::HOST) {
        bail!("a signed request needs a host header");
    }
    if !headers.contains_key(header::DATE) {
        let date = Timestamp::now().strftime(HTTP_DATE_FMT).to_string();
        headers.insert(header::DATE, date.parse()?);
    }
    let mut names = vec![
        REQUEST_TARGET.to_string(),
        "host".to_string(),
        "date".to_string(),
    ];
    if let Some(body) = body {
        if !headers.contains_key(header::CONTENT_TYPE) {
            bail!("a signed request with a body needs a content-type header");
        }
        headers.insert("digest", generate_digest(body).to_string().parse()?);
        names.push("digest".to_string());
        names.push("content-type".to_string());
    }

    let text = signing_string(&names, method, path, headers, None)?;
    let signature = signer.sign(text.as_bytes())?;
    let params = SignatureParams {
        key_id: key_id.to_string(),
        algorithm: Some(signer.algorithm().to_string()),
        headers: names,
        signature,
        created: None,
        expires: None,
    };
    headers.insert("signature", params.to_header_value().parse()?);
    debug!(target: "httpsig", %key_id, %method, %path, "request signed");
    Ok(())
}

/// Headers for delivering `body` to a remote inbox.
pub fn post_headers(
    key_id: &str,
    inbox: &str,
    body: &[u8],
    signer: &dyn SignatureSigner,
) -> Result<HeaderMap> {
    let (host, path) = host_and_path(inbox)?;
    let mut headers = HeaderMap::new();
    headers.insert(header::HOST, host.parse()?);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(ACTIVITY_JSON));
    sign_request(&Method::POST, &path, &mut headers, Some(body), key_id, signer)?;
    Ok(headers)
}

/// Headers for a signed fetch of `target`.
pub fn get_headers(key_id: &str, target: &str, signer: &dyn SignatureSigner) -> Result<HeaderMap> {
    let (host, path) = host_and_path(target)?;
    let mut headers = HeaderMap::new();
    headers.insert(header::HOST, host.parse()?);
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACTIVITY_JSON));
    sign_request(&Method::GET, &path, &mut headers, None, key_id, signer)?;
    Ok(headers)
}

fn host_and_path(target: &str) -> Result<(String, String)> {
    let url = Url::parse(target)?;
    let host = url
        .host_str()
        .context("target should have a host component")?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let path = match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    };
    Ok((host, path))
}
