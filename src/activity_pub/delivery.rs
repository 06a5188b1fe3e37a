use anyhow::{Context, Result};
use http::HeaderMap;
use http::header::{self, HeaderValue};
use httpsig::{SignatureSigner, post_headers};
use tracing::debug;

use super::model::Document;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A signed request ready to be handed to an HTTP client.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub inbox: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Serialize `document` and sign a POST of it to `inbox`.
pub fn prepare_delivery(
    document: &Document,
    inbox: &str,
    key_id: &str,
    signer: &dyn SignatureSigner,
) -> Result<Delivery> {
    let body = serde_json::to_vec(&document.to_value())?;
    let mut headers = post_headers(key_id, inbox, &body, signer)
        .with_context(|| format!("unable to sign delivery to {inbox}"))?;
    headers.insert(header::USER_AGENT, HeaderValue::from_static(APP_USER_AGENT));
    debug!(target: "apub", %inbox, kind = document.type_name(), id = ?document.id(), "delivery prepared");
    Ok(Delivery {
        inbox: inbox.to_string(),
        headers,
        body,
    })
}

impl Delivery {
    /// The request as a receiving server would see it.
    pub fn into_request(self) -> Result<http::Request<Vec<u8>>> {
        let url = url::Url::parse(&self.inbox)?;
        let path = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };
        let mut request = http::Request::builder()
            .method(http::Method::POST)
            .uri(path)
            .body(self.body)?;
        *request.headers_mut() = self.headers;
        Ok(request)
    }
}
