//! Raw HTTP/1.1 requests as seen on the wire.

use anyhow::{Context, Result, bail};
use http::request::Parts;
use http::{HeaderName, HeaderValue, Method, Request};

/// Split a dump into request head and body.
///
/// The head ends at the first blank line; `\r\n` and bare `\n` are both
/// accepted. Folded header lines are not.
pub(crate) fn parse_request(raw: &[u8]) -> Result<(Parts, Vec<u8>)> {
    let (head, body) = split_head(raw).context("request has no blank line after its headers")?;
    let head = std::str::from_utf8(head).context("request head is not UTF-8")?;
    let mut lines = head.lines().map(|line| line.trim_end_matches('\r'));

    let request_line = lines.next().context("empty request")?;
    let mut words = request_line.split_ascii_whitespace();
    let (Some(method), Some(target)) = (words.next(), words.next()) else {
        bail!("malformed request line {request_line:?}");
    };
    let mut request = Request::builder()
        .method(Method::from_bytes(method.as_bytes())?)
        .uri(target)
        .body(body.to_vec())?;

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            bail!("malformed header line {line:?}");
        };
        request.headers_mut().append(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }
    let (parts, body) = request.into_parts();
    Ok((parts, body))
}

fn split_head(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    let crlf = raw.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, i + 4));
    let lf = raw.windows(2).position(|w| w == b"\n\n").map(|i| (i, i + 2));
    let (end, start) = match (crlf, lf) {
        (Some(a), Some(b)) => a.min(b),
        (a, b) => a.or(b)?,
    };
    Some((&raw[..end], &raw[start..]))
}
