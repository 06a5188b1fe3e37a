use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

use anyhow::{Context, Result, bail};
use base64ct::{Base64, Encoding};

/// Parsed `Signature` header parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParams {
    pub key_id: String,
    /// As sent; `None` when the client left it out.
    pub algorithm: Option<String>,
    /// Signed header names, lowercased, in signing order.
    pub headers: Vec<String>,
    pub signature: Vec<u8>,
    pub created: Option<i64>,
    pub expires: Option<i64>,
}

impl SignatureParams {
    /// Render back into a `Signature` header value.
    pub fn to_header_value(&self) -> String {
        let mut value = format!("keyId=\"{}\"", escape(&self.key_id));
        if let Some(algorithm) = &self.algorithm {
            value.push_str(&format!(",algorithm=\"{}\"", escape(algorithm)));
        }
        if let Some(created) = self.created {
            value.push_str(&format!(",created={created}"));
        }
        if let Some(expires) = self.expires {
            value.push_str(&format!(",expires={expires}"));
        }
        value.push_str(&format!(
            ",headers=\"{}\",signature=\"{}\"",
            self.headers.join(" "),
            Base64::encode_string(&self.signature)
        ));
        value
    }
}

impl FromStr for SignatureParams {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        // Authorization: Signature keyId=...
        let input = match input.trim_start().split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("signature") => rest,
            _ => input,
        };
        let mut params = parse_sig_params(input)?;
        let key_id = params.remove("keyId").context("keyId is required")?;
        let headers = parse_headers(&params.remove("headers").context("headers is required")?)?;
        if headers.is_empty() {
            bail!("headers must name at least one header");
        }
        let signature = Base64::decode_vec(
            &params
                .remove("signature")
                .context("signature is required")?,
        )
        .map_err(|_| anyhow::anyhow!("signature is not valid base64"))?;
        let created = params
            .remove("created")
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("created must be an integer")?;
        let expires = params
            .remove("expires")
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("expires must be an integer")?;

        Ok(SignatureParams {
            key_id,
            algorithm: params.remove("algorithm"),
            headers,
            signature,
            created,
            expires,
        })
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn parse_sig_params(input: &str) -> Result<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    let mut it = input.chars().peekable();
    while it.peek().is_some() {
        eat_bws(&mut it);
        let token = eat_token(&mut it)?;
        eat_bws(&mut it);
        eat_eq(&mut it)?;
        eat_bws(&mut it);
        let value = if it.peek() == Some(&'"') {
            eat_quoted_string(&mut it)?
        } else {
            eat_token(&mut it)?
        };
        params.insert(token, value);
        eat_bws(&mut it);
        if it.peek().is_none() {
            break;
        }
        eat_comma(&mut it)?;
        eat_bws(&mut it);
    }
    Ok(params)
}

fn parse_headers(input: &str) -> Result<Vec<String>> {
    let mut headers = vec![];
    let mut it = input.chars().peekable();
    while it.peek().is_some() {
        eat_bws(&mut it);
        if it.peek().is_none() {
            break;
        }
        let header = eat_string(&mut it)?;
        headers.push(header.to_ascii_lowercase());
        eat_bws(&mut it);
    }
    Ok(headers)
}

fn eat_bws(it: &mut Peekable<Chars<'_>>) {
    while it.next_if(char::is_ascii_whitespace).is_some() {}
}
fn eat_eq(it: &mut Peekable<Chars<'_>>) -> Result<()> {
    if it.next_if_eq(&'=').is_none() {
        bail!("invalid auth-param, missing expected '='");
    }
    Ok(())
}
fn eat_comma(it: &mut Peekable<Chars<'_>>) -> Result<()> {
    if it.next_if_eq(&',').is_none() {
        bail!("invalid auth-param, missing expected ','");
    }
    Ok(())
}
#[rustfmt::skip]
fn is_tchar(c: &char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '!'| '#'| '$'| '%'| '&'| '\''| '*'| '+'| '-'| '.'| '^'| '_'| '`'| '|'| '~')
}
fn eat_token(it: &mut Peekable<Chars<'_>>) -> Result<String> {
    let mut token = String::new();
    while let Some(c) = it.next_if(is_tchar) {
        token.push(c);
    }
    if token.is_empty() {
        bail!("expected at least one tchar");
    }
    Ok(token)
}
fn eat_string(it: &mut Peekable<Chars<'_>>) -> Result<String> {
    let mut token = String::new();
    while let Some(c) = it.next_if(|c| !c.is_ascii_whitespace()) {
        token.push(c);
    }
    if token.is_empty() {
        bail!("expected at least one char");
    }
    Ok(token)
}
fn eat_quoted_string(it: &mut Peekable<Chars<'_>>) -> Result<String> {
    let mut string = String::new();
    if it.next_if_eq(&'"').is_none() {
        bail!("expected DQUOTE");
    }
    let mut has_right_dquote = false;
    while let Some(c) = it.next() {
        // quoted-pair
        if c == '\\' {
            if let Some(escaped) = it.next() {
                string.push(escaped);
            }
            continue;
        }
        if c == '"' {
            has_right_dquote = true;
            break;
        }
        string.push(c);
    }
    if !has_right_dquote {
        bail!("expected a pair of DQUOTE");
    }
    Ok(string)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{SignatureParams, parse_headers, parse_sig_params};

    #[test]
    fn test_parse_sig_params() -> Result<()> {
        let signature = r#"keyId="id=\"123\"",algorithm="hs2019",
            created=1402170695, expires=1402170995,
            headers="(request-target) (created) (expires)
               host date digest content-length",
            signature="6QQ1ckyr6Tge+t0sBe99S3qyMjW6AF6kLeL7bV6ByzM=""#;
        let params = parse_sig_params(signature)?;

        assert_eq!(params.get("keyId"), Some(&"id=\"123\"".to_string()));
        assert_eq!(params.get("algorithm"), Some(&"hs2019".to_string()));
        assert_eq!(params.get("created"), Some(&"1402170695".to_string()));
        assert_eq!(params.get("expires"), Some(&"1402170995".to_string()));
        assert_eq!(
            params.get("signature"),
            Some(&"6QQ1ckyr6Tge+t0sBe99S3qyMjW6AF6kLeL7bV6ByzM=".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_parse_headers() -> Result<()> {
        let input =
            "(request-target) (created) (expires)\n               Host date digest content-length ";
        let headers = parse_headers(input)?;
        assert_eq!(
            headers,
            vec![
                "(request-target)",
                "(created)",
                "(expires)",
                "host",
                "date",
                "digest",
                "content-length"
            ]
        );
        Ok(())
    }

    #[test]
    fn signature_params_from_header() -> Result<()> {
        let header = r#"keyId="https://a.example/users/alice#main-key",algorithm="rsa-sha256",headers="(request-target) host date",signature="AAEC""#;
        let params: SignatureParams = header.parse()?;
        assert_eq!(params.key_id, "https://a.example/users/alice#main-key");
        assert_eq!(params.algorithm.as_deref(), Some("rsa-sha256"));
        assert_eq!(params.headers, vec!["(request-target)", "host", "date"]);
        assert_eq!(params.signature, vec![0, 1, 2]);
        assert_eq!(params.created, None);

        let reparsed: SignatureParams = params.to_header_value().parse()?;
        assert_eq!(reparsed, params);
        Ok(())
    }

    #[test]
    fn authorization_scheme_prefix() -> Result<()> {
        let header = r#"Signature keyId="k",headers="(request-target)",signature="AAEC""#;
        let params: SignatureParams = header.parse()?;
        assert_eq!(params.key_id, "k");
        assert_eq!(params.algorithm, None);
        Ok(())
    }

    #[test]
    fn incomplete_params_are_rejected() {
        for header in [
            r#"algorithm="rsa-sha256",headers="date",signature="AAEC""#,
            r#"keyId="k",signature="AAEC""#,
            r#"keyId="k",headers="date""#,
            r#"keyId="k",headers="date",signature="not base64!""#,
            r#"keyId="k" headers="date""#,
            r#"keyId="k,headers="date",signature="AAEC""#,
        ] {
            assert!(header.parse::<SignatureParams>().is_err(), "{header}");
        }
    }
}
