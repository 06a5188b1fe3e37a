use std::fmt::Display;

use base64ct::{Base64, Encoding};
use sha2::{Digest, Sha256, Sha512};
use tracing::debug;

use crate::Rejection;

/// A `Digest` header value, e.g. `SHA-256=X48E9qOokqqrvdts8nOJRJN3OWDUoyWxBf7kbu9DBPE=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestValue {
    pub algorithm: &'static str,
    pub value: String,
}

impl Display for DigestValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.algorithm, self.value)
    }
}

/// SHA-256 over the exact body bytes.
pub fn generate_digest(body: &[u8]) -> DigestValue {
    DigestValue {
        algorithm: "SHA-256",
        value: base64_sha256_string(body),
    }
}

/// Compare a bare base64 SHA-256 digest against the body.
pub fn verify_digest(body: &[u8], received: &str) -> bool {
    base64_sha256_string(body) == received
}

/// Check a whole `Digest` header against the body.
///
/// The header may list several `alg=value` pairs; the first one with a
/// supported algorithm decides.
pub fn check_digest_header(body: &[u8], header: &str) -> Result<(), Rejection> {
    for entry in header.split(',') {
        let Some((alg, value)) = entry.trim().split_once('=') else {
            continue;
        };
        let computed = if alg.eq_ignore_ascii_case("sha-256") {
            base64_sha256_string(body)
        } else if alg.eq_ignore_ascii_case("sha-512") {
            base64_sha512_string(body)
        } else {
            debug!(target: "httpsig", alg, "skipping unsupported digest algorithm");
            continue;
        };
        if computed == value.trim() {
            return Ok(());
        }
        return Err(Rejection::DigestMismatch);
    }
    Err(Rejection::DigestMismatch)
}

fn base64_sha256_string(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Base64::encode_string(hasher.finalize().as_slice())
}

fn base64_sha512_string(bytes: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(bytes);
    Base64::encode_string(hasher.finalize().as_slice())
}
