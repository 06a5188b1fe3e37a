//! Digest and HTTP signatures as used between ActivityPub servers.
//!
//! Implements the Cavage draft (`draft-cavage-http-signatures-12`) flavour that
//! the fediverse settled on, including the `hs2019` algorithm name. Key lookup
//! is left to the caller through [`KeyResolver`], and the cryptography sits
//! behind [`SignatureSigner`] / [`SignatureVerifier`] so the protocol logic can
//! be exercised without real keys.

mod crypto;
mod digest;
mod error;
mod params;
mod sign;
mod signing_string;
mod verify;

pub use self::crypto::{
    Algorithm, AwsLcVerifier, Ed25519Signer, GeneratedKey, KeyKind, RsaSigner, SignatureSigner,
    SignatureVerifier, VerifyError, generate_key_pair,
};
pub use self::digest::{DigestValue, check_digest_header, generate_digest, verify_digest};
pub use self::error::Rejection;
pub use self::params::SignatureParams;
pub use self::sign::{HTTP_DATE_FMT, get_headers, parse_http_date, post_headers, sign_request};
pub use self::signing_string::{REQUEST_TARGET, signing_string};
pub use self::verify::{Authenticated, KeyResolver, Stage, VerifyOptions, verify_request};
