use thiserror::Error;

/// Why an inbound request was not authenticated.
///
/// Every variant is terminal for the request. Details are meant for logs and
/// never carry key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("request body does not match its Digest header")]
    DigestMismatch,
    #[error("missing or malformed Signature header: {0}")]
    SignatureHeaderMissing(String),
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("signature verification failed: {0}")]
    SignatureVerificationFailed(String),
    #[error("unable to resolve public key {key_id}")]
    KeyResolutionFailed { key_id: String },
}
