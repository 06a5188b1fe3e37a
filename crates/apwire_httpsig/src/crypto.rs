use std::fmt::{Debug, Display};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use aws_lc_rs::encoding::AsDer;
use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::rsa::{KeyPair as RsaKeyPair, KeySize, PrivateDecryptingKey};
use aws_lc_rs::signature::{
    ECDSA_P256_SHA256_ASN1, ECDSA_P256_SHA256_FIXED, ECDSA_P256K1_SHA256_ASN1,
    ECDSA_P256K1_SHA256_FIXED, ED25519, Ed25519KeyPair, KeyPair as _, RSA_PKCS1_2048_8192_SHA256,
    RSA_PKCS1_SHA256, RSA_PSS_2048_8192_SHA256, UnparsedPublicKey, VerificationAlgorithm,
};
use const_oid::db::rfc5912::{ID_EC_PUBLIC_KEY, RSA_ENCRYPTION};
use const_oid::db::rfc8410::ID_ED_25519;
use pem_rfc7468::LineEnding;
use secrecy::{ExposeSecret, SecretString};
use spki::SubjectPublicKeyInfoRef;
use thiserror::Error;

/// Signature algorithms accepted in the `algorithm` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    RsaSha256,
    /// Algorithm derived from the key type.
    Hs2019,
    Ed25519,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RsaSha256 => "rsa-sha256",
            Algorithm::Hs2019 => "hs2019",
            Algorithm::Ed25519 => "ed25519",
        }
    }
}

impl FromStr for Algorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rsa-sha256" => Ok(Algorithm::RsaSha256),
            "hs2019" => Ok(Algorithm::Hs2019),
            "ed25519" => Ok(Algorithm::Ed25519),
            _ => bail!("{s}"),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("malformed public key: {0}")]
    MalformedKey(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("signature does not match")]
    Mismatch,
}

/// Verifies a signature with a PEM encoded public key.
pub trait SignatureVerifier {
    fn verify(
        &self,
        algorithm: Algorithm,
        public_key_pem: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), VerifyError>;
}

/// Produces signatures with a private key it owns.
pub trait SignatureSigner {
    fn algorithm(&self) -> Algorithm;
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// [`SignatureVerifier`] backed by aws-lc-rs, dispatching on the SPKI algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsLcVerifier;

impl SignatureVerifier for AwsLcVerifier {
    fn verify(
        &self,
        algorithm: Algorithm,
        public_key_pem: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), VerifyError> {
        let (label, der) = pem_rfc7468::decode_vec(public_key_pem.trim().as_bytes())
            .map_err(|e| VerifyError::MalformedKey(e.to_string()))?;
        if label != "PUBLIC KEY" {
            return Err(VerifyError::Unsupported(format!(
                "{label} keys are not supported"
            )));
        }
        let spki = SubjectPublicKeyInfoRef::try_from(der.as_ref())
            .map_err(|e| VerifyError::MalformedKey(e.to_string()))?;
        let spk = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| VerifyError::MalformedKey("unaligned key bit string".to_string()))?;

        let algorithms: &[&'static dyn VerificationAlgorithm] = match (spki.algorithm.oid, algorithm)
        {
            (RSA_ENCRYPTION, Algorithm::RsaSha256) => {
                &[&RSA_PKCS1_2048_8192_SHA256 as &dyn VerificationAlgorithm]
            }
            (RSA_ENCRYPTION, Algorithm::Hs2019) => &[
                &RSA_PSS_2048_8192_SHA256 as &dyn VerificationAlgorithm,
                &RSA_PKCS1_2048_8192_SHA256 as &dyn VerificationAlgorithm,
            ],
            (ID_ED_25519, Algorithm::Hs2019 | Algorithm::Ed25519) => {
                &[&ED25519 as &dyn VerificationAlgorithm]
            }
            (ID_EC_PUBLIC_KEY, Algorithm::Hs2019) => &[
                &ECDSA_P256_SHA256_FIXED as &dyn VerificationAlgorithm,
                &ECDSA_P256K1_SHA256_FIXED as &dyn VerificationAlgorithm,
                &ECDSA_P256_SHA256_ASN1 as &dyn VerificationAlgorithm,
                &ECDSA_P256K1_SHA256_ASN1 as &dyn VerificationAlgorithm,
            ],
            (oid, algorithm) => {
                return Err(VerifyError::Unsupported(format!(
                    "{algorithm} cannot be used with a key of type {oid}"
                )));
            }
        };
        if algorithms.iter().any(|&alg| {
            UnparsedPublicKey::new(alg, spk)
                .verify(message, signature)
                .is_ok()
        }) {
            Ok(())
        } else {
            Err(VerifyError::Mismatch)
        }
    }
}

/// RSASSA-PKCS1-v1_5 with SHA-256, advertised as `rsa-sha256`.
pub struct RsaSigner {
    key_pair: RsaKeyPair,
}

impl RsaSigner {
    /// Load a PKCS#8 `PRIVATE KEY` PEM.
    pub fn from_pem(pem: &SecretString) -> Result<RsaSigner> {
        let der = private_key_der(pem)?;
        let key_pair = RsaKeyPair::from_pkcs8(&der)
            .map_err(|e| anyhow!("{e}"))
            .context("private key is not a PKCS#8 RSA key")?;
        Ok(RsaSigner { key_pair })
    }
}

impl SignatureSigner for RsaSigner {
    fn algorithm(&self) -> Algorithm {
        Algorithm::RsaSha256
    }
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let rng = SystemRandom::new();
        let mut signature = vec![0; self.key_pair.public_modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA256, &rng, message, &mut signature)
            .map_err(|e| anyhow!("{e}"))
            .context("unable to sign with RSA key")?;
        Ok(signature)
    }
}

impl Debug for RsaSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaSigner").finish_non_exhaustive()
    }
}

/// Ed25519, advertised as `hs2019`.
pub struct Ed25519Signer {
    key_pair: Ed25519KeyPair,
}

impl Ed25519Signer {
    /// Load a PKCS#8 `PRIVATE KEY` PEM.
    pub fn from_pem(pem: &SecretString) -> Result<Ed25519Signer> {
        let der = private_key_der(pem)?;
        let key_pair = Ed25519KeyPair::from_pkcs8(&der)
            .map_err(|e| anyhow!("{e}"))
            .context("private key is not a PKCS#8 Ed25519 key")?;
        Ok(Ed25519Signer { key_pair })
    }
}

impl SignatureSigner for Ed25519Signer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Hs2019
    }
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key_pair.sign(message).as_ref().to_vec())
    }
}

impl Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer").finish_non_exhaustive()
    }
}

fn private_key_der(pem: &SecretString) -> Result<Vec<u8>> {
    let (label, der) = pem_rfc7468::decode_vec(pem.expose_secret().trim().as_bytes())
        .map_err(|e| anyhow!("{e}"))
        .context("private key is not valid PEM")?;
    if label != "PRIVATE KEY" {
        bail!("expected a PRIVATE KEY PEM, found {label}");
    }
    Ok(der)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Rsa2048,
    Ed25519,
}

/// A freshly generated key pair in PEM form.
#[derive(Debug)]
pub struct GeneratedKey {
    pub kind: KeyKind,
    pub private_pem: SecretString,
    pub public_pem: String,
}

impl GeneratedKey {
    /// Wrap the private half into the matching signer.
    pub fn signer(&self) -> Result<Box<dyn SignatureSigner + Send + Sync>> {
        match self.kind {
            KeyKind::Ed25519 => Ok(Box::new(Ed25519Signer::from_pem(&self.private_pem)?)),
            KeyKind::Rsa2048 => Ok(Box::new(RsaSigner::from_pem(&self.private_pem)?)),
        }
    }
}

pub fn generate_key_pair(kind: KeyKind) -> Result<GeneratedKey> {
    let (private_der, public_der) = match kind {
        KeyKind::Rsa2048 => {
            let key = PrivateDecryptingKey::generate(KeySize::Rsa2048)
                .map_err(|e| anyhow!("{e}"))
                .context("unable to generate RSA key")?;
            let private_der = key.as_der().map_err(|e| anyhow!("{e}"))?;
            let public_der = key.public_key().as_der().map_err(|e| anyhow!("{e}"))?;
            (
                private_der.as_ref().to_vec(),
                public_der.as_ref().to_vec(),
            )
        }
        KeyKind::Ed25519 => {
            let key = Ed25519KeyPair::generate()
                .map_err(|e| anyhow!("{e}"))
                .context("unable to generate Ed25519 key")?;
            let private_der = key.to_pkcs8().map_err(|e| anyhow!("{e}"))?;
            let public_der = key.public_key().as_der().map_err(|e| anyhow!("{e}"))?;
            (
                private_der.as_ref().to_vec(),
                public_der.as_ref().to_vec(),
            )
        }
    };
    let private_pem = pem_rfc7468::encode_string("PRIVATE KEY", LineEnding::LF, &private_der)
        .map_err(|e| anyhow!("{e}"))?;
    let public_pem = pem_rfc7468::encode_string("PUBLIC KEY", LineEnding::LF, &public_der)
        .map_err(|e| anyhow!("{e}"))?;
    Ok(GeneratedKey {
        kind,
        private_pem: SecretString::from(private_pem),
        public_pem,
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{
        Algorithm, AwsLcVerifier, KeyKind, SignatureVerifier, VerifyError, generate_key_pair,
    };

    #[test]
    fn test_rsa_sign_verify() -> Result<()> {
        let key = generate_key_pair(KeyKind::Rsa2048)?;
        let signer = key.signer()?;
        assert_eq!(signer.algorithm(), Algorithm::RsaSha256);

        let signature = signer.sign(b"hello")?;
        let verifier = AwsLcVerifier;
        for algorithm in [Algorithm::RsaSha256, Algorithm::Hs2019] {
            assert_eq!(
                verifier.verify(algorithm, &key.public_pem, b"hello", &signature),
                Ok(())
            );
        }
        assert_eq!(
            verifier.verify(Algorithm::RsaSha256, &key.public_pem, b"hellO", &signature),
            Err(VerifyError::Mismatch)
        );
        assert!(matches!(
            verifier.verify(Algorithm::Ed25519, &key.public_pem, b"hello", &signature),
            Err(VerifyError::Unsupported(_))
        ));
        Ok(())
    }

    #[test]
    fn test_ed25519_sign_verify() -> Result<()> {
        let key = generate_key_pair(KeyKind::Ed25519)?;
        let signer = key.signer()?;
        assert_eq!(signer.algorithm(), Algorithm::Hs2019);

        let mut signature = signer.sign(b"hello")?;
        let verifier = AwsLcVerifier;
        assert_eq!(
            verifier.verify(Algorithm::Hs2019, &key.public_pem, b"hello", &signature),
            Ok(())
        );
        signature[0] ^= 0xff;
        assert_eq!(
            verifier.verify(Algorithm::Ed25519, &key.public_pem, b"hello", &signature),
            Err(VerifyError::Mismatch)
        );
        assert!(matches!(
            verifier.verify(Algorithm::RsaSha256, &key.public_pem, b"hello", &signature),
            Err(VerifyError::Unsupported(_))
        ));
        Ok(())
    }

    #[test]
    fn generated_key_remembers_its_kind() -> Result<()> {
        for (kind, algorithm) in [
            (KeyKind::Rsa2048, Algorithm::RsaSha256),
            (KeyKind::Ed25519, Algorithm::Hs2019),
        ] {
            let key = generate_key_pair(kind)?;
            assert_eq!(key.kind, kind);
            let signer = key.signer()?;
            assert_eq!(signer.algorithm(), algorithm);
            let signature = signer.sign(b"hello")?;
            assert_eq!(
                AwsLcVerifier.verify(algorithm, &key.public_pem, b"hello", &signature),
                Ok(())
            );
        }
        Ok(())
    }

    #[test]
    fn malformed_public_key() {
        let result = AwsLcVerifier.verify(Algorithm::RsaSha256, "not a pem", b"hello", b"sig");
        assert!(matches!(result, Err(VerifyError::MalformedKey(_))));
    }

    #[test]
    fn algorithm_names() {
        assert_eq!("RSA-SHA256".parse::<Algorithm>().ok(), Some(Algorithm::RsaSha256));
        assert_eq!("hs2019".parse::<Algorithm>().ok(), Some(Algorithm::Hs2019));
        assert!("hmac-sha256".parse::<Algorithm>().is_err());
    }
}
