use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use httpsig::{Ed25519Signer, RsaSigner, SignatureSigner, VerifyOptions};
use jiff::SignedDuration;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::debug;

#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub signing: SigningConfig,
    pub verification: VerificationConfig,
}

#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// `keyId` advertised in outgoing signatures.
    pub key_id: String,
    /// PKCS#8 PEM, inline.
    pub private_key: Option<SecretString>,
    pub private_key_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Zero disables the check.
    pub max_clock_skew_secs: u64,
    pub required_headers: Vec<String>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_clock_skew_secs: 300,
            required_headers: vec!["host".to_string(), "date".to_string()],
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read config {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("unable to parse config {}", path.display()))?;
        debug!(path = %path.display(), key_id = %config.signing.key_id, "config loaded");
        Ok(config)
    }

    /// The configured private key, as RSA or else Ed25519.
    pub fn signer(&self) -> Result<Box<dyn SignatureSigner + Send + Sync>> {
        let pem = match (&self.signing.private_key, &self.signing.private_key_file) {
            (Some(pem), _) => pem.clone(),
            (None, Some(file)) => fs::read_to_string(file)
                .with_context(|| format!("unable to read private key {}", file.display()))?
                .into(),
            (None, None) => bail!("no signing key configured"),
        };
        if self.signing.key_id.is_empty() {
            bail!("signing.key_id is not set");
        }
        if let Ok(signer) = RsaSigner::from_pem(&pem) {
            return Ok(Box::new(signer));
        }
        let signer = Ed25519Signer::from_pem(&pem)
            .context("private key is neither an RSA nor an Ed25519 PKCS#8 key")?;
        Ok(Box::new(signer))
    }

    pub fn verify_options(&self) -> Result<VerifyOptions> {
        let skew = self.verification.max_clock_skew_secs;
        let max_clock_skew = match skew {
            0 => None,
            secs => {
                let secs = i64::try_from(secs)
                    .with_context(|| format!("verification.max_clock_skew_secs {secs} is too large"))?;
                Some(SignedDuration::from_secs(secs))
            }
        };
        Ok(VerifyOptions {
            required_headers: self.verification.required_headers.clone(),
            max_clock_skew,
        })
    }
}
