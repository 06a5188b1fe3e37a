mod dump;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use apwire::activity_pub::{ActorStore, Document, Inbox, prepare_delivery};
use apwire::config::Config;
use httpsig::{KeyKind, generate_key_pair};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::info;

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// ActivityPub document and signature tooling.
        cmd apwire {
            /// Config file (TOML).
            optional -c,--config config: PathBuf

            /// Validate a JSON document, printing every violation.
            cmd check {
                required file: PathBuf
            }
            /// Print a fresh PEM key pair.
            cmd keygen {
                /// Ed25519 instead of RSA-2048.
                optional --ed25519
            }
            /// Print signed POST headers for delivering a document.
            cmd sign {
                required body: PathBuf
                /// Target inbox URL.
                required --url url: String
            }
            /// Authenticate a raw HTTP request dump, then validate its body.
            cmd verify {
                required request: PathBuf
                /// Actor document holding the signer's public key.
                required --actor actor: PathBuf
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let flags = flags::Apwire::from_env_or_exit();
    let config = match &flags.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    match flags.subcommand {
        flags::ApwireCmd::Check(cmd) => check(&cmd.file),
        flags::ApwireCmd::Keygen(cmd) => keygen(cmd.ed25519),
        flags::ApwireCmd::Sign(cmd) => sign(&config, &cmd.body, &cmd.url),
        flags::ApwireCmd::Verify(cmd) => verify(&config, &cmd.request, &cmd.actor),
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let text = fs::read_to_string(path).with_context(|| format!("unable to read {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&text).with_context(|| format!("{} is not JSON", path.display()))?;
    match Document::try_from(value) {
        Ok(document) => Ok(document),
        Err(error) => {
            for violation in error.violations() {
                eprintln!("{}: {violation}", path.display());
            }
            bail!("{} is not a valid document", path.display())
        }
    }
}

fn check(file: &Path) -> Result<()> {
    let document = read_document(file)?;
    println!("{} {}", document.type_name(), document.id().unwrap_or("(no id)"));
    Ok(())
}

fn keygen(ed25519: bool) -> Result<()> {
    let kind = if ed25519 {
        KeyKind::Ed25519
    } else {
        KeyKind::Rsa2048
    };
    let key = generate_key_pair(kind)?;
    print!("{}", key.private_pem.expose_secret());
    print!("{}", key.public_pem);
    Ok(())
}

fn sign(config: &Config, body: &Path, url: &str) -> Result<()> {
    let signer = config.signer()?;
    let document = read_document(body)?;
    let delivery = prepare_delivery(&document, url, &config.signing.key_id, signer.as_ref())?;
    for (name, value) in &delivery.headers {
        println!("{name}: {}", value.to_str()?);
    }
    Ok(())
}

fn verify(config: &Config, request: &Path, actor: &Path) -> Result<()> {
    let actor = read_document(actor)?;
    let store = ActorStore::from_documents([&actor]);
    if store.is_empty() {
        bail!("actor document carries no inline public key");
    }
    let raw = fs::read(request).with_context(|| format!("unable to read {}", request.display()))?;
    let (parts, body) = dump::parse_request(&raw)?;
    let inbox = Inbox::new(store).with_options(config.verify_options()?);
    let delivered = inbox.receive(&parts, &body)?;
    info!(key_id = %delivered.authenticated.key_id, "signature verified");
    println!(
        "{} {} signed by {}",
        delivered.document.type_name(),
        delivered.document.id().unwrap_or("(no id)"),
        delivered.authenticated.key_id
    );
    if !delivered.signed_by_actor() {
        eprintln!("warning: the signing key does not belong to the activity's actor");
    }
    Ok(())
}
