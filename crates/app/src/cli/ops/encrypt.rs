use std::fs;
use std::path::PathBuf;

use clap::Args;
use common::crypto::{CryptoError, DataEncryptionKey};
use common::wire::EnvelopeRecord;

use crate::state::write_private;

use super::envelope_file::{parse_recipients, render_envelope, EnvelopeFileError};

#[derive(Args, Debug, Clone)]
pub struct Encrypt {
    /// Recipient public key, base64 or an `ssh-ed25519` line (repeatable)
    #[arg(long = "recipient", short = 'r')]
    pub recipients: Vec<String>,

    /// Add the local key to the recipients
    #[arg(long)]
    pub include_self: bool,

    /// Write the base64 data-encryption key to this new, owner-only file as a backup
    #[arg(long)]
    pub export_dek: Option<PathBuf>,

    /// The KEY=VALUE file to encrypt
    pub file: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum EncryptError {
    #[error("no recipients: pass --recipient, --include-self or --export-dek")]
    NoRecipients,
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write DEK backup: {0}")]
    ExportDek(std::io::Error),
    #[error("encryption failed: {0}")]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeFileError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Encrypt {
    type Error = EncryptError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut recipients = parse_recipients(&self.recipients)?;
        if self.include_self {
            let keys = ctx.key_material()?;
            if !recipients.contains(keys.public_key()) {
                recipients.push(*keys.public_key());
            }
        }
        if recipients.is_empty() && self.export_dek.is_none() {
            return Err(EncryptError::NoRecipients);
        }

        let plaintext = fs::read_to_string(&self.file).map_err(|source| EncryptError::Read {
            path: self.file.clone(),
            source,
        })?;

        let sealed = DataEncryptionKey::new_with_pke(&recipients, &plaintext)?;
        tracing::info!(
            recipients = sealed.wrapped_keys.len(),
            keys = sealed.encrypted_content.key_names().len(),
            "sealed envelope"
        );

        if let Some(path) = &self.export_dek {
            write_private(path, sealed.dek_export.as_bytes()).map_err(EncryptError::ExportDek)?;
        }

        Ok(render_envelope(&EnvelopeRecord::from(&sealed))?)
    }
}
