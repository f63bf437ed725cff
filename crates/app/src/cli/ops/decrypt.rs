use std::fs;
use std::path::PathBuf;

use clap::Args;
use common::crypto::{CryptoError, DataEncryptionKey};

use super::envelope_file::{read_envelope, EnvelopeFileError};

#[derive(Args, Debug, Clone)]
pub struct Decrypt {
    /// Decrypt with a DEK backup written by `encrypt --export-dek`
    /// instead of the local key
    #[arg(long)]
    pub dek: Option<PathBuf>,

    /// The envelope JSON file
    pub envelope: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[error("not a recipient: the envelope holds no key for {0}")]
    NotRecipient(String),
    #[error("failed to read DEK backup: {0}")]
    ReadDek(std::io::Error),
    #[error("decryption failed: {0}")]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeFileError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Decrypt {
    type Error = DecryptError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let record = read_envelope(&self.envelope)?;
        let content = record.encrypted_content()?;

        if let Some(path) = &self.dek {
            let encoded = fs::read_to_string(path).map_err(DecryptError::ReadDek)?;
            let dek = DataEncryptionKey::from_export(encoded.trim())?;
            return Ok(dek.decrypt_content(&content)?);
        }

        let keys = ctx.key_material()?;
        let wrapped = record
            .find(keys.public_key())?
            .ok_or_else(|| DecryptError::NotRecipient(keys.public_key().to_base64()))?;

        let plaintext =
            DataEncryptionKey::decrypt_content(&wrapped, keys.private_key(), &content)?;
        tracing::debug!(keys = content.key_names().len(), "decrypted envelope");
        Ok(plaintext)
    }
}
