use std::path::PathBuf;

use clap::Args;
use common::crypto::{CryptoError, DataEncryptionKey};

use super::envelope_file::{parse_recipients, read_envelope, render_envelope, EnvelopeFileError};

#[derive(Args, Debug, Clone)]
pub struct Grant {
    /// Public key to grant access to (repeatable)
    #[arg(long = "recipient", short = 'r', required = true)]
    pub recipients: Vec<String>,

    /// The envelope JSON file
    pub envelope: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    #[error("not a recipient: only an existing recipient can grant access")]
    NotRecipient,
    #[error("grant failed: {0}")]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeFileError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Grant {
    type Error = GrantError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let recipients = parse_recipients(&self.recipients)?;
        let mut record = read_envelope(&self.envelope)?;

        let keys = ctx.key_material()?;
        let own = record
            .find(keys.public_key())?
            .ok_or(GrantError::NotRecipient)?;
        let dek = DataEncryptionKey::unwrap(&own, keys.private_key())?;

        for recipient in &recipients {
            if record.find(recipient)?.is_some() {
                tracing::info!(%recipient, "already a recipient, skipping");
                continue;
            }
            record.push(&dek.wrap(recipient)?);
        }

        Ok(render_envelope(&record)?)
    }
}
