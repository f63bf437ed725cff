use std::path::PathBuf;

use clap::Args;
use common::crypto::CryptoError;

use super::envelope_file::{parse_recipients, read_envelope, render_envelope, EnvelopeFileError};

#[derive(Args, Debug, Clone)]
pub struct Revoke {
    /// Public key whose access is removed (repeatable)
    #[arg(long = "recipient", short = 'r', required = true)]
    pub recipients: Vec<String>,

    /// The envelope JSON file
    pub envelope: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum RevokeError {
    #[error("{0} is not a recipient of this envelope")]
    NotRecipient(String),
    #[error("revoke failed: {0}")]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeFileError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Revoke {
    type Error = RevokeError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let recipients = parse_recipients(&self.recipients)?;
        let mut record = read_envelope(&self.envelope)?;

        for recipient in &recipients {
            if record.remove(recipient) == 0 {
                return Err(RevokeError::NotRecipient(recipient.to_base64()));
            }
        }
        if record.recipients.is_empty() {
            tracing::warn!("envelope has no recipients left");
        }

        Ok(render_envelope(&record)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cli::op::test_utils::TestEnv;
    use crate::cli::op::Op;
    use crate::cli::ops::{Decrypt, Encrypt};
    use crate::cli::ops::decrypt::DecryptError;
    use common::wire::EnvelopeRecord;

    #[tokio::test]
    async fn test_revoked_recipient_loses_access() {
        let owner = TestEnv::new();
        let leaver = TestEnv::new();
        let leaver_key = leaver.key_material().public_key().to_base64();

        let file = owner.write(".env", "A=1\n");
        let sealed = Encrypt {
            recipients: vec![leaver_key.clone()],
            include_self: true,
            export_dek: None,
            file,
        }
        .execute(&owner.ctx)
        .await
        .unwrap();
        let envelope = owner.write("envelope.json", &sealed);

        let output = Revoke {
            recipients: vec![leaver_key],
            envelope,
        }
        .execute(&owner.ctx)
        .await
        .unwrap();
        let record: EnvelopeRecord = serde_json::from_str(&output).unwrap();
        assert_eq!(record.recipients.len(), 1);

        let revoked = leaver.write("revoked.json", &output);
        let decrypt = Decrypt {
            dek: None,
            envelope: revoked.clone(),
        };
        assert!(matches!(
            decrypt.execute(&leaver.ctx).await,
            Err(DecryptError::NotRecipient(_))
        ));
        let decrypt = Decrypt {
            dek: None,
            envelope: revoked,
        };
        assert_eq!(decrypt.execute(&owner.ctx).await.unwrap(), "A=1\n");
    }

    #[tokio::test]
    async fn test_revoke_unknown_recipient() {
        let owner = TestEnv::new();
        let stranger = TestEnv::new();
        let file = owner.write(".env", "A=1\n");
        let sealed = Encrypt {
            recipients: vec![],
            include_self: true,
            export_dek: None,
            file,
        }
        .execute(&owner.ctx)
        .await
        .unwrap();
        let envelope = owner.write("envelope.json", &sealed);

        let op = Revoke {
            recipients: vec![stranger.key_material().public_key().to_base64()],
            envelope,
        };
        assert!(matches!(
            op.execute(&owner.ctx).await,
            Err(RevokeError::NotRecipient(_))
        ));
    }
}
