use clap::Args;
use common::crypto::CryptoError;
use common::wire::PublicKeyRegistration;

#[derive(Args, Debug, Clone)]
pub struct Pubkey {
    /// Print an `ssh-ed25519` line instead of the registration JSON
    #[arg(long)]
    pub openssh: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PubkeyError {
    #[error("key material error: {0}")]
    Key(#[from] CryptoError),
    #[error("failed to render public key: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Pubkey {
    type Error = PubkeyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys = ctx.key_material()?;
        let public_key = keys.public_key();

        if self.openssh {
            return Ok(public_key.to_openssh_line());
        }

        let registration = PublicKeyRegistration::from(public_key);
        Ok(serde_json::to_string_pretty(&registration)?)
    }
}
