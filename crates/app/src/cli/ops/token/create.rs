use std::fs;
use std::path::PathBuf;

use clap::Args;
use common::crypto::access_token::generate_token_value;
use common::crypto::{AccessToken, CryptoError, SecretKey};

#[derive(Args, Debug, Clone)]
pub struct Create {
    /// Bearer value, exactly 32 ASCII characters (random when omitted)
    #[arg(long)]
    pub value: Option<String>,

    /// Embed this key file instead of a freshly generated key
    #[arg(long)]
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("failed to read key file: {0}")]
    ReadKey(#[from] std::io::Error),
    #[error("token creation failed: {0}")]
    Crypto(#[from] CryptoError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Create {
    type Error = CreateError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let value = self.value.clone().unwrap_or_else(generate_token_value);
        let signing_key = match &self.key_file {
            Some(path) => Some(SecretKey::from_key_file(&fs::read(path)?)?),
            None => None,
        };
        let seed = signing_key.as_ref().map(SecretKey::to_bytes);

        let token = AccessToken::new(&value, seed.as_ref().map(|s| s.as_slice()))?;
        tracing::info!(public_key = %token.public_key(), "minted access token");

        Ok(format!(
            "Access token: {}\nPublic key:   {}",
            token.encode(),
            token.public_key()
        ))
    }
}
