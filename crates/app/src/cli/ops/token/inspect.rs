use clap::Args;
use common::crypto::{AccessToken, CryptoError};

#[derive(Args, Debug, Clone)]
pub struct Inspect {
    /// The encoded access token
    pub token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("invalid access token: {0}")]
    Crypto(#[from] CryptoError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Inspect {
    type Error = InspectError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let token = AccessToken::decode(&self.token)?;
        Ok(format!(
            "version:    {}\n\
             algorithm:  {}\n\
             bearer:     {}\n\
             public key: {}",
            token.version(),
            token.algorithm(),
            token.bearer(),
            token.public_key()
        ))
    }
}
