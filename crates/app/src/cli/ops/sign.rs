use clap::Args;
use common::crypto::CryptoError;

#[derive(Args, Debug, Clone)]
pub struct Sign {
    /// The message to sign, as UTF-8 text
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("signing failed: {0}")]
    Key(#[from] CryptoError),
    #[error("failed to render signature: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Sign {
    type Error = SignError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let signed = ctx.key_material()?.sign(&self.message);
        Ok(serde_json::to_string_pretty(&signed)?)
    }
}
