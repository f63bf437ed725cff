use std::path::PathBuf;

use clap::Args;
use common::crypto::{CryptoError, KeyMaterialContext};

use crate::state::{AppConfig, AppState, StateError, DEFAULT_LOG_LEVEL};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Use an existing ed25519 key file instead of generating one
    #[arg(long)]
    pub keypair_path: Option<PathBuf>,

    /// Default log level written to config.toml
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
    #[error("init failed: {0}")]
    Key(#[from] CryptoError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            keypair_path: self.keypair_path.clone(),
            log_level: self.log_level.clone(),
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        let key_path = state.keypair_path();
        let keys = KeyMaterialContext::from_file(&key_path)?;

        Ok(format!(
            "Initialized envie directory at: {}\n\
             - Key: {}\n\
             - Config: {}\n\
             - Public key: {}",
            state.envie_dir.display(),
            key_path.display(),
            state.config_path.display(),
            keys.public_key()
        ))
    }
}
