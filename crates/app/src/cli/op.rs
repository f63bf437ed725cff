use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use common::crypto::{AccessToken, CryptoError, KeyMaterialContext, KeyMaterialLoader};

use crate::state::{resolve_keypair_path, AppState, KEYPAIR_PATH_ENV};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("invalid access token: {0}")]
    Token(#[from] CryptoError),
}

#[derive(Debug, Clone)]
pub struct OpContext {
    /// Optional custom config path (defaults to ~/.envie)
    pub config_path: Option<PathBuf>,
    /// Key material for this invocation, loaded on first use
    pub keys: Arc<KeyMaterialLoader>,
}

impl OpContext {
    /// Build the context for one invocation
    ///
    /// An access token wins over any key file. Otherwise the key file comes
    /// from ENVIE_KEYPAIR_PATH or the loaded state, and is read lazily so
    /// commands that never touch a key work before `envie init`.
    pub fn new(
        config_path: Option<PathBuf>,
        state: Option<&AppState>,
        token: Option<&str>,
    ) -> Result<Self, ContextError> {
        let keys = match token {
            Some(encoded) => {
                let token = AccessToken::decode(encoded)?;
                tracing::debug!(public_key = %token.public_key(), "using access token key");
                KeyMaterialLoader::preloaded(token.key_material())
            }
            None => {
                let path = resolve_keypair_path(std::env::var_os(KEYPAIR_PATH_ENV), state);
                KeyMaterialLoader::new(path)
            }
        };

        Ok(Self::with_loader(config_path, keys))
    }

    pub fn with_loader(config_path: Option<PathBuf>, keys: KeyMaterialLoader) -> Self {
        Self {
            config_path,
            keys: Arc::new(keys),
        }
    }

    /// The local principal's key material
    pub fn key_material(&self) -> Result<Arc<KeyMaterialContext>, CryptoError> {
        self.keys.get()
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;
    use tempfile::TempDir;

    /// A freshly initialized envie directory and a context bound to it
    pub struct TestEnv {
        pub dir: TempDir,
        pub state: AppState,
        pub ctx: OpContext,
    }

    impl TestEnv {
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let state = AppState::init(Some(dir.path().join("envie")), None).unwrap();
            let keys = KeyMaterialLoader::new(Some(state.keypair_path()));
            let ctx = OpContext::with_loader(Some(state.envie_dir.clone()), keys);
            Self { dir, state, ctx }
        }

        pub fn key_material(&self) -> Arc<KeyMaterialContext> {
            self.ctx.key_material().unwrap()
        }

        /// Write `contents` to a file in the temp dir and return its path
        pub fn write(&self, name: &str, contents: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, contents).unwrap();
            path
        }
    }
}
