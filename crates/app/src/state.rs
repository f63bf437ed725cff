use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use common::prelude::SecretKey;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "envie";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEY_FILE_NAME: &str = "key.pem";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Overrides the keypair path from the config file
pub const KEYPAIR_PATH_ENV: &str = "ENVIE_KEYPAIR_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the private key file, relative paths resolve against the envie directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypair_path: Option<PathBuf>,
    /// Default tracing level, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            keypair_path: None,
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the envie directory (~/.envie)
    pub envie_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the envie directory path (custom or default ~/.envie)
    pub fn envie_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new envie directory
    ///
    /// A fresh keypair is written unless the configured key file already
    /// exists, in which case it is validated and adopted.
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let envie_dir = Self::envie_dir(custom_path)?;
        let config_path = envie_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Err(StateError::AlreadyInitialized(envie_dir));
        }

        fs::create_dir_all(&envie_dir)?;

        let config = config.unwrap_or_default();
        let state = Self {
            envie_dir,
            config_path,
            config,
        };

        let key_path = state.keypair_path();
        if key_path.exists() {
            let contents = fs::read(&key_path)?;
            SecretKey::from_key_file(&contents)
                .map_err(|e| StateError::InvalidKey(e.to_string()))?;
            tracing::debug!(path = %key_path.display(), "adopting existing key file");
        } else {
            if let Some(parent) = key_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let pem = SecretKey::generate()
                .to_pem()
                .map_err(|e| StateError::InvalidKey(e.to_string()))?;
            write_private(&key_path, pem.as_bytes())?;
        }

        let config_toml = toml::to_string_pretty(&state.config)?;
        fs::write(&state.config_path, config_toml)?;

        tracing::info!(dir = %state.envie_dir.display(), "initialized envie directory");
        Ok(state)
    }

    /// Load existing state from the envie directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let envie_dir = Self::envie_dir(custom_path)?;
        let config_path = envie_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            envie_dir,
            config_path,
            config,
        })
    }

    /// Like [`AppState::load`], but an uninitialized directory is not an error
    pub fn load_if_present(custom_path: Option<PathBuf>) -> Result<Option<Self>, StateError> {
        match Self::load(custom_path) {
            Ok(state) => Ok(Some(state)),
            Err(StateError::NotInitialized) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Where this state's private key lives, ignoring the environment
    pub fn keypair_path(&self) -> PathBuf {
        match &self.config.keypair_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.envie_dir.join(path),
            None => self.envie_dir.join(KEY_FILE_NAME),
        }
    }
}

/// Pick the key file: the environment override first, then the config
pub fn resolve_keypair_path(
    env_override: Option<OsString>,
    state: Option<&AppState>,
) -> Option<PathBuf> {
    env_override
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| state.map(AppState::keypair_path))
}

/// Create `path` readable by its owner only; an existing file is an error
#[cfg(unix)]
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    fs::write(path, contents)
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("envie directory not initialized. Run 'envie init' first")]
    NotInitialized,

    #[error("envie directory already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
