use std::fs;
use std::path::{Path, PathBuf};

use common::crypto::{CryptoError, PublicKey};
use common::wire::EnvelopeRecord;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeFileError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} is not an envelope: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to render envelope: {0}")]
    Render(#[from] serde_json::Error),
}

pub fn read_envelope(path: &Path) -> Result<EnvelopeRecord, EnvelopeFileError> {
    let json = fs::read_to_string(path).map_err(|source| EnvelopeFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| EnvelopeFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn render_envelope(record: &EnvelopeRecord) -> Result<String, EnvelopeFileError> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// Parse `--recipient` values, each base64 or an `ssh-ed25519` line
pub fn parse_recipients(values: &[String]) -> Result<Vec<PublicKey>, CryptoError> {
    values.iter().map(|value| PublicKey::parse(value)).collect()
}
