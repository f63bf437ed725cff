/// Errors surfaced by the envelope-encryption core
///
/// Every operation in [`crate::crypto`] reports one of these. `Integrity`
/// carries no detail, so a wrong key and a flipped bit read the same.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Malformed caller input, rejected before any cryptographic work runs
    #[error("validation error: {0}")]
    Validation(String),
    /// Malformed serialized data (encodings, lengths, key containers)
    #[error("format error: {0}")]
    Format(String),
    /// AEAD authentication failed
    #[error("decryption failed: ciphertext could not be authenticated")]
    Integrity,
    /// Required local state is missing
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CryptoError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        CryptoError::Format(msg.into())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        CryptoError::Validation(msg.into())
    }
}

impl From<base64::DecodeError> for CryptoError {
    fn from(e: base64::DecodeError) -> Self {
        CryptoError::Format(format!("base64 decode error: {}", e))
    }
}
