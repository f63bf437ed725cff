//! Multi-recipient envelope encryption
//!
//! A document is encrypted once under a fresh data-encryption key (DEK); the
//! DEK is then wrapped separately for every recipient. Granting or revoking
//! access touches only [`WrappedKey`] records, never the encrypted content.

use std::ops::Deref;

use super::content::EncryptedContent;
use super::error::CryptoError;
use super::keys::{PublicKey, SecretKey};
use super::secret::Secret;
use super::wrapped_key::WrappedKey;

/// A DEK wrapped for one particular recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientKey {
    pub recipient: PublicKey,
    pub wrapped: WrappedKey,
}

/// Everything produced when a document is first encrypted
#[derive(Debug, Clone)]
pub struct SealedEnvelope {
    pub encrypted_content: EncryptedContent,
    /// One entry per requested recipient, in request order
    pub wrapped_keys: Vec<RecipientKey>,
    /// Base64 of the raw DEK, for offline backup. Treat as a bearer secret.
    pub dek_export: String,
}

/// The symmetric key that encrypts one version of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEncryptionKey(Secret);

impl Deref for DataEncryptionKey {
    type Target = Secret;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Secret> for DataEncryptionKey {
    fn from(secret: Secret) -> Self {
        Self(secret)
    }
}

impl DataEncryptionKey {
    pub fn generate() -> Self {
        Self(Secret::generate())
    }

    /// Encrypt `plaintext` once and wrap the new DEK for each recipient
    ///
    /// Recipients are processed in order; duplicates each receive their own
    /// independent wrap.
    pub fn new_with_pke(
        recipients: &[PublicKey],
        plaintext: &str,
    ) -> Result<SealedEnvelope, CryptoError> {
        let dek = Self::generate();
        let encrypted_content = dek.encrypt_content(plaintext)?;
        let wrapped_keys = dek.wrap_all(recipients)?;

        tracing::debug!(
            recipients = wrapped_keys.len(),
            keys = encrypted_content.key_names().len(),
            "sealed envelope"
        );

        Ok(SealedEnvelope {
            encrypted_content,
            wrapped_keys,
            dek_export: dek.export(),
        })
    }

    /// Wrap this DEK for one more recipient without touching the content
    pub fn wrap(&self, recipient: &PublicKey) -> Result<RecipientKey, CryptoError> {
        Ok(RecipientKey {
            recipient: *recipient,
            wrapped: WrappedKey::wrap(&self.0, recipient)?,
        })
    }

    /// Wrap this DEK for every recipient, preserving order
    pub fn wrap_all(&self, recipients: &[PublicKey]) -> Result<Vec<RecipientKey>, CryptoError> {
        recipients.iter().map(|r| self.wrap(r)).collect()
    }

    /// Recover a DEK from a record addressed to `recipient`
    pub fn unwrap(wrapped: &WrappedKey, recipient: &SecretKey) -> Result<Self, CryptoError> {
        wrapped.unwrap_key(recipient).map(Self)
    }

    /// Unwrap then decrypt in one step
    ///
    /// Integrity failures from either stage surface unchanged.
    pub fn decrypt_content(
        wrapped: &WrappedKey,
        recipient: &SecretKey,
        content: &EncryptedContent,
    ) -> Result<String, CryptoError> {
        let dek = Self::unwrap(wrapped, recipient)?;
        dek.0.decrypt_content(content)
    }

    /// Base64 of the raw key
    pub fn export(&self) -> String {
        self.0.to_base64()
    }

    /// Restore a DEK from its [`DataEncryptionKey::export`] form
    pub fn from_export(encoded: &str) -> Result<Self, CryptoError> {
        Secret::from_base64(encoded).map(Self)
    }
}
