//! Content encryption using AES-256-GCM
//!
//! A [`Secret`] is a 256-bit symmetric key. It plays two roles in the envelope
//! scheme: as the data-encryption key (DEK) that encrypts a secret file once,
//! and as the per-recipient key-encryption key (KEK) that wraps the DEK.
//! Both uses share the same framing: `iv (12 bytes) || ciphertext || tag (16 bytes)`.

use std::fmt;
use std::ops::Deref;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::content::EncryptedContent;
use super::error::CryptoError;

/// Size of the AES-GCM IV in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of the AES-GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;
/// Size of an AES-256 key in bytes
pub const SECRET_SIZE: usize = 32;
/// Smallest well-framed ciphertext: an IV and a tag around an empty payload
pub const MIN_CIPHERTEXT_SIZE: usize = NONCE_SIZE + TAG_SIZE;

/// A 256-bit AES-GCM key
///
/// The bytes are wiped when the value is dropped and never shown by `Debug`.
/// Equality runs in constant time.
///
/// # Examples
///
/// ```ignore
/// let secret = Secret::generate();
/// let ciphertext = secret.encrypt(b"sensitive data")?;
/// let recovered = secret.decrypt(&ciphertext)?;
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_SIZE]);

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl Deref for Secret {
    type Target = [u8; SECRET_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Self {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff).expect("failed to generate random bytes");
        Self(buff)
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns a validation error if the slice is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        if data.len() != SECRET_SIZE {
            return Err(CryptoError::validation(format!(
                "invalid secret size, expected {}, got {}",
                SECRET_SIZE,
                data.len()
            )));
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Get a reference to the secret key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Export the raw key as standard base64
    ///
    /// Whoever holds the output can decrypt everything this key protects.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Restore a secret from its base64 export
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut bytes = STANDARD.decode(encoded.trim())?;
        let secret = Self::from_slice(&bytes).map_err(|_| {
            CryptoError::format(format!(
                "exported secret must decode to {} bytes, got {}",
                SECRET_SIZE,
                bytes.len()
            ))
        });
        bytes.zeroize();
        secret
    }

    /// Encrypt data using AES-256-GCM
    ///
    /// The output format is `iv (12 bytes) || ciphertext || auth_tag (16 bytes)`.
    /// A fresh random IV is drawn for every call.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.bytes()));

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| CryptoError::Configuration(format!("failed to generate iv: {}", e)))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        // aes-gcm appends the tag to the ciphertext
        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|_| CryptoError::validation("plaintext too large to encrypt"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);

        tracing::trace!(plaintext_len = data.len(), framed_len = out.len(), "sealed");
        Ok(out)
    }

    /// Decrypt data produced by [`Secret::encrypt`]
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Integrity`] if the buffer is too short to hold an
    /// IV and tag, or if the tag does not verify. No plaintext is returned on failure.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < MIN_CIPHERTEXT_SIZE {
            return Err(CryptoError::Integrity);
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.bytes()));
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| CryptoError::Integrity)
    }

    /// Encrypt a `KEY=VALUE` document, recording its variable names alongside
    pub fn encrypt_content(&self, plaintext: &str) -> Result<EncryptedContent, CryptoError> {
        let ciphertext = self.encrypt(plaintext.as_bytes())?;
        Ok(EncryptedContent::new(ciphertext, plaintext))
    }

    /// Decrypt an [`EncryptedContent`] back into its text
    pub fn decrypt_content(&self, content: &EncryptedContent) -> Result<String, CryptoError> {
        let plaintext = self.decrypt(content.ciphertext())?;
        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::format("decrypted content is not valid UTF-8"))
    }
}
