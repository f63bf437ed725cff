//! The local principal's long-term key material
//!
//! A [`KeyMaterialContext`] is built once at startup and handed to whatever
//! needs to unwrap or sign. [`KeyMaterialLoader`] defers reading the key file
//! until first use and guarantees the file is parsed at most once, even when
//! several threads race for it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::Signature;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::error::CryptoError;
use super::keys::{KeyAlgorithm, PublicKey, SecretKey};
use super::secret::Secret;
use super::wrapped_key::WrappedKey;

/// A detached signature plus what a verifier needs to check it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMessage {
    /// Base64 of the 64-byte Ed25519 signature
    pub signature: String,
    pub algorithm: KeyAlgorithm,
    pub public_key_base64: String,
}

impl SignedMessage {
    /// Check the signature against `message` and the embedded public key
    pub fn verify(&self, message: &str) -> Result<(), CryptoError> {
        let public_key = PublicKey::from_base64(&self.public_key_base64)?;
        let bytes = STANDARD.decode(&self.signature)?;
        let bytes: [u8; 64] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::format("ed25519 signature must be 64 bytes"))?;
        public_key
            .verify(message.as_bytes(), &Signature::from_bytes(&bytes))
            .map_err(|_| CryptoError::Integrity)
    }
}

/// Immutable keypair of the local user (or access-token principal)
#[derive(Debug, Clone)]
pub struct KeyMaterialContext {
    private_key: SecretKey,
    public_key: PublicKey,
}

impl KeyMaterialContext {
    pub fn new(private_key: SecretKey) -> Self {
        let public_key = private_key.public();
        Self {
            private_key,
            public_key,
        }
    }

    /// Read and parse a key file
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read and a format error if it
    /// does not hold an Ed25519 private key.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CryptoError> {
        let path = path.as_ref();
        let contents = std::fs::read(path)?;
        let private_key = SecretKey::from_key_file(&contents)?;
        tracing::debug!(path = %path.display(), "loaded key material");
        Ok(Self::new(private_key))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn private_key(&self) -> &SecretKey {
        &self.private_key
    }

    /// Recover a DEK addressed to this principal
    pub fn unwrap_key(&self, wrapped: &WrappedKey) -> Result<Secret, CryptoError> {
        wrapped.unwrap_key(&self.private_key)
    }

    /// Sign the UTF-8 bytes of `message`
    pub fn sign(&self, message: &str) -> SignedMessage {
        let signature = self.private_key.sign(message.as_bytes());
        SignedMessage {
            signature: STANDARD.encode(signature.to_bytes()),
            algorithm: self.private_key.algorithm(),
            public_key_base64: self.public_key.to_base64(),
        }
    }
}

/// Lazily loads a [`KeyMaterialContext`] from a configured path, once
#[derive(Debug, Default)]
pub struct KeyMaterialLoader {
    path: Option<PathBuf>,
    loaded: Mutex<Option<Arc<KeyMaterialContext>>>,
}

impl KeyMaterialLoader {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            loaded: Mutex::new(None),
        }
    }

    /// A loader that already holds its context, for keys that never touch disk
    pub fn preloaded(context: KeyMaterialContext) -> Self {
        Self {
            path: None,
            loaded: Mutex::new(Some(Arc::new(context))),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Return the context, loading it on first call
    ///
    /// Once a load succeeds every later call returns the same instance. A
    /// failed load is not cached.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no path was configured, otherwise
    /// whatever [`KeyMaterialContext::from_file`] reports.
    pub fn get(&self) -> Result<Arc<KeyMaterialContext>, CryptoError> {
        let mut loaded = self.loaded.lock();
        if let Some(context) = loaded.as_ref() {
            return Ok(Arc::clone(context));
        }

        let path = self.path.as_ref().ok_or_else(|| {
            CryptoError::Configuration(
                "no keypair configured; run `envie init` or set ENVIE_KEYPAIR_PATH".to_string(),
            )
        })?;
        let context = Arc::new(KeyMaterialContext::from_file(path)?);
        *loaded = Some(Arc::clone(&context));
        Ok(context)
    }
}
