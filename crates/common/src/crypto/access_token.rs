//! Machine access tokens
//!
//! An access token bundles a bearer value with an Ed25519 signing key in one
//! base64url string. Only the bearer value is ever sent to the server; the key
//! stays with the holder, who uses it to sign payloads and to unwrap content
//! shared with the token's public key.
//!
//! # Wire Format
//!
//! ```text
//! [ version: 1 ][ algorithm: 1 ][ private key: 32 ][ token value: 32 ]
//! ```
//!
//! 66 bytes, no length prefixes, base64url encoded (66 is a multiple of
//! three, so the encoding never carries padding).

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use zeroize::Zeroize;

use super::error::CryptoError;
use super::key_context::KeyMaterialContext;
use super::keys::{KeyAlgorithm, PublicKey, SecretKey, PRIVATE_KEY_SIZE};

/// The only token layout understood today
pub const ACCESS_TOKEN_VERSION: u8 = 1;
/// Length of the opaque bearer value, in ASCII characters
pub const TOKEN_VALUE_SIZE: usize = 32;
/// Length of a decoded token in bytes
pub const ACCESS_TOKEN_SIZE: usize = 2 + PRIVATE_KEY_SIZE + TOKEN_VALUE_SIZE;

const KEY_OFFSET: usize = 2;
const VALUE_OFFSET: usize = KEY_OFFSET + PRIVATE_KEY_SIZE;
const VALUE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// A decoded access token
///
/// Immutable once issued. The public key is recomputed from the embedded
/// private key rather than stored.
#[derive(Clone)]
pub struct AccessToken {
    version: u8,
    algorithm: KeyAlgorithm,
    signing_key: SecretKey,
    value: String,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("version", &self.version)
            .field("algorithm", &self.algorithm)
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl AccessToken {
    /// Build a token from a bearer value and an optional private key
    ///
    /// A fresh Ed25519 key is generated when `private_key` is `None`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `value` is not exactly 32 ASCII characters
    /// or `private_key` is not exactly 32 bytes.
    pub fn new(value: &str, private_key: Option<&[u8]>) -> Result<Self, CryptoError> {
        validate_token_value(value)?;
        let signing_key = match private_key {
            Some(bytes) => SecretKey::try_from(bytes)?,
            None => SecretKey::generate(),
        };
        Ok(Self {
            version: ACCESS_TOKEN_VERSION,
            algorithm: KeyAlgorithm::Ed25519,
            signing_key,
            value: value.to_string(),
        })
    }

    /// Serialize to the 66-byte layout, base64url encoded
    pub fn encode(&self) -> String {
        let mut buff = [0u8; ACCESS_TOKEN_SIZE];
        buff[0] = self.version;
        buff[1] = self.algorithm.index();
        buff[KEY_OFFSET..VALUE_OFFSET].copy_from_slice(&self.signing_key.to_bytes());
        buff[VALUE_OFFSET..].copy_from_slice(self.value.as_bytes());
        let encoded = URL_SAFE_NO_PAD.encode(buff);
        buff.zeroize();
        encoded
    }

    /// Parse an encoded token
    ///
    /// # Errors
    ///
    /// Returns a format error for invalid base64url, a decoded length other
    /// than 66, an unknown version, an out-of-range algorithm index, or a
    /// non-ASCII token value.
    pub fn decode(encoded: &str) -> Result<Self, CryptoError> {
        let encoded = encoded.trim().trim_end_matches('=');
        let mut bytes = URL_SAFE_NO_PAD.decode(encoded)?;
        let token = Self::from_bytes(&bytes);
        bytes.zeroize();
        token
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != ACCESS_TOKEN_SIZE {
            return Err(CryptoError::format(format!(
                "access token must decode to {} bytes, got {}",
                ACCESS_TOKEN_SIZE,
                bytes.len()
            )));
        }

        let version = bytes[0];
        if version != ACCESS_TOKEN_VERSION {
            return Err(CryptoError::format(format!(
                "unsupported access token version {}",
                version
            )));
        }

        let algorithm = KeyAlgorithm::from_index(bytes[1]).ok_or_else(|| {
            CryptoError::format(format!("unknown access token algorithm index {}", bytes[1]))
        })?;

        let value_bytes = &bytes[VALUE_OFFSET..];
        if !value_bytes.is_ascii() {
            return Err(CryptoError::format("access token value is not ASCII"));
        }
        // ASCII is always valid UTF-8
        let value = String::from_utf8_lossy(value_bytes).into_owned();

        let signing_key = SecretKey::try_from(&bytes[KEY_OFFSET..VALUE_OFFSET])
            .map_err(|e| CryptoError::format(e.to_string()))?;

        Ok(Self {
            version,
            algorithm,
            signing_key,
            value,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// The opaque value sent as the bearer credential
    pub fn bearer(&self) -> &str {
        &self.value
    }

    pub fn signing_key(&self) -> &SecretKey {
        &self.signing_key
    }

    pub fn public_key(&self) -> PublicKey {
        self.signing_key.public()
    }

    /// Key material for signing and unwrapping as this token's principal
    pub fn key_material(&self) -> KeyMaterialContext {
        KeyMaterialContext::new(self.signing_key.clone())
    }
}

/// Encode a token value and optional private key in one call
pub fn encode(value: &str, private_key: Option<&[u8]>) -> Result<String, CryptoError> {
    AccessToken::new(value, private_key).map(|token| token.encode())
}

/// Decode an encoded access token
pub fn decode(encoded: &str) -> Result<AccessToken, CryptoError> {
    AccessToken::decode(encoded)
}

/// Mint a random 32-character alphanumeric bearer value
pub fn generate_token_value() -> String {
    // 62 * 4 = 248 keeps the modulo unbiased
    let mut value = String::with_capacity(TOKEN_VALUE_SIZE);
    let mut buff = [0u8; 64];
    while value.len() < TOKEN_VALUE_SIZE {
        getrandom::getrandom(&mut buff).expect("failed to generate random bytes");
        for byte in buff.iter().filter(|b| **b < 248) {
            if value.len() == TOKEN_VALUE_SIZE {
                break;
            }
            value.push(VALUE_ALPHABET[(*byte as usize) % VALUE_ALPHABET.len()] as char);
        }
    }
    value
}

fn validate_token_value(value: &str) -> Result<(), CryptoError> {
    if !value.is_ascii() {
        return Err(CryptoError::validation("token value must be ASCII"));
    }
    if value.len() != TOKEN_VALUE_SIZE {
        return Err(CryptoError::validation(format!(
            "token value must be {} characters, got {}",
            TOKEN_VALUE_SIZE,
            value.len()
        )));
    }
    Ok(())
}
