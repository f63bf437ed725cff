//! Per-recipient key wrapping using X25519 ECDH + AES-256-GCM
//!
//! A data-encryption key is shared with a recipient by wrapping it under a
//! key-encryption key that only the recipient can re-derive.
//!
//! # Protocol Overview
//!
//! To wrap a secret for a recipient:
//! 1. **Generate ephemeral keypair**: a fresh X25519 keypair, used once
//! 2. **Perform ECDH**: ephemeral private x recipient public (converted to X25519)
//! 3. **Derive KEK**: run the shared secret through [`kdf::derive_kek`]
//! 4. **Wrap key**: AES-GCM encrypt the secret under the KEK
//! 5. **Package**: keep the ephemeral public key next to the wrapped bytes
//!
//! The recipient recovers the secret by repeating the ECDH with their own
//! private key (converted to X25519) and the stored ephemeral public key.
//!
//! # Security Properties
//!
//! - Every wrap has its own ephemeral key, so two recipients of the same secret
//!   share no derived material and their wrapped bytes differ
//! - The ephemeral private key and the shared secret never leave the wrap call
//! - A wrong recipient key or any tampering fails AES-GCM authentication

use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use super::convert;
use super::error::CryptoError;
use super::kdf;
use super::keys::{PublicKey, SecretKey};
use super::secret::{Secret, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};

/// Size of the ephemeral X25519 public key in bytes
pub const EPHEMERAL_PUBLIC_KEY_SIZE: usize = 32;
/// Size of a wrapped 32-byte secret: `iv (12) || ciphertext (32) || tag (16)`
pub const WRAPPED_KEY_SIZE: usize = NONCE_SIZE + SECRET_SIZE + TAG_SIZE;

/// A secret wrapped for exactly one recipient
///
/// Revoking a recipient means discarding their `WrappedKey`; the secret and
/// every other recipient's record stay valid.
///
/// # Examples
///
/// ```ignore
/// let dek = Secret::generate();
/// let wrapped = WrappedKey::wrap(&dek, &bob_secret_key.public())?;
/// let recovered = wrapped.unwrap_key(&bob_secret_key)?;
/// assert_eq!(dek, recovered);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WrappedKey {
    ciphertext: [u8; WRAPPED_KEY_SIZE],
    ephemeral_public_key: [u8; EPHEMERAL_PUBLIC_KEY_SIZE],
}

impl WrappedKey {
    /// Reassemble a wrapped key from its serialized fields
    ///
    /// # Errors
    ///
    /// Returns a format error if either field has the wrong length.
    pub fn from_parts(ciphertext: &[u8], ephemeral_public_key: &[u8]) -> Result<Self, CryptoError> {
        let ciphertext: [u8; WRAPPED_KEY_SIZE] = ciphertext.try_into().map_err(|_| {
            CryptoError::format(format!(
                "wrapped key must be {} bytes, got {}",
                WRAPPED_KEY_SIZE,
                ciphertext.len()
            ))
        })?;
        let ephemeral_public_key: [u8; EPHEMERAL_PUBLIC_KEY_SIZE] =
            ephemeral_public_key.try_into().map_err(|_| {
                CryptoError::format(format!(
                    "ephemeral public key must be {} bytes, got {}",
                    EPHEMERAL_PUBLIC_KEY_SIZE,
                    ephemeral_public_key.len()
                ))
            })?;
        Ok(Self {
            ciphertext,
            ephemeral_public_key,
        })
    }

    /// Wrap `secret` so that only the holder of `recipient`'s private key can recover it
    ///
    /// # Errors
    ///
    /// Returns a validation error if the recipient key is a low-order point,
    /// which would make the shared secret predictable.
    pub fn wrap(secret: &Secret, recipient: &PublicKey) -> Result<Self, CryptoError> {
        let recipient_x25519 = recipient.to_x25519()?;

        let ephemeral_private = EphemeralSecret::random();
        let ephemeral_public = X25519PublicKey::from(&ephemeral_private);

        // consumes the ephemeral private key; the shared secret is wiped on drop
        let shared_secret = ephemeral_private.diffie_hellman(&recipient_x25519);
        if !shared_secret.was_contributory() {
            return Err(CryptoError::validation(
                "recipient public key is a low-order point",
            ));
        }
        let kek = kdf::derive_kek(shared_secret.as_bytes());
        drop(shared_secret);

        let wrapped = kek.encrypt(secret.bytes())?;
        Self::from_parts(&wrapped, ephemeral_public.as_bytes())
    }

    /// Recover the wrapped secret with the recipient's Ed25519 private key
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Integrity`] if the key is not the one this secret
    /// was wrapped for, or if any byte of the record was altered.
    pub fn unwrap_key(&self, recipient: &SecretKey) -> Result<Secret, CryptoError> {
        self.unwrap_with(recipient.to_x25519())
    }

    /// Recover the wrapped secret from raw Ed25519 private key bytes
    ///
    /// Accepts the 32-byte seed or the 64-byte `seed || public` form.
    pub fn unwrap_with_bytes(&self, recipient_private: &[u8]) -> Result<Secret, CryptoError> {
        let mut scalar = convert::ed25519_private_to_x25519(recipient_private)?;
        let private = StaticSecret::from(scalar);
        scalar.zeroize();
        self.unwrap_with(private)
    }

    fn unwrap_with(&self, private: StaticSecret) -> Result<Secret, CryptoError> {
        let ephemeral_public = X25519PublicKey::from(self.ephemeral_public_key);
        let shared_secret = private.diffie_hellman(&ephemeral_public);
        drop(private);
        if !shared_secret.was_contributory() {
            return Err(CryptoError::Integrity);
        }
        let kek = kdf::derive_kek(shared_secret.as_bytes());
        drop(shared_secret);

        let mut unwrapped = kek.decrypt(&self.ciphertext)?;
        let secret = Secret::from_slice(&unwrapped).map_err(|_| CryptoError::Integrity);
        unwrapped.zeroize();
        secret
    }

    /// `iv || ciphertext || tag` of the wrapped secret
    pub fn ciphertext(&self) -> &[u8; WRAPPED_KEY_SIZE] {
        &self.ciphertext
    }

    pub fn ephemeral_public_key(&self) -> &[u8; EPHEMERAL_PUBLIC_KEY_SIZE] {
        &self.ephemeral_public_key
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_secret() {
        let secret = Secret::from_slice(&[42u8; SECRET_SIZE]).unwrap();
        let private_key = SecretKey::generate();
        let public_key = private_key.public();
        let wrapped = WrappedKey::wrap(&secret, &public_key).unwrap();
        let recovered_secret = wrapped.unwrap_key(&private_key).unwrap();
        assert_eq!(secret, recovered_secret);
    }

    #[test]
    fn test_wrapped_size() {
        let wrapped = WrappedKey::wrap(&Secret::generate(), &SecretKey::generate().public()).unwrap();
        assert_eq!(wrapped.ciphertext().len(), 60);
        assert_eq!(wrapped.ephemeral_public_key().len(), 32);
    }

    #[test]
    fn test_wrong_recipient_fails_integrity() {
        let secret = Secret::generate();
        let alice_private = SecretKey::generate();
        let bob_private = SecretKey::generate();

        let wrapped = WrappedKey::wrap(&secret, &alice_private.public()).unwrap();
        assert_eq!(wrapped.unwrap_key(&alice_private).unwrap(), secret);

        let result = wrapped.unwrap_key(&bob_private);
        assert!(matches!(result, Err(CryptoError::Integrity)));
    }

    #[test]
    fn test_unwrap_with_raw_bytes() {
        let secret = Secret::generate();
        let private_key = SecretKey::generate();
        let wrapped = WrappedKey::wrap(&secret, &private_key.public()).unwrap();

        assert_eq!(wrapped.unwrap_with_bytes(&private_key.to_bytes()).unwrap(), secret);

        let mut keypair = private_key.to_bytes().to_vec();
        keypair.extend_from_slice(&private_key.public().to_bytes());
        assert_eq!(wrapped.unwrap_with_bytes(&keypair).unwrap(), secret);

        assert!(matches!(
            wrapped.unwrap_with_bytes(&[0u8; 10]),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_each_wrap_uses_fresh_ephemeral_key() {
        let secret = Secret::generate();
        let recipient = SecretKey::generate().public();
        let a = WrappedKey::wrap(&secret, &recipient).unwrap();
        let b = WrappedKey::wrap(&secret, &recipient).unwrap();
        assert_ne!(a.ephemeral_public_key(), b.ephemeral_public_key());
        assert_ne!(a.ciphertext(), b.ciphertext());
    }

    #[test]
    fn test_tampering_detected() {
        let secret = Secret::generate();
        let private_key = SecretKey::generate();
        let wrapped = WrappedKey::wrap(&secret, &private_key.public()).unwrap();

        for byte in 0..WRAPPED_KEY_SIZE {
            let mut ciphertext = *wrapped.ciphertext();
            ciphertext[byte] ^= 0x80;
            let tampered =
                WrappedKey::from_parts(&ciphertext, wrapped.ephemeral_public_key()).unwrap();
            assert!(matches!(
                tampered.unwrap_key(&private_key),
                Err(CryptoError::Integrity)
            ));
        }

        let mut ephemeral = *wrapped.ephemeral_public_key();
        ephemeral[3] ^= 0x01;
        let tampered = WrappedKey::from_parts(wrapped.ciphertext(), &ephemeral).unwrap();
        assert!(matches!(
            tampered.unwrap_key(&private_key),
            Err(CryptoError::Integrity)
        ));
    }

    #[test]
    fn test_low_order_ephemeral_rejected() {
        let private_key = SecretKey::generate();
        let wrapped = WrappedKey::wrap(&Secret::generate(), &private_key.public()).unwrap();
        // the all-zero u-coordinate is a low-order point
        let tampered = WrappedKey::from_parts(wrapped.ciphertext(), &[0u8; 32]).unwrap();
        assert!(matches!(
            tampered.unwrap_key(&private_key),
            Err(CryptoError::Integrity)
        ));
    }

    #[test]
    fn test_from_parts_validates_lengths() {
        assert!(matches!(
            WrappedKey::from_parts(&[0u8; 59], &[0u8; 32]),
            Err(CryptoError::Format(_))
        ));
        assert!(matches!(
            WrappedKey::from_parts(&[0u8; 60], &[0u8; 31]),
            Err(CryptoError::Format(_))
        ));
    }
}
