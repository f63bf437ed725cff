//! Key-encryption-key derivation
//!
//! Turns a raw X25519 shared secret into the AES key that wraps a DEK. The
//! construction is a hash-based extract/expand pair:
//!
//! ```text
//! prk = SHA256(salt || shared_secret)
//! okm = SHA256(prk || info || 0x01)
//! ```
//!
//! The salt is fixed. Every wrapped key already stored by existing clients
//! was derived this way, so changing either constant breaks unwrapping.

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use super::secret::{Secret, SECRET_SIZE};

/// Salt mixed into the extract step
pub const KDF_SALT: &[u8] = b"envie-salt";
/// Context string for wrapping data-encryption keys
pub const KEY_WRAPPING_INFO: &str = "envie-key-wrapping";

/// Derive a 32-byte key from `shared_secret`, bound to `info`
pub fn derive(shared_secret: &[u8], info: &str) -> Secret {
    let mut prk: [u8; SECRET_SIZE] = Sha256::new()
        .chain_update(KDF_SALT)
        .chain_update(shared_secret)
        .finalize()
        .into();

    let okm: [u8; SECRET_SIZE] = Sha256::new()
        .chain_update(prk)
        .chain_update(info.as_bytes())
        .chain_update([0x01u8])
        .finalize()
        .into();

    prk.zeroize();
    Secret::from(okm)
}

/// Derive the KEK used to wrap a data-encryption key
pub fn derive_kek(shared_secret: &[u8]) -> Secret {
    derive(shared_secret, KEY_WRAPPING_INFO)
}
