//! Ed25519 to X25519 key conversion
//!
//! Long-term identities are Ed25519 keys; key wrapping runs X25519 ECDH. Both
//! curves are birationally equivalent, so a signing key doubles as a DH key:
//! public points map Edwards to Montgomery, and the private scalar is the
//! clamped lower half of `SHA512(seed)`, exactly what Ed25519 itself signs with.

use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha512};
use zeroize::Zeroize;

use super::error::CryptoError;
use super::keys::{PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
use super::openssh;

/// Size of an X25519 key in bytes
pub const X25519_KEY_SIZE: usize = 32;

/// Map an Ed25519 public key onto its X25519 equivalent
///
/// Accepts a raw 32-byte key, or a longer OpenSSH wire blob
/// (`string "ssh-ed25519" || string key`).
///
/// # Errors
///
/// Returns a format error if the input is shorter than 32 bytes, the blob names
/// another key type, or the bytes are not a valid Edwards point.
pub fn ed25519_public_to_x25519(public: &[u8]) -> Result<[u8; X25519_KEY_SIZE], CryptoError> {
    let raw: [u8; PUBLIC_KEY_SIZE] = match public.len() {
        PUBLIC_KEY_SIZE => {
            let mut raw = [0u8; PUBLIC_KEY_SIZE];
            raw.copy_from_slice(public);
            raw
        }
        n if n > PUBLIC_KEY_SIZE => openssh::decode_public_blob(public)?,
        n => {
            return Err(CryptoError::format(format!(
                "ed25519 public key must be {} bytes, got {}",
                PUBLIC_KEY_SIZE, n
            )))
        }
    };

    let edwards = CompressedEdwardsY(raw)
        .decompress()
        .ok_or_else(|| CryptoError::format("public key is not a valid edwards point"))?;
    Ok(edwards.to_montgomery().to_bytes())
}

/// Derive the X25519 private scalar for an Ed25519 private key
///
/// Takes the 32-byte seed, or the 64-byte `seed || public` keypair form (only
/// the seed half is used).
pub fn ed25519_private_to_x25519(private: &[u8]) -> Result<[u8; X25519_KEY_SIZE], CryptoError> {
    let seed = match private.len() {
        PRIVATE_KEY_SIZE => private,
        n if n == PRIVATE_KEY_SIZE + PUBLIC_KEY_SIZE => &private[..PRIVATE_KEY_SIZE],
        n => {
            return Err(CryptoError::format(format!(
                "ed25519 private key must be {} or {} bytes, got {}",
                PRIVATE_KEY_SIZE,
                PRIVATE_KEY_SIZE + PUBLIC_KEY_SIZE,
                n
            )))
        }
    };

    let mut buff = [0u8; PRIVATE_KEY_SIZE];
    buff.copy_from_slice(seed);
    let scalar = x25519_scalar(&buff);
    buff.zeroize();
    Ok(scalar)
}

/// Clamped X25519 scalar for a 32-byte Ed25519 seed
pub(crate) fn x25519_scalar(seed: &[u8; PRIVATE_KEY_SIZE]) -> [u8; X25519_KEY_SIZE] {
    let mut hash = Sha512::digest(seed);
    let mut scalar = [0u8; X25519_KEY_SIZE];
    scalar.copy_from_slice(&hash[..X25519_KEY_SIZE]);
    hash.as_mut_slice().zeroize();

    // RFC 7748 clamping
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;
    scalar
}
