//! Minimal OpenSSH wire-format support for Ed25519 keys
//!
//! Public keys travel as `string "ssh-ed25519" || string key(32)` blobs, where
//! `string` is a big-endian `u32` length followed by that many bytes. Private
//! keys on disk use the unencrypted `openssh-key-v1` container.

use super::error::CryptoError;
use super::keys::{PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};

/// Key type string for Ed25519 keys
pub const SSH_ED25519: &str = "ssh-ed25519";
/// PEM tag of the OpenSSH private key container
pub const OPENSSH_PEM_TAG: &str = "OPENSSH PRIVATE KEY";

const AUTH_MAGIC: &[u8] = b"openssh-key-v1\0";

/// Cursor over length-prefixed SSH fields
pub(crate) struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, CryptoError> {
        if self.buf.len() < 4 {
            return Err(CryptoError::format("truncated ssh field length"));
        }
        let (head, rest) = self.buf.split_at(4);
        self.buf = rest;
        Ok(u32::from_be_bytes([head[0], head[1], head[2], head[3]]))
    }

    pub(crate) fn read_string(&mut self) -> Result<&'a [u8], CryptoError> {
        let len = self.read_u32()? as usize;
        if self.buf.len() < len {
            return Err(CryptoError::format(format!(
                "ssh field claims {} bytes, only {} remain",
                len,
                self.buf.len()
            )));
        }
        let (field, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(field)
    }

    pub(crate) fn read_str(&mut self) -> Result<&'a str, CryptoError> {
        let field = self.read_string()?;
        std::str::from_utf8(field).map_err(|_| CryptoError::format("ssh field is not UTF-8"))
    }

    pub(crate) fn remaining(&self) -> &'a [u8] {
        self.buf
    }
}

fn put_string(out: &mut Vec<u8>, field: &[u8]) {
    out.extend_from_slice(&(field.len() as u32).to_be_bytes());
    out.extend_from_slice(field);
}

/// Encode a raw Ed25519 public key as an OpenSSH wire blob
pub fn encode_public_blob(public: &[u8; PUBLIC_KEY_SIZE]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + SSH_ED25519.len() + 4 + PUBLIC_KEY_SIZE);
    put_string(&mut out, SSH_ED25519.as_bytes());
    put_string(&mut out, public);
    out
}

/// Extract the raw 32-byte key from an OpenSSH `ssh-ed25519` public blob
///
/// # Errors
///
/// Fails with a format error if the key type is anything other than
/// `ssh-ed25519`, the key field is not 32 bytes, or bytes follow the key.
pub fn decode_public_blob(blob: &[u8]) -> Result<[u8; PUBLIC_KEY_SIZE], CryptoError> {
    let mut reader = WireReader::new(blob);
    let key = read_ed25519_public(&mut reader)?;
    if !reader.remaining().is_empty() {
        return Err(CryptoError::format(format!(
            "{} trailing bytes after ssh-ed25519 public key",
            reader.remaining().len()
        )));
    }
    Ok(key)
}

fn read_ed25519_public(reader: &mut WireReader<'_>) -> Result<[u8; PUBLIC_KEY_SIZE], CryptoError> {
    let key_type = reader.read_str()?;
    if key_type != SSH_ED25519 {
        return Err(CryptoError::format(format!(
            "unsupported ssh key type {:?}, expected {}",
            key_type, SSH_ED25519
        )));
    }
    let key = reader.read_string()?;
    let key: [u8; PUBLIC_KEY_SIZE] = key.try_into().map_err(|_| {
        CryptoError::format(format!(
            "ssh-ed25519 key must be {} bytes, got {}",
            PUBLIC_KEY_SIZE,
            key.len()
        ))
    })?;
    Ok(key)
}

/// Pull the Ed25519 seed out of an unencrypted `openssh-key-v1` container
///
/// `data` is the base64-decoded body of an `OPENSSH PRIVATE KEY` PEM block.
pub fn decode_private_container(data: &[u8]) -> Result<[u8; PRIVATE_KEY_SIZE], CryptoError> {
    let body = data
        .strip_prefix(AUTH_MAGIC)
        .ok_or_else(|| CryptoError::format("missing openssh-key-v1 magic"))?;
    let mut reader = WireReader::new(body);

    let cipher = reader.read_str()?;
    let kdf = reader.read_str()?;
    let _kdf_options = reader.read_string()?;
    if cipher != "none" || kdf != "none" {
        return Err(CryptoError::format(
            "encrypted openssh private keys are not supported",
        ));
    }

    let count = reader.read_u32()?;
    if count != 1 {
        return Err(CryptoError::format(format!(
            "expected exactly one key in openssh container, found {}",
            count
        )));
    }
    let outer_public = decode_public_blob(reader.read_string()?)?;

    let mut private = WireReader::new(reader.read_string()?);
    let check1 = private.read_u32()?;
    let check2 = private.read_u32()?;
    if check1 != check2 {
        return Err(CryptoError::format("openssh check integers do not match"));
    }

    let inner_public = read_ed25519_public(&mut private)?;
    let keypair = private.read_string()?;
    if keypair.len() != PRIVATE_KEY_SIZE + PUBLIC_KEY_SIZE {
        return Err(CryptoError::format(format!(
            "ssh-ed25519 private field must be {} bytes, got {}",
            PRIVATE_KEY_SIZE + PUBLIC_KEY_SIZE,
            keypair.len()
        )));
    }
    let (seed, embedded_public) = keypair.split_at(PRIVATE_KEY_SIZE);
    if embedded_public != inner_public || inner_public != outer_public {
        return Err(CryptoError::format(
            "openssh container public keys are inconsistent",
        ));
    }
    // comment and padding follow; neither carries key material
    let _comment = private.read_string()?;
    tracing::trace!(padding = private.remaining().len(), "parsed openssh container");

    let mut out = [0u8; PRIVATE_KEY_SIZE];
    out.copy_from_slice(seed);
    Ok(out)
}

/// Build an unencrypted `openssh-key-v1` container for a keypair
pub fn encode_private_container(
    seed: &[u8; PRIVATE_KEY_SIZE],
    public: &[u8; PUBLIC_KEY_SIZE],
    comment: &str,
) -> Vec<u8> {
    let public_blob = encode_public_blob(public);

    let mut check = [0u8; 4];
    getrandom::getrandom(&mut check).expect("failed to generate random bytes");

    let mut private = Vec::new();
    private.extend_from_slice(&check);
    private.extend_from_slice(&check);
    put_string(&mut private, SSH_ED25519.as_bytes());
    put_string(&mut private, public);
    let mut keypair = Vec::with_capacity(PRIVATE_KEY_SIZE + PUBLIC_KEY_SIZE);
    keypair.extend_from_slice(seed);
    keypair.extend_from_slice(public);
    put_string(&mut private, &keypair);
    put_string(&mut private, comment.as_bytes());
    let mut pad = 1u8;
    while private.len() % 8 != 0 {
        private.push(pad);
        pad += 1;
    }

    let mut out = Vec::new();
    out.extend_from_slice(AUTH_MAGIC);
    put_string(&mut out, b"none");
    put_string(&mut out, b"none");
    put_string(&mut out, b"");
    out.extend_from_slice(&1u32.to_be_bytes());
    put_string(&mut out, &public_blob);
    put_string(&mut out, &private);
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_public_blob_layout() {
        let key = [9u8; PUBLIC_KEY_SIZE];
        let blob = encode_public_blob(&key);
        assert_eq!(&blob[..4], &[0, 0, 0, 11]);
        assert_eq!(&blob[4..15], b"ssh-ed25519");
        assert_eq!(&blob[15..19], &[0, 0, 0, 32]);
        assert_eq!(&blob[19..], &key);
        assert_eq!(decode_public_blob(&blob).unwrap(), key);
    }

    #[test]
    fn test_rejects_other_key_types() {
        let mut blob = Vec::new();
        put_string(&mut blob, b"ssh-rsa");
        put_string(&mut blob, &[1u8; 32]);
        assert!(matches!(
            decode_public_blob(&blob),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_rejects_truncated_blob() {
        let blob = encode_public_blob(&[3u8; PUBLIC_KEY_SIZE]);
        assert!(decode_public_blob(&blob[..blob.len() - 1]).is_err());
        assert!(decode_public_blob(&blob[..2]).is_err());
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut blob = encode_public_blob(&[3u8; PUBLIC_KEY_SIZE]);
        blob.push(0);
        assert!(matches!(
            decode_public_blob(&blob),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_private_container_roundtrip() {
        let seed = [5u8; PRIVATE_KEY_SIZE];
        let public = [6u8; PUBLIC_KEY_SIZE];
        let container = encode_private_container(&seed, &public, "ci@host");
        assert_eq!(decode_private_container(&container).unwrap(), seed);
    }

    #[test]
    fn test_private_container_rejects_encrypted() {
        let mut out = Vec::new();
        out.extend_from_slice(AUTH_MAGIC);
        put_string(&mut out, b"aes256-ctr");
        put_string(&mut out, b"bcrypt");
        put_string(&mut out, b"");
        out.extend_from_slice(&1u32.to_be_bytes());
        assert!(matches!(
            decode_private_container(&out),
            Err(CryptoError::Format(_))
        ));
    }
}
