use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use super::convert;
use super::error::CryptoError;
use super::openssh;

/// Size of Ed25519 private key (seed) in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

const PRIVATE_KEY_PEM_TAG: &str = "PRIVATE KEY";

/// Signature algorithm of a long-term key
///
/// Only Ed25519 exists today; the tag travels in key registrations and access
/// tokens so a second algorithm can be introduced without a format break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    Ed25519,
}

impl KeyAlgorithm {
    /// All supported algorithms, indexed by their wire tag
    pub const ALL: [KeyAlgorithm; 1] = [KeyAlgorithm::Ed25519];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(&self) -> u8 {
        match self {
            KeyAlgorithm::Ed25519 => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ed25519 public key identifying a recipient
///
/// Users and access-token principals register one of these; content is shared
/// with them by wrapping a data-encryption key against it. Serializes as
/// standard base64 of the 32 raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(VerifyingKey);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl TryFrom<[u8; PUBLIC_KEY_SIZE]> for PublicKey {
    type Error = CryptoError;
    fn try_from(bytes: [u8; PUBLIC_KEY_SIZE]) -> Result<Self, Self::Error> {
        VerifyingKey::from_bytes(&bytes)
            .map(PublicKey)
            .map_err(|_| CryptoError::format("public key is not a valid ed25519 point"))
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = CryptoError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let buff: [u8; PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::format(format!(
                "invalid public key size, expected {}, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Self::try_from(buff)
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        PublicKey::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

impl PublicKey {
    /// Parse a public key from base64
    ///
    /// The decoded bytes may be the raw 32-byte key or an OpenSSH
    /// `ssh-ed25519` wire blob.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Self::from_wire(&bytes)
    }

    /// Parse raw key bytes or an OpenSSH wire blob
    pub fn from_wire(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() > PUBLIC_KEY_SIZE {
            return Self::try_from(openssh::decode_public_blob(bytes)?);
        }
        Self::try_from(bytes)
    }

    /// Parse the `ssh-ed25519 AAAA... [comment]` text form
    pub fn from_openssh_line(line: &str) -> Result<Self, CryptoError> {
        let mut parts = line.split_whitespace();
        let key_type = parts
            .next()
            .ok_or_else(|| CryptoError::format("empty openssh public key line"))?;
        if key_type != openssh::SSH_ED25519 {
            return Err(CryptoError::format(format!(
                "unsupported ssh key type {:?}, expected {}",
                key_type,
                openssh::SSH_ED25519
            )));
        }
        let body = parts
            .next()
            .ok_or_else(|| CryptoError::format("openssh public key line has no key body"))?;
        let blob = STANDARD.decode(body)?;
        Self::try_from(openssh::decode_public_blob(&blob)?)
    }

    /// Accept either an OpenSSH line or base64
    pub fn parse(input: &str) -> Result<Self, CryptoError> {
        let input = input.trim();
        if input.starts_with(openssh::SSH_ED25519) {
            Self::from_openssh_line(input)
        } else {
            Self::from_base64(input)
        }
    }

    /// Parse a public key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PUBLIC_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| CryptoError::format("public key hex decode error"))?;
        Self::try_from(buff)
    }

    /// Convert public key to raw bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Convert public key to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// OpenSSH wire blob: `string "ssh-ed25519" || string key`
    pub fn to_openssh_blob(&self) -> Vec<u8> {
        openssh::encode_public_blob(&self.to_bytes())
    }

    /// `ssh-ed25519 <base64 blob>` line, as found in `authorized_keys`
    pub fn to_openssh_line(&self) -> String {
        format!(
            "{} {}",
            openssh::SSH_ED25519,
            STANDARD.encode(self.to_openssh_blob())
        )
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::Ed25519
    }

    /// Convert Ed25519 public key to X25519 (Montgomery curve) for ECDH
    #[allow(clippy::wrong_self_convention)]
    pub(crate) fn to_x25519(&self) -> Result<X25519PublicKey, CryptoError> {
        let montgomery = convert::ed25519_public_to_x25519(&self.to_bytes())?;
        Ok(X25519PublicKey::from(montgomery))
    }

    /// Verify an Ed25519 signature on a message.
    pub fn verify(
        &self,
        msg: &[u8],
        signature: &ed25519_dalek::Signature,
    ) -> Result<(), ed25519_dalek::SignatureError> {
        self.0.verify_strict(msg, signature)
    }
}

/// Ed25519 private key used for signing and, after conversion, for ECDH
///
/// The same key signs payloads and unwraps data-encryption keys addressed to
/// its public half. The seed is wiped on drop.
///
/// # Examples
///
/// ```ignore
/// let secret_key = SecretKey::generate();
/// std::fs::write("key.pem", secret_key.to_pem()?)?;
///
/// let contents = std::fs::read("key.pem")?;
/// let recovered = SecretKey::from_key_file(&contents)?;
/// ```
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("public", &self.public())
            .finish_non_exhaustive()
    }
}

impl From<[u8; PRIVATE_KEY_SIZE]> for SecretKey {
    fn from(secret: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(SigningKey::from_bytes(&secret))
    }
}

impl TryFrom<&[u8]> for SecretKey {
    type Error = CryptoError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let mut buff: [u8; PRIVATE_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::validation(format!(
                "invalid private key size, expected {}, got {}",
                PRIVATE_KEY_SIZE,
                bytes.len()
            ))
        })?;
        let key = Self::from(buff);
        buff.zeroize();
        Ok(key)
    }
}

impl SecretKey {
    /// Generate a new random secret key using a cryptographically secure RNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; PRIVATE_KEY_SIZE];
        getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
        let key = Self::from(bytes);
        bytes.zeroize();
        key
    }

    /// Parse a secret key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PRIVATE_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| CryptoError::format("private key hex decode error"))?;
        let key = Self::from(buff);
        buff.zeroize();
        Ok(key)
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Convert secret key to raw seed bytes
    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Convert secret key to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::Ed25519
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.0
    }

    /// Encode as a PKCS#8 `PRIVATE KEY` PEM document (RFC 8410)
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        let der = self
            .0
            .to_pkcs8_der()
            .map_err(|e| CryptoError::format(format!("failed to encode PKCS#8: {}", e)))?;
        let pem = pem::Pem::new(PRIVATE_KEY_PEM_TAG, der.as_bytes());
        Ok(pem::encode(&pem))
    }

    /// Encode as an unencrypted `OPENSSH PRIVATE KEY` PEM document
    pub fn to_openssh_pem(&self, comment: &str) -> String {
        let container =
            openssh::encode_private_container(&self.to_bytes(), &self.public().to_bytes(), comment);
        let pem = pem::Pem::new(openssh::OPENSSH_PEM_TAG, container);
        pem::encode(&pem)
    }

    /// Parse a secret key from PEM format
    ///
    /// Understands `PRIVATE KEY` (a bare 32-byte seed or a PKCS#8 Ed25519
    /// document) and unencrypted `OPENSSH PRIVATE KEY` containers. A PKCS#8
    /// document that carries a public key must agree with its seed.
    pub fn from_pem(pem_str: &str) -> Result<Self, CryptoError> {
        let pem = pem::parse(pem_str)
            .map_err(|e| CryptoError::format(format!("failed to parse PEM: {}", e)))?;
        let contents = pem.contents();

        match pem.tag() {
            PRIVATE_KEY_PEM_TAG if contents.len() == PRIVATE_KEY_SIZE => {
                Self::try_from(contents).map_err(|e| CryptoError::format(e.to_string()))
            }
            PRIVATE_KEY_PEM_TAG => SigningKey::from_pkcs8_der(contents)
                .map(Self)
                .map_err(|e| {
                    CryptoError::format(format!(
                        "PRIVATE KEY is neither a raw seed nor PKCS#8 ed25519: {}",
                        e
                    ))
                }),
            openssh::OPENSSH_PEM_TAG => {
                let mut seed = openssh::decode_private_container(contents)?;
                let key = Self::from(seed);
                seed.zeroize();
                Ok(key)
            }
            other => Err(CryptoError::format(format!(
                "unsupported PEM tag {:?}, expected {} or {}",
                other,
                PRIVATE_KEY_PEM_TAG,
                openssh::OPENSSH_PEM_TAG
            ))),
        }
    }

    /// Parse the contents of a key file, detecting its format
    ///
    /// Raw 32-byte seeds, raw 64-byte `seed || public` keypairs and the PEM
    /// containers of [`SecretKey::from_pem`] are accepted.
    pub fn from_key_file(contents: &[u8]) -> Result<Self, CryptoError> {
        if let Ok(text) = std::str::from_utf8(contents) {
            if text.trim_start().starts_with("-----BEGIN") {
                return Self::from_pem(text);
            }
        }

        match contents.len() {
            PRIVATE_KEY_SIZE => Self::try_from(contents),
            n if n == PRIVATE_KEY_SIZE + PUBLIC_KEY_SIZE => {
                let (seed, public) = contents.split_at(PRIVATE_KEY_SIZE);
                let key = Self::try_from(seed)?;
                if key.public().to_bytes() != public {
                    return Err(CryptoError::format(
                        "keypair public half does not match its seed",
                    ));
                }
                Ok(key)
            }
            n => Err(CryptoError::format(format!(
                "key file is not an ed25519 key ({} bytes, no PEM header)",
                n
            ))),
        }
    }

    /// Convert Ed25519 secret key to X25519 (Montgomery curve) for ECDH
    pub(crate) fn to_x25519(&self) -> StaticSecret {
        let mut seed = self.to_bytes();
        let secret = StaticSecret::from(convert::x25519_scalar(&seed));
        seed.zeroize();
        secret
    }

    /// Sign a message with this secret key using Ed25519.
    ///
    /// Returns a detached signature that can be verified with the corresponding public key.
    pub fn sign(&self, msg: &[u8]) -> ed25519_dalek::Signature {
        self.0.sign(msg)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let private_key = SecretKey::generate();
        let public_key = private_key.public();

        // Test round-trip conversion
        let private_hex = private_key.to_hex();
        let recovered_private = SecretKey::from_hex(&private_hex).unwrap();
        assert_eq!(private_key.to_bytes(), recovered_private.to_bytes());

        let public_hex = public_key.to_hex();
        let recovered_public = PublicKey::from_hex(&public_hex).unwrap();
        assert_eq!(public_key, recovered_public);
    }

    #[test]
    fn test_pem_serialization() {
        let private_key = SecretKey::generate();

        let pem = private_key.to_pem().unwrap();
        assert!(pem.contains("BEGIN PRIVATE KEY"));
        let recovered_private = SecretKey::from_pem(&pem).unwrap();
        assert_eq!(private_key.to_bytes(), recovered_private.to_bytes());

        // Verify the recovered key can produce the same public key
        assert_eq!(private_key.public(), recovered_private.public());
    }

    #[test]
    fn test_pem_with_bare_seed() {
        let private_key = SecretKey::generate();
        let pem = pem::encode(&pem::Pem::new("PRIVATE KEY", private_key.to_bytes()));
        let recovered = SecretKey::from_pem(&pem).unwrap();
        assert_eq!(private_key.to_bytes(), recovered.to_bytes());
    }

    #[test]
    fn test_pem_from_openssl_genpkey() {
        // `openssl genpkey -algorithm ed25519` writes a PKCS#8 v1 document with no public key
        let private_key = SecretKey::generate();
        let mut der = vec![
            0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22,
            0x04, 0x20,
        ];
        der.extend_from_slice(&private_key.to_bytes());
        let pem = pem::encode(&pem::Pem::new("PRIVATE KEY", der));

        let recovered = SecretKey::from_pem(&pem).unwrap();
        assert_eq!(private_key.to_bytes(), recovered.to_bytes());
    }

    #[test]
    fn test_pem_rejects_mismatched_public_key() {
        use ed25519_dalek::pkcs8::{KeypairBytes, PublicKeyBytes};

        let keypair = KeypairBytes {
            secret_key: SecretKey::generate().to_bytes(),
            public_key: Some(PublicKeyBytes(SecretKey::generate().public().to_bytes())),
        };
        let der = keypair.to_pkcs8_der().unwrap();
        let pem = pem::encode(&pem::Pem::new("PRIVATE KEY", der.as_bytes()));
        assert!(matches!(
            SecretKey::from_pem(&pem),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_openssh_pem_roundtrip() {
        let private_key = SecretKey::generate();
        let pem = private_key.to_openssh_pem("deploy@ci");
        assert!(pem.contains("BEGIN OPENSSH PRIVATE KEY"));
        let recovered = SecretKey::from_key_file(pem.as_bytes()).unwrap();
        assert_eq!(private_key.to_bytes(), recovered.to_bytes());
    }

    #[test]
    fn test_pem_rejects_other_tags() {
        let pem = pem::encode(&pem::Pem::new("RSA PRIVATE KEY", vec![0u8; 32]));
        assert!(matches!(
            SecretKey::from_pem(&pem),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_raw_key_files() {
        let private_key = SecretKey::generate();

        let seed_only = SecretKey::from_key_file(&private_key.to_bytes()).unwrap();
        assert_eq!(seed_only.public(), private_key.public());

        let mut keypair = private_key.to_bytes().to_vec();
        keypair.extend_from_slice(&private_key.public().to_bytes());
        let from_pair = SecretKey::from_key_file(&keypair).unwrap();
        assert_eq!(from_pair.public(), private_key.public());

        // mismatched public half
        keypair[40] ^= 0x01;
        assert!(matches!(
            SecretKey::from_key_file(&keypair),
            Err(CryptoError::Format(_))
        ));

        assert!(matches!(
            SecretKey::from_key_file(b"definitely not a key"),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_private_key_length_validation() {
        assert!(matches!(
            SecretKey::try_from([0u8; 31].as_slice()),
            Err(CryptoError::Validation(_))
        ));
    }

    #[test]
    fn test_public_key_encodings() {
        let public_key = SecretKey::generate().public();

        let b64 = public_key.to_base64();
        assert_eq!(PublicKey::from_base64(&b64).unwrap(), public_key);
        assert_eq!(PublicKey::parse(&b64).unwrap(), public_key);

        let line = format!("{} laptop", public_key.to_openssh_line());
        assert_eq!(PublicKey::from_openssh_line(&line).unwrap(), public_key);
        assert_eq!(PublicKey::parse(&line).unwrap(), public_key);

        // base64 of the wire blob is accepted too
        let blob_b64 = STANDARD.encode(public_key.to_openssh_blob());
        assert_eq!(PublicKey::from_base64(&blob_b64).unwrap(), public_key);

        assert!(PublicKey::from_openssh_line("ssh-rsa AAAA").is_err());
        assert!(PublicKey::from_base64(&STANDARD.encode([1u8; 5])).is_err());
    }

    #[test]
    fn test_public_key_serde() {
        let public_key = SecretKey::generate().public();
        let json = serde_json::to_string(&public_key).unwrap();
        assert_eq!(json, format!("\"{}\"", public_key.to_base64()));
        let recovered: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered, public_key);
    }

    #[test]
    fn test_sign_and_verify() {
        let secret_key = SecretKey::generate();
        let public_key = secret_key.public();
        let message = b"hello, world!";

        let signature = secret_key.sign(message);
        assert!(public_key.verify(message, &signature).is_ok());

        let wrong_message = b"hello, world?";
        assert!(public_key.verify(wrong_message, &signature).is_err());

        let other_key = SecretKey::generate().public();
        assert!(other_key.verify(message, &signature).is_err());
    }

    #[test]
    fn test_algorithm_index() {
        assert_eq!(KeyAlgorithm::from_index(0), Some(KeyAlgorithm::Ed25519));
        assert_eq!(KeyAlgorithm::from_index(1), None);
        assert_eq!(KeyAlgorithm::Ed25519.index(), 0);
        assert_eq!(
            serde_json::to_string(&KeyAlgorithm::Ed25519).unwrap(),
            "\"ed25519\""
        );
    }
}
