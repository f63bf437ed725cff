//! Cryptographic core for envie
//!
//! This module implements client-side envelope encryption for environment files:
//!
//! - **Content Encryption**: AES-256-GCM under a per-version data-encryption key ([`Secret`])
//! - **Key Wrapping**: X25519 ECDH + hash KDF + AES-GCM, one [`WrappedKey`] per recipient
//! - **Identity**: Ed25519 keypairs ([`SecretKey`]/[`PublicKey`]) that both sign and receive wraps
//! - **Access Tokens**: a bearer value and signing key packed into one string ([`AccessToken`])
//!
//! # Security Model
//!
//! ## Identity
//! Each user or machine principal holds one Ed25519 keypair. The public half is
//! registered with the server; the private half never leaves the client. The same
//! key signs payloads and, converted to X25519, receives wrapped keys.
//!
//! ## Content Encryption
//! Every version of a document gets a fresh DEK. The document is encrypted once,
//! so changing who can read it costs one wrap or one deletion per recipient,
//! independent of the document size.
//!
//! ## Key Sharing Protocol
//! To share a DEK with a recipient:
//! 1. Generate an ephemeral X25519 keypair
//! 2. Convert the recipient's Ed25519 public key to X25519
//! 3. Perform ECDH to derive a shared secret, then a KEK via [`kdf`]
//! 4. AES-GCM encrypt the DEK under the KEK
//! 5. Store the ephemeral public key next to the wrapped DEK
//!
//! The recipient repeats the ECDH with their converted private key and the
//! stored ephemeral public key, re-derives the KEK, and decrypts.

pub mod access_token;
mod content;
pub mod convert;
mod envelope;
mod error;
pub mod kdf;
mod key_context;
mod keys;
pub mod openssh;
mod secret;
mod wrapped_key;

pub use access_token::{AccessToken, ACCESS_TOKEN_SIZE, ACCESS_TOKEN_VERSION, TOKEN_VALUE_SIZE};
pub use content::{extract_key_names, EncryptedContent};
pub use ed25519_dalek::Signature;
pub use envelope::{DataEncryptionKey, RecipientKey, SealedEnvelope};
pub use error::CryptoError;
pub use key_context::{KeyMaterialContext, KeyMaterialLoader, SignedMessage};
pub use keys::{KeyAlgorithm, PublicKey, SecretKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
pub use secret::{Secret, MIN_CIPHERTEXT_SIZE, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};
pub use wrapped_key::{WrappedKey, EPHEMERAL_PUBLIC_KEY_SIZE, WRAPPED_KEY_SIZE};
