/**
 * Cryptographic types and operations.
 *  - AES-256-GCM content encryption
 *  - Ed25519 keys and their X25519 conversion
 *  - Per-recipient key wrapping and envelopes
 *  - Access token encoding
 */
pub mod crypto;
/**
 * JSON records exchanged with the server,
 *  with base64 for every binary field.
 */
pub mod wire;

pub mod prelude {
    pub use crate::crypto::{
        AccessToken, CryptoError, DataEncryptionKey, EncryptedContent, KeyMaterialContext,
        KeyMaterialLoader, PublicKey, SecretKey, WrappedKey,
    };
    pub use crate::wire::{EnvelopeRecord, PublicKeyRegistration, WrappedKeyRecord};
}
