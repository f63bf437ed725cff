//! JSON records exchanged with the server
//!
//! Binary fields are standard base64. Converting a record into a core type
//! validates encodings and lengths up front, so malformed payloads fail with
//! [`CryptoError::Format`] before any key material is touched.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::crypto::{
    CryptoError, EncryptedContent, KeyAlgorithm, PublicKey, RecipientKey, SealedEnvelope,
    WrappedKey,
};

/// `{ wrappedKey, ephemeralPublicKey, publicKeyBase64? }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKeyRecord {
    pub wrapped_key: String,
    pub ephemeral_public_key: String,
    /// Present in multi-recipient payloads to say who the record is for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_base64: Option<String>,
}

impl From<&WrappedKey> for WrappedKeyRecord {
    fn from(wrapped: &WrappedKey) -> Self {
        Self {
            wrapped_key: STANDARD.encode(wrapped.ciphertext()),
            ephemeral_public_key: STANDARD.encode(wrapped.ephemeral_public_key()),
            public_key_base64: None,
        }
    }
}

impl From<&RecipientKey> for WrappedKeyRecord {
    fn from(entry: &RecipientKey) -> Self {
        Self {
            public_key_base64: Some(entry.recipient.to_base64()),
            ..Self::from(&entry.wrapped)
        }
    }
}

impl TryFrom<&WrappedKeyRecord> for WrappedKey {
    type Error = CryptoError;
    fn try_from(record: &WrappedKeyRecord) -> Result<Self, Self::Error> {
        let ciphertext = STANDARD.decode(&record.wrapped_key)?;
        let ephemeral = STANDARD.decode(&record.ephemeral_public_key)?;
        WrappedKey::from_parts(&ciphertext, &ephemeral)
    }
}

impl WrappedKeyRecord {
    /// The recipient this record is addressed to, if it names one
    pub fn recipient(&self) -> Result<Option<PublicKey>, CryptoError> {
        self.public_key_base64
            .as_deref()
            .map(PublicKey::from_base64)
            .transpose()
    }

    /// Whether this record names `recipient`
    ///
    /// An absent or undecodable `publicKeyBase64` names nobody.
    pub fn is_for(&self, recipient: &PublicKey) -> bool {
        matches!(self.recipient(), Ok(Some(key)) if &key == recipient)
    }

    /// Decode into a [`RecipientKey`]; the record must name its recipient
    pub fn to_recipient_key(&self) -> Result<RecipientKey, CryptoError> {
        let recipient = self
            .recipient()?
            .ok_or_else(|| CryptoError::format("wrapped key record has no publicKeyBase64"))?;
        Ok(RecipientKey {
            recipient,
            wrapped: WrappedKey::try_from(self)?,
        })
    }
}

/// `{ ciphertext, keys }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedContentRecord {
    pub ciphertext: String,
    pub keys: Vec<String>,
}

impl From<&EncryptedContent> for EncryptedContentRecord {
    fn from(content: &EncryptedContent) -> Self {
        Self {
            ciphertext: STANDARD.encode(content.ciphertext()),
            keys: content.key_names().to_vec(),
        }
    }
}

impl TryFrom<&EncryptedContentRecord> for EncryptedContent {
    type Error = CryptoError;
    fn try_from(record: &EncryptedContentRecord) -> Result<Self, Self::Error> {
        let ciphertext = STANDARD.decode(&record.ciphertext)?;
        EncryptedContent::from_parts(ciphertext, record.keys.clone())
    }
}

/// `{ valueBase64, algorithm }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyRegistration {
    pub value_base64: String,
    pub algorithm: KeyAlgorithm,
}

impl From<&PublicKey> for PublicKeyRegistration {
    fn from(key: &PublicKey) -> Self {
        Self {
            value_base64: key.to_base64(),
            algorithm: key.algorithm(),
        }
    }
}

impl TryFrom<&PublicKeyRegistration> for PublicKey {
    type Error = CryptoError;
    fn try_from(registration: &PublicKeyRegistration) -> Result<Self, Self::Error> {
        let bytes = STANDARD.decode(&registration.value_base64)?;
        PublicKey::try_from(bytes.as_slice())
    }
}

/// A shareable encrypted document: content plus one wrapped key per recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeRecord {
    pub content: EncryptedContentRecord,
    pub recipients: Vec<WrappedKeyRecord>,
}

impl From<&SealedEnvelope> for EnvelopeRecord {
    fn from(sealed: &SealedEnvelope) -> Self {
        Self {
            content: EncryptedContentRecord::from(&sealed.encrypted_content),
            recipients: sealed
                .wrapped_keys
                .iter()
                .map(WrappedKeyRecord::from)
                .collect(),
        }
    }
}

impl EnvelopeRecord {
    pub fn encrypted_content(&self) -> Result<EncryptedContent, CryptoError> {
        EncryptedContent::try_from(&self.content)
    }

    /// Decode every recipient entry, in order
    pub fn recipient_keys(&self) -> Result<Vec<RecipientKey>, CryptoError> {
        self.recipients
            .iter()
            .map(WrappedKeyRecord::to_recipient_key)
            .collect()
    }

    /// First record addressed to `recipient`
    ///
    /// Entries for other recipients are skipped without decoding their key
    /// material, so a malformed or unaddressed entry only fails the lookup
    /// when it is the one that matches.
    pub fn find(&self, recipient: &PublicKey) -> Result<Option<WrappedKey>, CryptoError> {
        self.recipients
            .iter()
            .find(|entry| entry.is_for(recipient))
            .map(WrappedKey::try_from)
            .transpose()
    }

    pub fn push(&mut self, entry: &RecipientKey) {
        self.recipients.push(WrappedKeyRecord::from(entry));
    }

    /// Drop every record addressed to `recipient`, returning how many went
    ///
    /// Matches on the decoded key, the same way [`EnvelopeRecord::find`] does.
    pub fn remove(&mut self, recipient: &PublicKey) -> usize {
        let before = self.recipients.len();
        self.recipients.retain(|entry| !entry.is_for(recipient));
        before - self.recipients.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{DataEncryptionKey, SecretKey};

    #[test]
    fn test_wrapped_key_record_json_shape() {
        let key = SecretKey::generate();
        let sealed = DataEncryptionKey::new_with_pke(&[key.public()], "A=1").unwrap();
        let record = WrappedKeyRecord::from(&sealed.wrapped_keys[0]);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json["wrappedKey"].is_string());
        assert!(json["ephemeralPublicKey"].is_string());
        assert_eq!(json["publicKeyBase64"], key.public().to_base64());

        let bare = WrappedKeyRecord::from(&sealed.wrapped_keys[0].wrapped);
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("publicKeyBase64").is_none());
    }

    #[test]
    fn test_envelope_record_roundtrip() {
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();
        let sealed =
            DataEncryptionKey::new_with_pke(&[alice.public(), bob.public()], "A=1\nB=2").unwrap();
        let record = EnvelopeRecord::from(&sealed);

        let json = serde_json::to_string(&record).unwrap();
        let parsed: EnvelopeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.content.keys, vec!["A", "B"]);

        let content = parsed.encrypted_content().unwrap();
        let wrapped = parsed.find(&bob.public()).unwrap().unwrap();
        assert_eq!(
            DataEncryptionKey::decrypt_content(&wrapped, &bob, &content).unwrap(),
            "A=1\nB=2"
        );
    }

    #[test]
    fn test_envelope_remove_recipient() {
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();
        let sealed =
            DataEncryptionKey::new_with_pke(&[alice.public(), bob.public()], "A=1").unwrap();
        let mut record = EnvelopeRecord::from(&sealed);

        assert_eq!(record.remove(&bob.public()), 1);
        assert_eq!(record.recipients.len(), 1);
        assert!(record.find(&bob.public()).unwrap().is_none());
        assert!(record.find(&alice.public()).unwrap().is_some());
    }

    #[test]
    fn test_remove_matches_openssh_blob_form() {
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();
        let sealed =
            DataEncryptionKey::new_with_pke(&[alice.public(), bob.public()], "A=1").unwrap();
        let mut record = EnvelopeRecord::from(&sealed);
        record.recipients[1].public_key_base64 =
            Some(format!(" {} ", STANDARD.encode(bob.public().to_openssh_blob())));

        assert!(record.find(&bob.public()).unwrap().is_some());
        assert_eq!(record.remove(&bob.public()), 1);
        assert!(record.find(&bob.public()).unwrap().is_none());
        assert!(record.find(&alice.public()).unwrap().is_some());
    }

    #[test]
    fn test_find_skips_foreign_entries() {
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();
        let sealed = DataEncryptionKey::new_with_pke(&[bob.public(), alice.public()], "A=1").unwrap();
        let mut record = EnvelopeRecord::from(&sealed);

        // an unaddressed entry and a malformed one ahead of alice
        record.recipients[0].public_key_base64 = None;
        record.recipients.insert(
            1,
            WrappedKeyRecord {
                wrapped_key: "%%%".to_string(),
                ephemeral_public_key: STANDARD.encode([0u8; 3]),
                public_key_base64: Some(SecretKey::generate().public().to_base64()),
            },
        );

        let content = record.encrypted_content().unwrap();
        let wrapped = record.find(&alice.public()).unwrap().unwrap();
        assert_eq!(
            DataEncryptionKey::decrypt_content(&wrapped, &alice, &content).unwrap(),
            "A=1"
        );
        assert!(record.find(&bob.public()).unwrap().is_none());
    }

    #[test]
    fn test_find_reports_malformed_match() {
        let alice = SecretKey::generate();
        let sealed = DataEncryptionKey::new_with_pke(&[alice.public()], "A=1").unwrap();
        let mut record = EnvelopeRecord::from(&sealed);
        record.recipients[0].wrapped_key = STANDARD.encode([0u8; 59]);

        assert!(matches!(
            record.find(&alice.public()),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_malformed_records_fail_with_format() {
        let record = WrappedKeyRecord {
            wrapped_key: STANDARD.encode([0u8; 59]),
            ephemeral_public_key: STANDARD.encode([0u8; 32]),
            public_key_base64: None,
        };
        assert!(matches!(
            WrappedKey::try_from(&record),
            Err(CryptoError::Format(_))
        ));

        let record = WrappedKeyRecord {
            wrapped_key: "%%%".to_string(),
            ..record
        };
        assert!(matches!(
            WrappedKey::try_from(&record),
            Err(CryptoError::Format(_))
        ));

        let content = EncryptedContentRecord {
            ciphertext: STANDARD.encode([0u8; 27]),
            keys: vec![],
        };
        assert!(matches!(
            EncryptedContent::try_from(&content),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn test_public_key_registration() {
        let key = SecretKey::generate().public();
        let registration = PublicKeyRegistration::from(&key);

        let json = serde_json::to_value(&registration).unwrap();
        assert_eq!(json["algorithm"], "ed25519");
        assert_eq!(json["valueBase64"], key.to_base64());

        assert_eq!(PublicKey::try_from(&registration).unwrap(), key);
    }
}
