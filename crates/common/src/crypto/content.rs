//! Encrypted environment documents
//!
//! An [`EncryptedContent`] pairs an AES-GCM framed ciphertext with the list of
//! variable names found in the plaintext. The names are not secret; they let
//! dashboards and diffs show which keys a version defines without decrypting it.

use super::error::CryptoError;
use super::secret::MIN_CIPHERTEXT_SIZE;

/// Ciphertext plus the variable names of the document it encrypts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedContent {
    ciphertext: Vec<u8>,
    key_names: Vec<String>,
}

impl EncryptedContent {
    /// Build from a fresh ciphertext and the plaintext it was made from
    pub(crate) fn new(ciphertext: Vec<u8>, plaintext: &str) -> Self {
        Self {
            ciphertext,
            key_names: extract_key_names(plaintext),
        }
    }

    /// Reassemble content received from elsewhere
    ///
    /// # Errors
    ///
    /// Returns a format error if the buffer cannot hold an IV and a tag.
    pub fn from_parts(ciphertext: Vec<u8>, key_names: Vec<String>) -> Result<Self, CryptoError> {
        if ciphertext.len() < MIN_CIPHERTEXT_SIZE {
            return Err(CryptoError::format(format!(
                "ciphertext must be at least {} bytes, got {}",
                MIN_CIPHERTEXT_SIZE,
                ciphertext.len()
            )));
        }
        Ok(Self {
            ciphertext,
            key_names,
        })
    }

    /// `iv || ciphertext || tag`
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn key_names(&self) -> &[String] {
        &self.key_names
    }
}

/// Collect the `NAME` of every `NAME=VALUE` line, in order
///
/// Comment lines (starting with `#`) and lines without `=` are skipped, as are
/// lines whose name is empty.
pub fn extract_key_names(plaintext: &str) -> Vec<String> {
    plaintext
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(name, _)| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::Secret;

    #[test]
    fn test_key_names_skip_comments_and_bare_lines() {
        let names = extract_key_names("A=1\n#comment\nB=two words\n");
        assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_key_names_keep_value_equals() {
        let names = extract_key_names("URL=postgres://u:p@h/db?x=1\nnot a pair\n  # indented=comment\n");
        assert_eq!(names, vec!["URL".to_string()]);
    }

    #[test]
    fn test_key_names_handle_crlf_and_blank_names() {
        let names = extract_key_names("FIRST=1\r\n=orphan\r\n\r\nSECOND = 2\r\n");
        assert_eq!(names, vec!["FIRST".to_string(), "SECOND".to_string()]);
    }

    #[test]
    fn test_encrypt_content_records_key_names() {
        let secret = Secret::generate();
        let content = secret.encrypt_content("A=1\n#comment\nB=two words\n").unwrap();
        assert_eq!(content.key_names(), ["A", "B"]);

        let plaintext = secret.decrypt_content(&content).unwrap();
        assert_eq!(plaintext, "A=1\n#comment\nB=two words\n");
    }

    #[test]
    fn test_from_parts_rejects_short_buffers() {
        assert!(matches!(
            EncryptedContent::from_parts(vec![0u8; MIN_CIPHERTEXT_SIZE - 1], vec![]),
            Err(CryptoError::Format(_))
        ));
        assert!(EncryptedContent::from_parts(vec![0u8; MIN_CIPHERTEXT_SIZE], vec![]).is_ok());
    }
}
