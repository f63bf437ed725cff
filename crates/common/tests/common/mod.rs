//! Shared helpers for envelope integration tests
#![allow(dead_code)]

use std::path::PathBuf;

use common::crypto::{KeyMaterialContext, PublicKey, SecretKey};
use tempfile::TempDir;

/// A principal with its own keypair
pub struct Principal {
    pub name: &'static str,
    pub key: SecretKey,
}

impl Principal {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            key: SecretKey::generate(),
        }
    }

    pub fn public(&self) -> PublicKey {
        self.key.public()
    }

    pub fn context(&self) -> KeyMaterialContext {
        KeyMaterialContext::new(self.key.clone())
    }
}

/// Generate `n` principals named after their position
pub fn principals(n: usize) -> Vec<Principal> {
    const NAMES: [&str; 6] = ["alice", "bob", "carol", "dave", "erin", "frank"];
    NAMES.iter().copied().take(n).map(Principal::new).collect()
}

/// Write `contents` as a key file inside a fresh temp dir
pub fn write_key_file(contents: impl AsRef<[u8]>) -> (PathBuf, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("key");
    std::fs::write(&path, contents).unwrap();
    (path, temp_dir)
}
