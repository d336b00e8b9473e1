//! SHA-256 content fingerprints over JSON documents.

use serde_json::Value;
use sha2::{Digest, Sha256};

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;

/// Running hash over a sequence of JSON documents.
///
/// Each document is folded in as its compact JSON serialization, so key order is
/// significant and two merges over identical inputs produce identical digests.
#[derive(Debug, Clone, Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, document: &Value) {
        self.hasher.update(document.to_string().as_bytes());
    }

    /// Finishes the hash and returns it hex encoded.
    pub fn digest(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Hash of a single document.
pub fn document_hash(document: &Value) -> String {
    let mut fingerprint = Fingerprint::new();
    fingerprint.update(document);
    fingerprint.digest()
}
