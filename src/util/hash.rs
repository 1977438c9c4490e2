//! Fingerprinting for composed environments.

use sha2::{Digest, Sha256};

/// Incremental digest over a sequence of string components.
///
/// Components are separated, so `["ab", "c"]` and `["a", "bc"]` differ.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add a string component.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0");
        self
    }

    /// Finalize as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// Finalize as the first 16 hex characters.
    pub fn finish_short(self) -> String {
        self.finish()[..16].to_string()
    }
}
