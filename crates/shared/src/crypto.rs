//! Cryptographic utilities for secret comparison.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares a presented secret against the configured secret.
///
/// Both sides are hashed before comparison so the equality check runs over
/// fixed-length digests rather than the raw values.
pub fn secrets_match(presented: &str, configured: &str) -> bool {
    sha256_hex(presented) == sha256_hex(configured)
}
