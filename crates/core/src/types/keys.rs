//! Deterministic hashing for file keys and stored secrets.

use sha2::{Digest, Sha256};

use super::Email;

/// Hex length of a hashed file key.
const KEY_LENGTH: usize = 16;

/// Derive the filesystem-safe document key for an email address.
///
/// User, cart and order documents are all keyed by the owner's email. The
/// key is a truncated SHA-256 hex digest: deterministic, one-way, and safe
/// to use as a file name. It is not reversible and is never presented to
/// clients as an identifier.
#[must_use]
pub fn hashed_key(email: &Email) -> String {
    let digest = Sha256::digest(email.as_str().as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(KEY_LENGTH);
    hex
}

/// Keyed SHA-256 digest, hex encoded.
///
/// Used for stored passwords: the digest is keyed with the configured
/// hashing secret so the plain digest of a password alone is not enough to
/// match a stored value.
#[must_use]
pub fn keyed_digest(secret: &str, value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b"\x00");
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}
