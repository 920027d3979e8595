//! Record identifiers.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters allowed in a [`RecordId`] (URL-safe, nanoid alphabet).
const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ-_";

/// Errors that can occur when parsing a [`RecordId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordIdError {
    /// The input is not exactly [`RecordId::LENGTH`] characters.
    #[error("record id must be exactly {expected} characters (got {got})")]
    BadLength {
        /// Required length.
        expected: usize,
        /// Length of the rejected input.
        got: usize,
    },
    /// The input contains a character outside the id alphabet.
    #[error("record id contains an invalid character")]
    BadCharacter,
}

/// A 21-character URL-safe random identifier.
///
/// Entity ids and token ids share this format. It doubles as a filesystem
/// key for tokens, so the alphabet is restricted to file-name-safe
/// characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Length of every record id.
    pub const LENGTH: usize = 21;

    /// Generate a new random id.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..Self::LENGTH)
            .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
            .collect();
        Self(id)
    }

    /// Parse a `RecordId` from a string, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`RecordIdError`] if the input is not exactly 21 characters
    /// from the id alphabet.
    pub fn parse(s: &str) -> Result<Self, RecordIdError> {
        let s = s.trim();
        if s.len() != Self::LENGTH {
            return Err(RecordIdError::BadLength {
                expected: Self::LENGTH,
                got: s.len(),
            });
        }
        if !s.bytes().all(|b| ALPHABET.contains(&b)) {
            return Err(RecordIdError::BadCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = RecordIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
