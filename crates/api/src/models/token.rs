//! Access token document.

use serde::{Deserialize, Serialize};

use pizzapp_core::{Email, RecordId, now_ms};

/// Token lifetime: 24 hours, in milliseconds.
pub const TOKEN_TTL_MS: i64 = 1000 * 60 * 60 * 24;

/// An access token, keyed by its own id in the `tokens` collection. A user
/// holds at most one active token; creating a new one deletes the previous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: RecordId,
    pub email: Email,
    /// Expiry as epoch milliseconds.
    pub expires: i64,
}

impl Token {
    /// Mint a fresh token for `email`, expiring one TTL from now.
    #[must_use]
    pub fn issue(email: Email) -> Self {
        Self {
            id: RecordId::generate(),
            email,
            expires: now_ms() + TOKEN_TTL_MS,
        }
    }

    /// Push the expiry one TTL from now, but only if the token is still
    /// live. An already-expired token keeps its old expiry.
    pub fn extend(&mut self) {
        if self.expires > now_ms() {
            self.expires = now_ms() + TOKEN_TTL_MS;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn issue_expires_in_the_future() {
        let token = Token::issue(Email::parse("a@b.com").unwrap());
        assert!(token.expires > now_ms());
    }

    #[test]
    fn extend_ignores_expired_tokens() {
        let mut token = Token::issue(Email::parse("a@b.com").unwrap());
        token.expires = now_ms() - 1000;
        let frozen = token.expires;
        token.extend();
        assert_eq!(token.expires, frozen);
    }

    #[test]
    fn extend_pushes_live_expiry() {
        let mut token = Token::issue(Email::parse("a@b.com").unwrap());
        token.expires = now_ms() + 1000;
        token.extend();
        assert!(token.expires > now_ms() + TOKEN_TTL_MS - 5000);
    }
}
