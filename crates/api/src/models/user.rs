//! User account document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use pizzapp_core::{Email, RecordId};

/// A user account. Keyed by the hashed email in the `users` collection; the
/// email is immutable after creation because every owned document (cart,
/// order) is keyed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub email: Email,
    pub address: String,
    pub name: String,
    /// Keyed digest, never the plain password.
    pub password: String,
    /// Id of the single active token, or empty when logged out.
    pub token: String,
    pub tos_agreement: bool,
}

impl User {
    /// Serialized copy with the secret `password` field stripped, for
    /// echoing back to clients.
    ///
    /// # Errors
    ///
    /// Propagates the serialization error (practically unreachable).
    pub fn sanitized(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(doc) = value.as_object_mut() {
            doc.remove("password");
        }
        Ok(value)
    }
}

/// Strip the password field from an already-serialized user document.
pub(crate) fn strip_password(value: &mut Value) {
    if let Some(doc) = value.as_object_mut() {
        doc.remove("password");
    }
}
