//! Unified failure type for the validation-and-persistence pipelines.
//!
//! Every pipeline step fails with a [`Failure`]; the chain converts the
//! first failure into exactly one user-facing `{statusCode, message}` pair.
//! Inner detail (I/O faults, provider bodies) is logged, never returned to
//! the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::envelope::Envelope;

/// Terminal failure of a pipeline step.
#[derive(Debug, Error)]
pub enum Failure {
    /// A record (file) the chain depends on is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A create targeted a key that already holds a record.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A document failed its entity schema check.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Token missing, not owned by the given email, or past its expiry.
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    /// Request-level input validation failed before the pipeline ran.
    #[error("missing or invalid fields: {0}")]
    MissingOrInvalidFields(String),

    /// An update merge produced zero changed fields.
    #[error("no fields changed")]
    NoChange,

    /// Payment or email provider call failed.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Filesystem or serialization fault inside the record store.
    #[error("storage error: {0}")]
    Storage(String),
}

impl Failure {
    /// HTTP status for the response envelope.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::InvalidShape(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
            Self::MissingOrInvalidFields(_) | Self::NoChange => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal detail stays in the logs.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Storage(_) => "Internal storage error".to_owned(),
            Self::Upstream(_) => "External service error".to_owned(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        match &self {
            Self::Storage(_) | Self::Upstream(_) => {
                tracing::error!(error = %self, "request failed");
            }
            _ => tracing::debug!(error = %self, "request rejected"),
        }

        Envelope::failure(self.status(), self.client_message()).into_response()
    }
}

/// Result alias used throughout the pipelines.
pub type Result<T> = std::result::Result<T, Failure>;
