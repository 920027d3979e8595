//! Uniform response envelope.
//!
//! Every handler answers with `{statusCode, message, data, contentType}`,
//! success and failure alike. The body carries the status code as well so
//! clients chaining requests can gate on it without inspecting transport
//! headers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};

/// The response body shared by every endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub status_code: u16,
    pub message: String,
    pub data: Value,
    pub content_type: &'static str,
}

impl Envelope {
    fn new(status: StatusCode, message: impl Into<String>, data: Value) -> Self {
        Self {
            status_code: status.as_u16(),
            message: message.into(),
            data,
            content_type: "json",
        }
    }

    /// 200 envelope.
    #[must_use]
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self::new(StatusCode::OK, message, data)
    }

    /// 201 envelope.
    #[must_use]
    pub fn created(message: impl Into<String>, data: Value) -> Self {
        Self::new(StatusCode::CREATED, message, data)
    }

    /// Failure envelope with an empty data object.
    #[must_use]
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, message, json!({}))
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
