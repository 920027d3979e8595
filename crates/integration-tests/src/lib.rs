//! In-process test harness for the PizzApp API.
//!
//! Builds the real router over a temporary data directory and drives it
//! with `tower::ServiceExt::oneshot`, so every test exercises the full
//! request path (dispatch table, pipelines, record store) without binding
//! a socket. No payment or email provider is configured; checkout runs
//! with the side effects skipped.

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use pizzapp_api::config::Config;
use pizzapp_api::routes;
use pizzapp_api::state::AppState;

/// A fully wired application over a throwaway data directory.
pub struct TestApp {
    router: Router,
    state: AppState,
    // Held so the data directory outlives the test.
    _data_dir: TempDir,
}

impl TestApp {
    /// Build the app with an empty record store.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory or the store cannot be created.
    pub async fn spawn() -> Self {
        let data_dir = TempDir::new().expect("create temp data dir");
        let state = AppState::new(Config::for_tests(data_dir.path()));
        state.store().bootstrap().await.expect("bootstrap store");
        let router = routes::router().with_state(state.clone());
        Self {
            router,
            state,
            _data_dir: data_dir,
        }
    }

    /// Direct access to the shared state, for seeding or inspecting
    /// records behind the API's back.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Send one request; returns the HTTP status and the decoded envelope.
    /// Responses without a JSON body (axum's own 405, for one) decode to
    /// `Value::Null`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };
        let request = builder.body(body).expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible service");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let envelope = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, envelope)
    }

    pub async fn get(&self, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
        self.request(Method::GET, uri, headers, None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.request(Method::POST, uri, headers, body).await
    }

    pub async fn put(
        &self,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, headers, body).await
    }

    pub async fn delete(&self, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, headers, None).await
    }
}
