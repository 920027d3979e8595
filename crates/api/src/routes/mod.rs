//! HTTP surface: the dispatch table and the per-entity route modules.
//!
//! Every routable `(path, verb)` pair is declared once in [`ROUTES`];
//! [`router`] materializes the axum router from that table at startup, so
//! the table and the mounted surface cannot drift apart. Anything outside
//! the table answers with a fixed 404 envelope.

use std::collections::HashMap;

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{MethodRouter, get};
use serde_json::{Map, Value};

use pizzapp_core::{Email, RecordId};

use crate::envelope::Envelope;
use crate::error::{Failure, Result};
use crate::models::Token;
use crate::state::AppState;
use crate::store::{Collection, RecordStore};
use crate::validate;

pub mod carts;
pub mod menus;
pub mod orders;
pub mod tokens;
pub mod users;

/// HTTP verbs the dispatch table can route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Delete,
    Get,
    Post,
    Put,
}

/// The full routable surface: one entry per path, listing its verbs.
pub const ROUTES: &[(&str, &[Verb])] = &[
    ("carts", &[Verb::Delete, Verb::Get, Verb::Post, Verb::Put]),
    ("menus", &[Verb::Delete, Verb::Get, Verb::Post, Verb::Put]),
    ("orders", &[Verb::Delete, Verb::Get, Verb::Post]),
    ("tokens", &[Verb::Delete, Verb::Get, Verb::Post, Verb::Put]),
    ("users", &[Verb::Delete, Verb::Get, Verb::Post, Verb::Put]),
];

/// Build the application router from the dispatch table.
///
/// # Panics
///
/// Panics at startup if [`ROUTES`] names a `(path, verb)` pair with no
/// handler, keeping the table and the handlers in lockstep.
#[must_use]
pub fn router() -> Router<AppState> {
    let mut router = Router::new().route("/ping", get(ping));
    for (path, verbs) in ROUTES {
        let mut methods = MethodRouter::new();
        for verb in *verbs {
            methods = attach(path, *verb, methods);
        }
        router = router.route(&format!("/{path}"), methods);
    }
    router.fallback(not_found)
}

fn attach(path: &str, verb: Verb, router: MethodRouter<AppState>) -> MethodRouter<AppState> {
    match (path, verb) {
        ("carts", Verb::Delete) => router.delete(carts::remove),
        ("carts", Verb::Get) => router.get(carts::read),
        ("carts", Verb::Post) => router.post(carts::create),
        ("carts", Verb::Put) => router.put(carts::update),
        ("menus", Verb::Delete) => router.delete(menus::remove),
        ("menus", Verb::Get) => router.get(menus::read),
        ("menus", Verb::Post) => router.post(menus::create),
        ("menus", Verb::Put) => router.put(menus::update),
        ("orders", Verb::Delete) => router.delete(orders::remove),
        ("orders", Verb::Get) => router.get(orders::read),
        ("orders", Verb::Post) => router.post(orders::create),
        ("tokens", Verb::Delete) => router.delete(tokens::remove),
        ("tokens", Verb::Get) => router.get(tokens::read),
        ("tokens", Verb::Post) => router.post(tokens::create),
        ("tokens", Verb::Put) => router.put(tokens::update),
        ("users", Verb::Delete) => router.delete(users::remove),
        ("users", Verb::Get) => router.get(users::read),
        ("users", Verb::Post) => router.post(users::create),
        ("users", Verb::Put) => router.put(users::update),
        (path, verb) => panic!("no handler for declared route {path} {verb:?}"),
    }
}

async fn ping() -> Envelope {
    Envelope::ok("pong", Value::Object(Map::new()))
}

async fn not_found() -> Envelope {
    Envelope::failure(StatusCode::NOT_FOUND, "Not found")
}

/// Query string decoded as a flat key/value map. Bare flags (`?all`,
/// `?accept`) decode to an empty-string value.
pub(crate) type Params = HashMap<String, String>;

pub(crate) fn has_flag(params: &Params, key: &str) -> bool {
    params.contains_key(key)
}

pub(crate) fn required_param<'a>(params: &'a Params, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| validate::valid_string(v))
        .ok_or_else(|| Failure::MissingOrInvalidFields(format!("missing query parameter: {key}")))
}

/// The `id` query parameter interpreted as the owning email.
pub(crate) fn email_param(params: &Params) -> Result<Email> {
    let raw = required_param(params, "id")?;
    Email::parse(raw)
        .map_err(|_| Failure::MissingOrInvalidFields("id is not a valid email".to_owned()))
}

/// The `id` query parameter interpreted as a token id.
pub(crate) fn token_id_param(params: &Params) -> Result<RecordId> {
    let raw = required_param(params, "id")?;
    RecordId::parse(raw)
        .map_err(|_| Failure::MissingOrInvalidFields("id is not a valid token id".to_owned()))
}

/// The `email` request header.
pub(crate) fn email_header(headers: &HeaderMap) -> Result<Email> {
    headers
        .get("email")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Email::parse(v).ok())
        .ok_or_else(|| Failure::MissingOrInvalidFields("missing or invalid email header".to_owned()))
}

/// The `token` request header. A malformed id is treated the same as a
/// missing or expired token.
pub(crate) fn token_header(headers: &HeaderMap) -> Result<RecordId> {
    headers
        .get("token")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| RecordId::parse(v).ok())
        .ok_or(Failure::InvalidOrExpiredToken)
}

/// Parse a request body into a JSON object.
pub(crate) fn parse_object(body: &str) -> Result<Map<String, Value>> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .ok_or_else(|| Failure::MissingOrInvalidFields("body is not a JSON object".to_owned()))
}

/// A required non-blank string field of a JSON object.
pub(crate) fn string_field(input: &Map<String, Value>, key: &str) -> Result<String> {
    input
        .get(key)
        .and_then(Value::as_str)
        .filter(|v| validate::valid_string(v))
        .map(str::to_owned)
        .ok_or_else(|| Failure::MissingOrInvalidFields(format!("missing or invalid field: {key}")))
}

/// A required finite non-negative number field of a JSON object.
pub(crate) fn number_field(input: &Map<String, Value>, key: &str) -> Result<f64> {
    input
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| validate::valid_number(*v))
        .ok_or_else(|| Failure::MissingOrInvalidFields(format!("missing or invalid field: {key}")))
}

/// A required boolean field of a JSON object.
pub(crate) fn bool_field(input: &Map<String, Value>, key: &str) -> Result<bool> {
    input
        .get(key)
        .and_then(Value::as_bool)
        .ok_or_else(|| Failure::MissingOrInvalidFields(format!("missing or invalid field: {key}")))
}

/// Reject a body that names any of the given immutable fields.
pub(crate) fn forbid_fields(input: &Map<String, Value>, keys: &[&str]) -> Result<()> {
    for key in keys {
        if input.contains_key(*key) {
            return Err(Failure::MissingOrInvalidFields(format!(
                "field cannot be changed: {key}"
            )));
        }
    }
    Ok(())
}

/// Reject a body with fields outside the updatable set.
pub(crate) fn only_fields(input: &Map<String, Value>, keys: &[&str]) -> Result<()> {
    for key in input.keys() {
        if !keys.contains(&key.as_str()) {
            return Err(Failure::MissingOrInvalidFields(format!(
                "unknown field: {key}"
            )));
        }
    }
    Ok(())
}

/// Shared token verification: the token record exists, belongs to `email`,
/// and has not expired. Any miss collapses to `InvalidOrExpiredToken`.
pub(crate) async fn verify_token(
    store: &RecordStore,
    token_id: &RecordId,
    email: &Email,
) -> Result<Token> {
    let token: Token = store
        .read(Collection::Tokens, token_id.as_str())
        .await
        .map_err(|failure| match failure {
            Failure::NotFound(_) => Failure::InvalidOrExpiredToken,
            other => other,
        })?;
    validate::token_not_expired(&token, email)?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_entity_path() {
        let paths: Vec<&str> = ROUTES.iter().map(|(path, _)| *path).collect();
        assert_eq!(paths, vec!["carts", "menus", "orders", "tokens", "users"]);
    }

    #[test]
    fn orders_have_no_update_verb() {
        let (_, verbs) = ROUTES
            .iter()
            .find(|(path, _)| *path == "orders")
            .expect("orders entry");
        assert!(!verbs.contains(&Verb::Put));
        assert_eq!(verbs.len(), 3);
    }

    #[test]
    fn every_declared_route_has_a_handler() {
        // attach panics on a table entry without a handler
        let _ = router();
    }

    #[test]
    fn body_must_be_a_json_object() {
        assert!(parse_object(r#"{"a": 1}"#).is_ok());
        assert!(parse_object("[1, 2]").is_err());
        assert!(parse_object("not json").is_err());
    }

    #[test]
    fn field_helpers_validate_content() {
        let input = parse_object(r#"{"name": "  ", "price": -1, "ok": "x", "n": 2.5}"#)
            .expect("parse");
        assert!(string_field(&input, "name").is_err());
        assert!(string_field(&input, "missing").is_err());
        assert!(string_field(&input, "ok").is_ok());
        assert!(number_field(&input, "price").is_err());
        assert!((number_field(&input, "n").expect("n") - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn forbid_and_only_fields() {
        let input = parse_object(r#"{"price": 2, "name": "x"}"#).expect("parse");
        assert!(forbid_fields(&input, &["name"]).is_err());
        assert!(forbid_fields(&input, &["id"]).is_ok());
        assert!(only_fields(&input, &["price", "name"]).is_ok());
        assert!(only_fields(&input, &["price"]).is_err());
    }
}
