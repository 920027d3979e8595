//! Account and token lifecycle through the HTTP surface.

use axum::http::StatusCode;
use serde_json::json;

use pizzapp_core::{Email, hashed_key};

use pizzapp_api::models::{TOKEN_TTL_MS, Token, User};
use pizzapp_api::store::Collection;
use pizzapp_integration_tests::TestApp;

const ALICE: &str = "alice@example.com";

async fn sign_up(app: &TestApp) {
    let (status, _) = app
        .post(
            "/users",
            &[],
            Some(json!({
                "email": ALICE,
                "address": "1 Pizza Way",
                "name": "Alice",
                "password": "hunter2",
                "tosAgreement": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn log_in(app: &TestApp) -> String {
    let (status, envelope) = app.post(&format!("/tokens?id={ALICE}"), &[], None).await;
    assert_eq!(status, StatusCode::CREATED);
    envelope["data"]["id"]
        .as_str()
        .expect("token id in envelope")
        .to_owned()
}

#[tokio::test]
async fn signup_never_echoes_the_password() {
    let app = TestApp::spawn().await;
    let (status, envelope) = app
        .post(
            "/users",
            &[],
            Some(json!({
                "email": ALICE,
                "address": "1 Pizza Way",
                "name": "Alice",
                "password": "hunter2",
                "tosAgreement": true
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(envelope["statusCode"], json!(201));
    assert!(envelope["data"].get("password").is_none());
    assert_eq!(envelope["data"]["email"], ALICE);

    // The stored record has a digest, not the plain password.
    let email = Email::parse(ALICE).expect("valid email");
    let stored: User = app
        .state()
        .store()
        .read(Collection::Users, &hashed_key(&email))
        .await
        .expect("user persisted");
    assert_ne!(stored.password, "hunter2");
    assert!(!stored.password.is_empty());
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let app = TestApp::spawn().await;
    sign_up(&app).await;

    let (status, _) = app
        .post(
            "/users",
            &[],
            Some(json!({
                "email": ALICE,
                "address": "2 Calzone Court",
                "name": "Alice Again",
                "password": "hunter3",
                "tosAgreement": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn reading_a_user_requires_a_live_token() {
    let app = TestApp::spawn().await;
    sign_up(&app).await;

    let (status, _) = app
        .get(&format!("/users?id={ALICE}"), &[("token", "AAAAAAAAAAAAAAAAAAAAA")])
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = log_in(&app).await;
    let (status, envelope) = app
        .get(&format!("/users?id={ALICE}"), &[("token", &token)])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(envelope["data"].get("password").is_none());
}

#[tokio::test]
async fn expired_token_is_rejected_everywhere() {
    let app = TestApp::spawn().await;
    sign_up(&app).await;
    let token_id = log_in(&app).await;

    // Age the token past its lifetime behind the API's back.
    let mut token: Token = app
        .state()
        .store()
        .read(Collection::Tokens, &token_id)
        .await
        .expect("token persisted");
    token.expires -= 2 * TOKEN_TTL_MS;
    app.state()
        .store()
        .update(Collection::Tokens, &token_id, &token)
        .await
        .expect("age token");

    let (status, _) = app
        .get(&format!("/users?id={ALICE}"), &[("token", &token_id)])
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn second_login_retires_the_first_token() {
    let app = TestApp::spawn().await;
    sign_up(&app).await;
    let first = log_in(&app).await;
    let second = log_in(&app).await;

    let (status, _) = app.get(&format!("/tokens?id={first}"), &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, envelope) = app.get(&format!("/tokens?id={second}"), &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["data"]["email"], ALICE);
}

#[tokio::test]
async fn token_extend_pushes_the_expiry() {
    let app = TestApp::spawn().await;
    sign_up(&app).await;
    let token_id = log_in(&app).await;

    let before: Token = app
        .state()
        .store()
        .read(Collection::Tokens, &token_id)
        .await
        .expect("token persisted");

    let (status, _) = app
        .put("/tokens", &[], Some(json!({"id": token_id, "extend": true})))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let after: Token = app
        .state()
        .store()
        .read(Collection::Tokens, &token_id)
        .await
        .expect("token persisted");
    assert!(after.expires >= before.expires);
}

#[tokio::test]
async fn logout_clears_the_forward_link_and_token_file() {
    let app = TestApp::spawn().await;
    sign_up(&app).await;
    let token_id = log_in(&app).await;

    let (status, _) = app.delete(&format!("/tokens?id={token_id}"), &[]).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.get(&format!("/tokens?id={token_id}"), &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let email = Email::parse(ALICE).expect("valid email");
    let stored: User = app
        .state()
        .store()
        .read(Collection::Users, &hashed_key(&email))
        .await
        .expect("user persisted");
    assert!(stored.token.is_empty());
}

#[tokio::test]
async fn user_update_merges_and_strips_password() {
    let app = TestApp::spawn().await;
    sign_up(&app).await;
    let token = log_in(&app).await;

    let (status, envelope) = app
        .put(
            &format!("/users?id={ALICE}"),
            &[("token", &token)],
            Some(json!({"address": "2 Calzone Court"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(envelope["data"]["address"], "2 Calzone Court");
    assert_eq!(envelope["data"]["name"], "Alice");
    assert!(envelope["data"].get("password").is_none());

    // Writing back the same value is a no-change error.
    let (status, _) = app
        .put(
            &format!("/users?id={ALICE}"),
            &[("token", &token)],
            Some(json!({"address": "2 Calzone Court"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_email_is_immutable() {
    let app = TestApp::spawn().await;
    sign_up(&app).await;
    let token = log_in(&app).await;

    let (status, _) = app
        .put(
            &format!("/users?id={ALICE}"),
            &[("token", &token)],
            Some(json!({"email": "bob@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
