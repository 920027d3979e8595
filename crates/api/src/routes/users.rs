//! User account routes. Accounts are keyed by the hashed email, which is
//! why the email is immutable once the account exists.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use secrecy::ExposeSecret;
use serde_json::{Map, Value};

use pizzapp_core::{Email, RecordId, hashed_key, keyed_digest};

use crate::envelope::Envelope;
use crate::error::{Failure, Result};
use crate::models::{User, strip_password};
use crate::pipeline::{Pipeline, StepFuture, state_missing};
use crate::schema;
use crate::state::AppState;
use crate::store::Collection;
use crate::validate;

use super::{
    Params, bool_field, email_param, forbid_fields, only_fields, parse_object, string_field,
    token_header, verify_token,
};

// POST /users

struct CreateCtx {
    state: AppState,
    input: Map<String, Value>,
    email: Option<Email>,
    user: Option<User>,
}

fn create_pipeline() -> Pipeline<CreateCtx> {
    Pipeline::new("users.create")
        .step("validate-input", cr_validate_input)
        .step("email-free", cr_email_free)
        .step("build-user", cr_build_user)
        .step("persist", cr_persist)
}

fn cr_validate_input(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let email = string_field(&ctx.input, "email")?;
        let email = Email::parse(&email)
            .map_err(|_| Failure::MissingOrInvalidFields("missing or invalid field: email".to_owned()))?;
        string_field(&ctx.input, "address")?;
        string_field(&ctx.input, "name")?;
        string_field(&ctx.input, "password")?;
        if !bool_field(&ctx.input, "tosAgreement")? {
            return Err(Failure::MissingOrInvalidFields(
                "tosAgreement must be accepted".to_owned(),
            ));
        }
        ctx.email = Some(email);
        Ok(())
    })
}

fn cr_email_free(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let email = ctx.email.as_ref().ok_or_else(|| state_missing("email"))?;
        let key = hashed_key(email);
        ctx.state.store().ensure_absent(Collection::Users, &key).await
    })
}

fn cr_build_user(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let email = ctx.email.clone().ok_or_else(|| state_missing("email"))?;
        let secret = ctx.state.config().hashing_secret.expose_secret().to_owned();
        ctx.user = Some(User {
            id: RecordId::generate(),
            email,
            address: string_field(&ctx.input, "address")?,
            name: string_field(&ctx.input, "name")?,
            password: keyed_digest(&secret, &string_field(&ctx.input, "password")?),
            token: String::new(),
            tos_agreement: true,
        });
        Ok(())
    })
}

fn cr_persist(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let user = ctx.user.as_ref().ok_or_else(|| state_missing("user"))?;
        let key = hashed_key(&user.email);
        ctx.state.store().create(Collection::Users, &key, user).await
    })
}

/// POST `/users` with `{email, address, name, password, tosAgreement}`.
pub async fn create(State(state): State<AppState>, body: String) -> Result<Envelope> {
    let input = parse_object(&body)?;
    let mut ctx = CreateCtx {
        state,
        input,
        email: None,
        user: None,
    };
    create_pipeline().run(&mut ctx).await?;
    let user = ctx.user.ok_or_else(|| state_missing("user"))?;
    Ok(Envelope::created("User created", user.sanitized()?))
}

// GET /users

struct ReadCtx {
    state: AppState,
    email: Email,
    token_id: RecordId,
    user: Option<User>,
}

fn read_pipeline() -> Pipeline<ReadCtx> {
    Pipeline::new("users.read")
        .step("verify-token", rd_verify_token)
        .step("read-user", rd_read_user)
        .step("check-shape", rd_check_shape)
}

fn rd_verify_token(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        verify_token(ctx.state.store(), &ctx.token_id, &ctx.email).await?;
        Ok(())
    })
}

fn rd_read_user(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.user = Some(ctx.state.store().read(Collection::Users, &key).await?);
        Ok(())
    })
}

fn rd_check_shape(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let user = ctx.user.as_ref().ok_or_else(|| state_missing("user"))?;
        schema::check_user(user)
    })
}

/// GET `/users?id=<email>` with a `token` header.
pub async fn read(
    State(state): State<AppState>,
    Query(params): Query<Params>,
    headers: HeaderMap,
) -> Result<Envelope> {
    let email = email_param(&params)?;
    let token_id = token_header(&headers)?;
    let mut ctx = ReadCtx {
        state,
        email,
        token_id,
        user: None,
    };
    read_pipeline().run(&mut ctx).await?;
    let user = ctx.user.ok_or_else(|| state_missing("user"))?;
    Ok(Envelope::ok("User", user.sanitized()?))
}

// PUT /users

struct UpdateCtx {
    state: AppState,
    email: Email,
    token_id: RecordId,
    input: Map<String, Value>,
    current: Option<Map<String, Value>>,
    merged: Option<Map<String, Value>>,
}

fn update_pipeline() -> Pipeline<UpdateCtx> {
    Pipeline::new("users.update")
        .step("reject-immutable", up_reject_immutable)
        .step("guard-fields", up_guard_fields)
        .step("user-exists", up_user_exists)
        .step("verify-token", up_verify_token)
        .step("read-user", up_read_user)
        .step("merge-changes", up_merge_changes)
        .step("persist", up_persist)
}

fn up_reject_immutable(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move { forbid_fields(&ctx.input, &["id", "email", "token"]) })
}

fn up_guard_fields(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        only_fields(&ctx.input, &["address", "name", "password", "tosAgreement"])?;
        if ctx.input.contains_key("address") {
            string_field(&ctx.input, "address")?;
        }
        if ctx.input.contains_key("name") {
            string_field(&ctx.input, "name")?;
        }
        if ctx.input.contains_key("password") {
            string_field(&ctx.input, "password")?;
        }
        if ctx.input.contains_key("tosAgreement") {
            bool_field(&ctx.input, "tosAgreement")?;
        }
        Ok(())
    })
}

fn up_user_exists(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.state.store().ensure_exists(Collection::Users, &key).await
    })
}

fn up_verify_token(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        verify_token(ctx.state.store(), &ctx.token_id, &ctx.email).await?;
        Ok(())
    })
}

fn up_read_user(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.current = Some(ctx.state.store().read(Collection::Users, &key).await?);
        Ok(())
    })
}

fn up_merge_changes(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let current = ctx.current.as_ref().ok_or_else(|| state_missing("user"))?;
        let secret = ctx.state.config().hashing_secret.expose_secret().to_owned();

        let mut incoming = Map::new();
        for key in current.keys() {
            let value = match key.as_str() {
                "id" | "email" | "token" => Value::Bool(false),
                "password" => match string_field(&ctx.input, "password") {
                    Ok(plain) => Value::String(keyed_digest(&secret, &plain)),
                    Err(_) => Value::Bool(false),
                },
                _ => ctx.input.get(key).cloned().unwrap_or(Value::Bool(false)),
            };
            incoming.insert(key.clone(), value);
        }
        ctx.merged = Some(validate::merge_changes(current, &incoming)?);
        Ok(())
    })
}

fn up_persist(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let merged = ctx.merged.as_ref().ok_or_else(|| state_missing("merged user"))?;
        let key = hashed_key(&ctx.email);
        ctx.state.store().update(Collection::Users, &key, merged).await
    })
}

/// PUT `/users?id=<email>` with a `token` header and a body subset of
/// `{address, name, password, tosAgreement}`. An incoming `tosAgreement:
/// false` cannot be distinguished from an absent field because `false` is
/// the not-updatable sentinel in the merge.
pub async fn update(
    State(state): State<AppState>,
    Query(params): Query<Params>,
    headers: HeaderMap,
    body: String,
) -> Result<Envelope> {
    let email = email_param(&params)?;
    let token_id = token_header(&headers)?;
    let input = parse_object(&body)?;
    let mut ctx = UpdateCtx {
        state,
        email,
        token_id,
        input,
        current: None,
        merged: None,
    };
    update_pipeline().run(&mut ctx).await?;
    let merged = ctx.merged.ok_or_else(|| state_missing("merged user"))?;
    let mut value = Value::Object(merged);
    strip_password(&mut value);
    Ok(Envelope::created("User updated", value))
}

// DELETE /users

struct RemoveCtx {
    state: AppState,
    email: Email,
    token_id: RecordId,
    user: Option<User>,
}

fn remove_pipeline() -> Pipeline<RemoveCtx> {
    Pipeline::new("users.remove")
        .step("read-user", rm_read_user)
        .step("verify-token", rm_verify_token)
        .step("delete-user", rm_delete_user)
        .step("delete-token", rm_delete_token)
}

fn rm_read_user(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.user = Some(ctx.state.store().read(Collection::Users, &key).await?);
        Ok(())
    })
}

fn rm_verify_token(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        verify_token(ctx.state.store(), &ctx.token_id, &ctx.email).await?;
        Ok(())
    })
}

fn rm_delete_user(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.state.store().delete(Collection::Users, &key).await
    })
}

fn rm_delete_token(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        ctx.state
            .store()
            .delete(Collection::Tokens, ctx.token_id.as_str())
            .await
    })
}

/// DELETE `/users?id=<email>` with a `token` header. Removes the account
/// and its token; the cart (if any) stays behind.
pub async fn remove(
    State(state): State<AppState>,
    Query(params): Query<Params>,
    headers: HeaderMap,
) -> Result<Envelope> {
    let email = email_param(&params)?;
    let token_id = token_header(&headers)?;
    let mut ctx = RemoveCtx {
        state,
        email,
        token_id,
        user: None,
    };
    remove_pipeline().run(&mut ctx).await?;
    Ok(Envelope::created("User deleted", Value::Object(Map::new())))
}
