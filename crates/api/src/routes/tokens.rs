//! Access token routes. A user holds at most one active token; issuing a
//! new one retires the previous and the user record carries a forward
//! link (`user.token`) to the active id.

use axum::extract::{Query, State};
use serde_json::{Map, Value, json};

use pizzapp_core::{Email, RecordId, display_timestamp, hashed_key};

use crate::envelope::Envelope;
use crate::error::{Failure, Result};
use crate::models::{Token, User};
use crate::pipeline::{Pipeline, StepFuture, state_missing};
use crate::schema;
use crate::state::AppState;
use crate::store::Collection;

use super::{Params, bool_field, email_param, parse_object, string_field, token_id_param};

/// Token document as echoed to clients: the expiry is formatted for
/// display instead of raw epoch milliseconds.
fn token_payload(token: &Token) -> Value {
    json!({
        "id": token.id,
        "email": token.email,
        "expires": display_timestamp(token.expires),
    })
}

// POST /tokens

struct CreateCtx {
    state: AppState,
    email: Email,
    user: Option<User>,
    token: Option<Token>,
}

fn create_pipeline() -> Pipeline<CreateCtx> {
    Pipeline::new("tokens.create")
        .step("read-user", cr_read_user)
        .step("mint-token", cr_mint_token)
        .step("check-shape", cr_check_shape)
        .step("persist-token", cr_persist_token)
        .step("retire-previous", cr_retire_previous)
        .step("link-user", cr_link_user)
}

fn cr_read_user(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.user = Some(ctx.state.store().read(Collection::Users, &key).await?);
        Ok(())
    })
}

fn cr_mint_token(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        ctx.token = Some(Token::issue(ctx.email.clone()));
        Ok(())
    })
}

fn cr_check_shape(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let token = ctx.token.as_ref().ok_or_else(|| state_missing("token"))?;
        schema::check_token(token)
    })
}

fn cr_persist_token(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let token = ctx.token.as_ref().ok_or_else(|| state_missing("token"))?;
        ctx.state
            .store()
            .create(Collection::Tokens, token.id.as_str(), token)
            .await
    })
}

fn cr_retire_previous(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let user = ctx.user.as_ref().ok_or_else(|| state_missing("user"))?;
        if user.token.is_empty() {
            return Ok(());
        }
        // A stale forward link (token file already gone) is not an error.
        match ctx.state.store().delete(Collection::Tokens, &user.token).await {
            Ok(()) | Err(Failure::NotFound(_)) => Ok(()),
            Err(other) => Err(other),
        }
    })
}

fn cr_link_user(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let token_id = ctx
            .token
            .as_ref()
            .map(|t| t.id.as_str().to_owned())
            .ok_or_else(|| state_missing("token"))?;
        let user = ctx.user.as_mut().ok_or_else(|| state_missing("user"))?;
        user.token = token_id;
        let key = hashed_key(&user.email);
        let user = user.clone();
        ctx.state.store().update(Collection::Users, &key, &user).await
    })
}

/// POST `/tokens?id=<email>`: log the user in.
pub async fn create(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Envelope> {
    let email = email_param(&params)?;
    let mut ctx = CreateCtx {
        state,
        email,
        user: None,
        token: None,
    };
    create_pipeline().run(&mut ctx).await?;
    let token = ctx.token.ok_or_else(|| state_missing("token"))?;
    Ok(Envelope::created("Token created", token_payload(&token)))
}

// GET /tokens

struct ReadCtx {
    state: AppState,
    token_id: RecordId,
    token: Option<Token>,
}

fn read_pipeline() -> Pipeline<ReadCtx> {
    Pipeline::new("tokens.read")
        .step("read-token", rd_read_token)
        .step("check-shape", rd_check_shape)
}

fn rd_read_token(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        ctx.token = Some(
            ctx.state
                .store()
                .read(Collection::Tokens, ctx.token_id.as_str())
                .await?,
        );
        Ok(())
    })
}

fn rd_check_shape(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let token = ctx.token.as_ref().ok_or_else(|| state_missing("token"))?;
        schema::check_token(token)
    })
}

/// GET `/tokens?id=<tokenId>`.
pub async fn read(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Envelope> {
    let token_id = token_id_param(&params)?;
    let mut ctx = ReadCtx {
        state,
        token_id,
        token: None,
    };
    read_pipeline().run(&mut ctx).await?;
    let token = ctx.token.ok_or_else(|| state_missing("token"))?;
    Ok(Envelope::ok("Token", token_payload(&token)))
}

// PUT /tokens

struct UpdateCtx {
    state: AppState,
    token_id: RecordId,
    token: Option<Token>,
}

fn update_pipeline() -> Pipeline<UpdateCtx> {
    Pipeline::new("tokens.update")
        .step("read-token", up_read_token)
        .step("extend", up_extend)
        .step("check-shape", up_check_shape)
        .step("persist", up_persist)
}

fn up_read_token(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        ctx.token = Some(
            ctx.state
                .store()
                .read(Collection::Tokens, ctx.token_id.as_str())
                .await?,
        );
        Ok(())
    })
}

fn up_extend(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let token = ctx.token.as_mut().ok_or_else(|| state_missing("token"))?;
        // No-op on an already-expired token; the stale expiry is written
        // back unchanged.
        token.extend();
        Ok(())
    })
}

fn up_check_shape(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let token = ctx.token.as_ref().ok_or_else(|| state_missing("token"))?;
        schema::check_token(token)
    })
}

fn up_persist(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let token = ctx.token.clone().ok_or_else(|| state_missing("token"))?;
        ctx.state
            .store()
            .update(Collection::Tokens, token.id.as_str(), &token)
            .await
    })
}

/// PUT `/tokens` with `{id, extend: true}`: push a live token's expiry
/// another lifetime out.
pub async fn update(State(state): State<AppState>, body: String) -> Result<Envelope> {
    let input = parse_object(&body)?;
    let raw_id = string_field(&input, "id")?;
    let token_id = RecordId::parse(&raw_id)
        .map_err(|_| Failure::MissingOrInvalidFields("id is not a valid token id".to_owned()))?;
    if !bool_field(&input, "extend")? {
        return Err(Failure::MissingOrInvalidFields(
            "extend must be true".to_owned(),
        ));
    }

    let mut ctx = UpdateCtx {
        state,
        token_id,
        token: None,
    };
    update_pipeline().run(&mut ctx).await?;
    let token = ctx.token.ok_or_else(|| state_missing("token"))?;
    Ok(Envelope::created("Token extended", token_payload(&token)))
}

// DELETE /tokens

struct RemoveCtx {
    state: AppState,
    token_id: RecordId,
    token: Option<Token>,
    user: Option<User>,
}

fn remove_pipeline() -> Pipeline<RemoveCtx> {
    Pipeline::new("tokens.remove")
        .step("read-token", rm_read_token)
        .step("read-owner", rm_read_owner)
        .step("unlink-owner", rm_unlink_owner)
        .step("delete-token", rm_delete_token)
}

fn rm_read_token(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        ctx.token = Some(
            ctx.state
                .store()
                .read(Collection::Tokens, ctx.token_id.as_str())
                .await?,
        );
        Ok(())
    })
}

fn rm_read_owner(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let token = ctx.token.as_ref().ok_or_else(|| state_missing("token"))?;
        let key = hashed_key(&token.email);
        ctx.user = Some(ctx.state.store().read(Collection::Users, &key).await?);
        Ok(())
    })
}

fn rm_unlink_owner(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let token_id = ctx.token_id.as_str().to_owned();
        let user = ctx.user.as_mut().ok_or_else(|| state_missing("user"))?;
        if user.token != token_id {
            return Ok(());
        }
        user.token = String::new();
        let key = hashed_key(&user.email);
        let user = user.clone();
        ctx.state.store().update(Collection::Users, &key, &user).await
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

/// DELETE `/tokens?id=<tokenId>`: log out, clearing the owner's forward
/// link when it points at this token.
pub async fn remove(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Envelope> {
    let token_id = token_id_param(&params)?;
    let mut ctx = RemoveCtx {
        state,
        token_id,
        token: None,
        user: None,
    };
    remove_pipeline().run(&mut ctx).await?;
    Ok(Envelope::created("Token deleted", Value::Object(Map::new())))
}
