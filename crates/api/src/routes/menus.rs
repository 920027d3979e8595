//! Menu item routes. Items are keyed by name, so a name is unique across
//! the menu and renaming through PUT is rejected.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde_json::{Map, Value};

use pizzapp_core::{Email, RecordId, hashed_key};

use crate::envelope::Envelope;
use crate::error::{Failure, Result};
use crate::models::{MenuItem, User};
use crate::pipeline::{Pipeline, StepFuture, state_missing};
use crate::schema;
use crate::state::AppState;
use crate::store::Collection;
use crate::validate;

use super::{
    Params, email_header, forbid_fields, has_flag, number_field, only_fields, parse_object,
    required_param, string_field, token_header, verify_token,
};

// POST /menus

struct CreateCtx {
    state: AppState,
    input: Map<String, Value>,
    item: Option<MenuItem>,
}

fn create_pipeline() -> Pipeline<CreateCtx> {
    Pipeline::new("menus.create")
        .step("validate-input", cr_validate_input)
        .step("name-free", cr_name_free)
        .step("build-item", cr_build_item)
        .step("check-shape", cr_check_shape)
        .step("persist", cr_persist)
}

fn cr_validate_input(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        string_field(&ctx.input, "name")?;
        number_field(&ctx.input, "price")?;
        number_field(&ctx.input, "amount")?;
        string_field(&ctx.input, "description")?;
        Ok(())
    })
}

fn cr_name_free(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let name = string_field(&ctx.input, "name")?;
        ctx.state.store().ensure_absent(Collection::Menus, &name).await
    })
}

fn cr_build_item(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        ctx.item = Some(MenuItem::new(
            string_field(&ctx.input, "name")?,
            number_field(&ctx.input, "price")?,
            number_field(&ctx.input, "amount")?,
            string_field(&ctx.input, "description")?,
        ));
        Ok(())
    })
}

fn cr_check_shape(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let item = ctx.item.as_ref().ok_or_else(|| state_missing("menu item"))?;
        schema::check_menu_item(item)
    })
}

fn cr_persist(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let item = ctx.item.as_ref().ok_or_else(|| state_missing("menu item"))?;
        ctx.state
            .store()
            .create(Collection::Menus, &item.name, item)
            .await
    })
}

/// POST `/menus` with `{name, price, amount, description}`.
pub async fn create(State(state): State<AppState>, body: String) -> Result<Envelope> {
    let input = parse_object(&body)?;
    let mut ctx = CreateCtx {
        state,
        input,
        item: None,
    };
    create_pipeline().run(&mut ctx).await?;
    let item = ctx.item.ok_or_else(|| state_missing("menu item"))?;
    Ok(Envelope::created(
        "Menu item created",
        serde_json::to_value(item)?,
    ))
}

// GET /menus

struct ReadCtx {
    state: AppState,
    name: String,
    item: Option<MenuItem>,
}

fn read_pipeline() -> Pipeline<ReadCtx> {
    Pipeline::new("menus.read")
        .step("read-item", rd_read_item)
        .step("check-shape", rd_check_shape)
}

fn rd_read_item(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        ctx.item = Some(ctx.state.store().read(Collection::Menus, &ctx.name).await?);
        Ok(())
    })
}

fn rd_check_shape(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let item = ctx.item.as_ref().ok_or_else(|| state_missing("menu item"))?;
        schema::check_menu_item(item)
    })
}

/// GET `/menus?id=<name>` for one item, GET `/menus?all` for the whole
/// menu.
pub async fn read(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Envelope> {
    if has_flag(&params, "all") {
        let items = state.store().read_all(Collection::Menus).await?;
        return Ok(Envelope::ok("Full menu", Value::Array(items)));
    }

    let name = required_param(&params, "id")?.to_owned();
    let mut ctx = ReadCtx {
        state,
        name,
        item: None,
    };
    read_pipeline().run(&mut ctx).await?;
    let item = ctx.item.ok_or_else(|| state_missing("menu item"))?;
    Ok(Envelope::ok("Menu item", serde_json::to_value(item)?))
}

// PUT /menus

struct UpdateCtx {
    state: AppState,
    name: String,
    email: Email,
    token_id: RecordId,
    input: Map<String, Value>,
    user: Option<User>,
    current: Option<Map<String, Value>>,
    merged: Option<Map<String, Value>>,
}

fn update_pipeline() -> Pipeline<UpdateCtx> {
    Pipeline::new("menus.update")
        .step("reject-rename", up_reject_rename)
        .step("guard-fields", up_guard_fields)
        .step("item-exists", up_item_exists)
        .step("read-user", up_read_user)
        .step("verify-token", up_verify_token)
        .step("token-is-current", up_token_is_current)
        .step("read-item", up_read_item)
        .step("merge-changes", up_merge_changes)
        .step("persist", up_persist)
}

fn up_reject_rename(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move { forbid_fields(&ctx.input, &["id", "name", "shoppingCartsList"]) })
}

fn up_guard_fields(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        only_fields(&ctx.input, &["price", "amount", "description"])?;
        if ctx.input.contains_key("price") {
            number_field(&ctx.input, "price")?;
        }
        if ctx.input.contains_key("amount") {
            number_field(&ctx.input, "amount")?;
        }
        if ctx.input.contains_key("description") {
            string_field(&ctx.input, "description")?;
        }
        Ok(())
    })
}

fn up_item_exists(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move { ctx.state.store().ensure_exists(Collection::Menus, &ctx.name).await })
}

fn up_read_user(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.user = Some(ctx.state.store().read(Collection::Users, &key).await?);
        Ok(())
    })
}

fn up_verify_token(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        verify_token(ctx.state.store(), &ctx.token_id, &ctx.email).await?;
        Ok(())
    })
}

fn up_token_is_current(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let user = ctx.user.as_ref().ok_or_else(|| state_missing("user"))?;
        if user.token == ctx.token_id.as_str() {
            Ok(())
        } else {
            Err(Failure::InvalidOrExpiredToken)
        }
    })
}

fn up_read_item(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        ctx.current = Some(ctx.state.store().read(Collection::Menus, &ctx.name).await?);
        Ok(())
    })
}

fn up_merge_changes(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let current = ctx.current.as_ref().ok_or_else(|| state_missing("menu item"))?;
        let mut incoming = Map::new();
        for key in current.keys() {
            let value = match key.as_str() {
                "id" | "name" | "shoppingCartsList" => Value::Bool(false),
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
        let merged = ctx.merged.as_ref().ok_or_else(|| state_missing("merged item"))?;
        ctx.state
            .store()
            .update(Collection::Menus, &ctx.name, merged)
            .await
    })
}

/// PUT `/menus?id=<name>` with `email`/`token` headers and a body subset
/// of `{price, amount, description}`.
pub async fn update(
    State(state): State<AppState>,
    Query(params): Query<Params>,
    headers: HeaderMap,
    body: String,
) -> Result<Envelope> {
    let name = required_param(&params, "id")?.to_owned();
    let email = email_header(&headers)?;
    let token_id = token_header(&headers)?;
    let input = parse_object(&body)?;

    let mut ctx = UpdateCtx {
        state,
        name,
        email,
        token_id,
        input,
        user: None,
        current: None,
        merged: None,
    };
    update_pipeline().run(&mut ctx).await?;
    let merged = ctx.merged.ok_or_else(|| state_missing("merged item"))?;
    Ok(Envelope::created("Menu item updated", Value::Object(merged)))
}

// DELETE /menus

struct RemoveCtx {
    state: AppState,
    name: String,
    item: Option<MenuItem>,
}

fn remove_pipeline() -> Pipeline<RemoveCtx> {
    Pipeline::new("menus.remove")
        .step("read-item", rm_read_item)
        .step("delete", rm_delete)
}

fn rm_read_item(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        ctx.item = Some(ctx.state.store().read(Collection::Menus, &ctx.name).await?);
        Ok(())
    })
}

fn rm_delete(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move { ctx.state.store().delete(Collection::Menus, &ctx.name).await })
}

/// DELETE `/menus?id=<name>`.
pub async fn remove(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Envelope> {
    let name = required_param(&params, "id")?.to_owned();
    let mut ctx = RemoveCtx {
        state,
        name,
        item: None,
    };
    remove_pipeline().run(&mut ctx).await?;
    let item = ctx.item.ok_or_else(|| state_missing("menu item"))?;
    Ok(Envelope::ok("Menu item deleted", serde_json::to_value(item)?))
}
