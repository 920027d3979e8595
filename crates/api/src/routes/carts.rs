//! Shopping cart routes. One cart per user, keyed by the hashed owner
//! email; the cart total always equals the sum of its line totals.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde_json::{Map, Value};

use pizzapp_core::{Email, RecordId, hashed_key};

use crate::envelope::Envelope;
use crate::error::{Failure, Result};
use crate::models::{Cart, CartItem, MenuItem, User};
use crate::pipeline::{Pipeline, StepFuture, state_missing};
use crate::schema;
use crate::state::AppState;
use crate::store::Collection;
use crate::validate;

use super::{
    Params, email_header, email_param, has_flag, number_field, parse_object, required_param,
    string_field, token_header, verify_token,
};

// POST /carts?create

struct CreateCtx {
    state: AppState,
    email: Email,
    cart: Option<Cart>,
}

fn create_pipeline() -> Pipeline<CreateCtx> {
    Pipeline::new("carts.create")
        .step("cart-free", cr_cart_free)
        .step("build-cart", cr_build_cart)
        .step("check-shape", cr_check_shape)
        .step("persist", cr_persist)
}

fn cr_cart_free(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.state.store().ensure_absent(Collection::Carts, &key).await
    })
}

fn cr_build_cart(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        ctx.cart = Some(Cart::empty());
        Ok(())
    })
}

fn cr_check_shape(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let cart = ctx.cart.as_ref().ok_or_else(|| state_missing("cart"))?;
        schema::check_cart(cart)
    })
}

fn cr_persist(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let cart = ctx.cart.as_ref().ok_or_else(|| state_missing("cart"))?;
        let key = hashed_key(&ctx.email);
        ctx.state.store().create(Collection::Carts, &key, cart).await
    })
}

// POST /carts?item=<name>&amount=<n>

struct AddItemCtx {
    state: AppState,
    email: Email,
    token_id: RecordId,
    item_name: String,
    amount: f64,
    cart: Option<Cart>,
    user: Option<User>,
    menu_item: Option<MenuItem>,
}

fn add_item_pipeline() -> Pipeline<AddItemCtx> {
    Pipeline::new("carts.add-item")
        .step("read-cart", ad_read_cart)
        .step("verify-token", ad_verify_token)
        .step("read-user", ad_read_user)
        .step("token-is-current", ad_token_is_current)
        .step("line-absent", ad_line_absent)
        .step("read-menu-item", ad_read_menu_item)
        .step("build-line", ad_build_line)
        .step("persist", ad_persist)
}

fn ad_read_cart(ctx: &mut AddItemCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.cart = Some(ctx.state.store().read(Collection::Carts, &key).await?);
        Ok(())
    })
}

fn ad_verify_token(ctx: &mut AddItemCtx) -> StepFuture<'_> {
    Box::pin(async move {
        verify_token(ctx.state.store(), &ctx.token_id, &ctx.email).await?;
        Ok(())
    })
}

fn ad_read_user(ctx: &mut AddItemCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.user = Some(ctx.state.store().read(Collection::Users, &key).await?);
        Ok(())
    })
}

fn ad_token_is_current(ctx: &mut AddItemCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let user = ctx.user.as_ref().ok_or_else(|| state_missing("user"))?;
        if user.token == ctx.token_id.as_str() {
            Ok(())
        } else {
            Err(Failure::InvalidOrExpiredToken)
        }
    })
}

fn ad_line_absent(ctx: &mut AddItemCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let cart = ctx.cart.as_ref().ok_or_else(|| state_missing("cart"))?;
        let names: Vec<&str> = cart.items.iter().map(|line| line.name.as_str()).collect();
        validate::value_not_in_array(&ctx.item_name.as_str(), &names)
    })
}

fn ad_read_menu_item(ctx: &mut AddItemCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let item: MenuItem = ctx
            .state
            .store()
            .read(Collection::Menus, &ctx.item_name)
            .await?;
        schema::check_menu_item(&item)?;
        ctx.menu_item = Some(item);
        Ok(())
    })
}

fn ad_build_line(ctx: &mut AddItemCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let item = ctx.menu_item.as_ref().ok_or_else(|| state_missing("menu item"))?;
        let line = CartItem {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price,
            amount: ctx.amount,
            total_item: item.price * ctx.amount,
        };
        schema::check_cart_item(&line)?;
        let cart = ctx.cart.as_mut().ok_or_else(|| state_missing("cart"))?;
        cart.push_line(line);
        Ok(())
    })
}

fn ad_persist(ctx: &mut AddItemCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let cart = ctx.cart.clone().ok_or_else(|| state_missing("cart"))?;
        let key = hashed_key(&ctx.email);
        ctx.state.store().update(Collection::Carts, &key, &cart).await
    })
}

/// POST `/carts` with `email`/`token` headers. `?create` makes an empty
/// cart; `?item=<name>&amount=<n>` adds a menu item to the existing cart.
/// A malformed amount is rejected before any file is touched.
pub async fn create(
    State(state): State<AppState>,
    Query(params): Query<Params>,
    headers: HeaderMap,
) -> Result<Envelope> {
    let email = email_header(&headers)?;

    if has_flag(&params, "create") {
        let mut ctx = CreateCtx {
            state,
            email,
            cart: None,
        };
        create_pipeline().run(&mut ctx).await?;
        let cart = ctx.cart.ok_or_else(|| state_missing("cart"))?;
        return Ok(Envelope::created("Cart created", serde_json::to_value(cart)?));
    }

    if has_flag(&params, "item") {
        let token_id = token_header(&headers)?;
        let item_name = required_param(&params, "item")?.to_owned();
        let amount = required_param(&params, "amount")?
            .parse::<f64>()
            .ok()
            .filter(|v| validate::valid_number(*v))
            .ok_or_else(|| {
                Failure::MissingOrInvalidFields("missing query parameter: amount".to_owned())
            })?;

        let mut ctx = AddItemCtx {
            state,
            email,
            token_id,
            item_name,
            amount,
            cart: None,
            user: None,
            menu_item: None,
        };
        add_item_pipeline().run(&mut ctx).await?;
        let cart = ctx.cart.ok_or_else(|| state_missing("cart"))?;
        return Ok(Envelope::created("Item added", serde_json::to_value(cart)?));
    }

    Err(Failure::MissingOrInvalidFields(
        "expected create or item query parameter".to_owned(),
    ))
}

// GET /carts

struct ReadCtx {
    state: AppState,
    email: Email,
    token_id: RecordId,
    cart: Option<Cart>,
}

fn read_pipeline() -> Pipeline<ReadCtx> {
    Pipeline::new("carts.read")
        .step("read-user", rd_read_user)
        .step("verify-token", rd_verify_token)
        .step("read-cart", rd_read_cart)
}

fn rd_read_user(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        let _: User = ctx.state.store().read(Collection::Users, &key).await?;
        Ok(())
    })
}

fn rd_verify_token(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        verify_token(ctx.state.store(), &ctx.token_id, &ctx.email).await?;
        Ok(())
    })
}

fn rd_read_cart(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.cart = Some(ctx.state.store().read(Collection::Carts, &key).await?);
        Ok(())
    })
}

/// GET `/carts?id=<email>` with a `token` header.
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
        cart: None,
    };
    read_pipeline().run(&mut ctx).await?;
    let cart = ctx.cart.ok_or_else(|| state_missing("cart"))?;
    Ok(Envelope::ok("Cart", serde_json::to_value(cart)?))
}

// PUT /carts

struct UpdateCtx {
    state: AppState,
    email: Email,
    token_id: RecordId,
    item_name: String,
    amount: f64,
    cart: Option<Cart>,
}

fn update_pipeline() -> Pipeline<UpdateCtx> {
    Pipeline::new("carts.update")
        .step("read-user", up_read_user)
        .step("verify-token", up_verify_token)
        .step("read-cart", up_read_cart)
        .step("line-present", up_line_present)
        .step("retotal-line", up_retotal_line)
        .step("persist", up_persist)
}

fn up_read_user(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        let _: User = ctx.state.store().read(Collection::Users, &key).await?;
        Ok(())
    })
}

fn up_verify_token(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        verify_token(ctx.state.store(), &ctx.token_id, &ctx.email).await?;
        Ok(())
    })
}

fn up_read_cart(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.cart = Some(ctx.state.store().read(Collection::Carts, &key).await?);
        Ok(())
    })
}

fn up_line_present(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let cart = ctx.cart.as_ref().ok_or_else(|| state_missing("cart"))?;
        let names: Vec<&str> = cart.items.iter().map(|line| line.name.as_str()).collect();
        validate::value_in_array(&ctx.item_name.as_str(), &names)
    })
}

fn up_retotal_line(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let name = ctx.item_name.clone();
        let amount = ctx.amount;
        let cart = ctx.cart.as_mut().ok_or_else(|| state_missing("cart"))?;
        if cart.retotal_line(&name, amount) {
            Ok(())
        } else {
            Err(Failure::NotFound(name))
        }
    })
}

fn up_persist(ctx: &mut UpdateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let cart = ctx.cart.clone().ok_or_else(|| state_missing("cart"))?;
        let key = hashed_key(&ctx.email);
        ctx.state.store().update(Collection::Carts, &key, &cart).await
    })
}

/// PUT `/carts?id=<email>` with a `token` header and body
/// `{name, amount}`: change the quantity of an existing line.
pub async fn update(
    State(state): State<AppState>,
    Query(params): Query<Params>,
    headers: HeaderMap,
    body: String,
) -> Result<Envelope> {
    let email = email_param(&params)?;
    let token_id = token_header(&headers)?;
    let input = parse_object(&body)?;
    let item_name = string_field(&input, "name")?;
    let amount = number_field(&input, "amount")?;

    let mut ctx = UpdateCtx {
        state,
        email,
        token_id,
        item_name,
        amount,
        cart: None,
    };
    update_pipeline().run(&mut ctx).await?;
    let cart = ctx.cart.ok_or_else(|| state_missing("cart"))?;
    Ok(Envelope::created("Cart updated", serde_json::to_value(cart)?))
}

// DELETE /carts

struct RemoveCtx {
    state: AppState,
    email: Email,
    token_id: RecordId,
}

fn remove_pipeline() -> Pipeline<RemoveCtx> {
    Pipeline::new("carts.remove")
        .step("read-user", rm_read_user)
        .step("verify-token", rm_verify_token)
        .step("delete-cart", rm_delete_cart)
}

fn rm_read_user(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        let _: User = ctx.state.store().read(Collection::Users, &key).await?;
        Ok(())
    })
}

fn rm_verify_token(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        verify_token(ctx.state.store(), &ctx.token_id, &ctx.email).await?;
        Ok(())
    })
}

fn rm_delete_cart(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.state.store().delete(Collection::Carts, &key).await
    })
}

/// DELETE `/carts?id=<email>` with a `token` header.
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
    };
    remove_pipeline().run(&mut ctx).await?;
    Ok(Envelope::ok("Cart deleted", Value::Object(Map::new())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use tempfile::TempDir;

    use pizzapp_core::keyed_digest;

    use crate::config::Config;
    use crate::models::Token;

    use super::*;

    async fn test_state(dir: &TempDir) -> AppState {
        let state = AppState::new(Config::for_tests(dir.path()));
        state.store().bootstrap().await.unwrap();
        state
    }

    struct Fixture {
        state: AppState,
        email: Email,
        token_id: RecordId,
    }

    async fn logged_in(dir: &TempDir) -> Fixture {
        let state = test_state(dir).await;
        let email = Email::parse("alice@example.com").unwrap();
        let token = Token::issue(email.clone());
        let user = User {
            id: RecordId::generate(),
            email: email.clone(),
            address: "1 Pizza Way".into(),
            name: "Alice".into(),
            password: keyed_digest("secret", "hunter2"),
            token: token.id.as_str().to_owned(),
            tos_agreement: true,
        };
        state
            .store()
            .create(Collection::Users, &hashed_key(&email), &user)
            .await
            .unwrap();
        state
            .store()
            .create(Collection::Tokens, token.id.as_str(), &token)
            .await
            .unwrap();
        Fixture {
            state,
            email,
            token_id: token.id,
        }
    }

    async fn seeded_menu_item(state: &AppState, name: &str, price: f64) {
        let item = MenuItem::new(name.into(), price, 50.0, "test item".into());
        state
            .store()
            .create(Collection::Menus, name, &item)
            .await
            .unwrap();
    }

    async fn empty_cart(fixture: &Fixture) -> Cart {
        let mut ctx = CreateCtx {
            state: fixture.state.clone(),
            email: fixture.email.clone(),
            cart: None,
        };
        create_pipeline().run(&mut ctx).await.unwrap();
        ctx.cart.unwrap()
    }

    async fn add_item(fixture: &Fixture, name: &str, amount: f64) -> Result<Cart> {
        let mut ctx = AddItemCtx {
            state: fixture.state.clone(),
            email: fixture.email.clone(),
            token_id: fixture.token_id.clone(),
            item_name: name.into(),
            amount,
            cart: None,
            user: None,
            menu_item: None,
        };
        add_item_pipeline().run(&mut ctx).await?;
        Ok(ctx.cart.unwrap())
    }

    #[tokio::test]
    async fn add_item_snapshots_price_and_totals() {
        let dir = TempDir::new().unwrap();
        let fixture = logged_in(&dir).await;
        seeded_menu_item(&fixture.state, "margherita", 10.0).await;
        empty_cart(&fixture).await;

        let cart = add_item(&fixture, "margherita", 2.0).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].total_item, 20.0);
        assert_eq!(cart.total, 20.0);
        assert_eq!(cart.total, cart.line_total_sum());
    }

    #[tokio::test]
    async fn add_same_item_twice_conflicts() {
        let dir = TempDir::new().unwrap();
        let fixture = logged_in(&dir).await;
        seeded_menu_item(&fixture.state, "margherita", 10.0).await;
        empty_cart(&fixture).await;

        add_item(&fixture, "margherita", 2.0).await.unwrap();
        let err = add_item(&fixture, "margherita", 1.0).await.unwrap_err();
        assert!(matches!(err, Failure::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn stale_token_cannot_add_items() {
        let dir = TempDir::new().unwrap();
        let fixture = logged_in(&dir).await;
        seeded_menu_item(&fixture.state, "margherita", 10.0).await;
        empty_cart(&fixture).await;

        // A live token record that the user no longer points at.
        let stale = Token::issue(fixture.email.clone());
        fixture
            .state
            .store()
            .create(Collection::Tokens, stale.id.as_str(), &stale)
            .await
            .unwrap();

        let mut ctx = AddItemCtx {
            state: fixture.state.clone(),
            email: fixture.email.clone(),
            token_id: stale.id,
            item_name: "margherita".into(),
            amount: 1.0,
            cart: None,
            user: None,
            menu_item: None,
        };
        let err = add_item_pipeline().run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, Failure::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn second_cart_for_same_user_conflicts() {
        let dir = TempDir::new().unwrap();
        let fixture = logged_in(&dir).await;
        empty_cart(&fixture).await;

        let mut ctx = CreateCtx {
            state: fixture.state.clone(),
            email: fixture.email.clone(),
            cart: None,
        };
        let err = create_pipeline().run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, Failure::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn update_retotals_line_and_cart() {
        let dir = TempDir::new().unwrap();
        let fixture = logged_in(&dir).await;
        seeded_menu_item(&fixture.state, "margherita", 10.0).await;
        empty_cart(&fixture).await;
        add_item(&fixture, "margherita", 2.0).await.unwrap();

        let mut ctx = UpdateCtx {
            state: fixture.state.clone(),
            email: fixture.email.clone(),
            token_id: fixture.token_id.clone(),
            item_name: "margherita".into(),
            amount: 3.0,
            cart: None,
        };
        update_pipeline().run(&mut ctx).await.unwrap();

        let stored: Cart = fixture
            .state
            .store()
            .read(Collection::Carts, &hashed_key(&fixture.email))
            .await
            .unwrap();
        assert_eq!(stored.total, 30.0);
        assert_eq!(stored.total, stored.line_total_sum());
    }

    #[tokio::test]
    async fn update_unknown_line_is_not_found() {
        let dir = TempDir::new().unwrap();
        let fixture = logged_in(&dir).await;
        empty_cart(&fixture).await;

        let mut ctx = UpdateCtx {
            state: fixture.state.clone(),
            email: fixture.email.clone(),
            token_id: fixture.token_id.clone(),
            item_name: "hawaiian".into(),
            amount: 1.0,
            cart: None,
        };
        let err = update_pipeline().run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, Failure::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_deletes_the_cart_file() {
        let dir = TempDir::new().unwrap();
        let fixture = logged_in(&dir).await;
        empty_cart(&fixture).await;

        let mut ctx = RemoveCtx {
            state: fixture.state.clone(),
            email: fixture.email.clone(),
            token_id: fixture.token_id.clone(),
        };
        remove_pipeline().run(&mut ctx).await.unwrap();

        assert!(
            !fixture
                .state
                .store()
                .exists(Collection::Carts, &hashed_key(&fixture.email))
                .await
        );
    }
}
