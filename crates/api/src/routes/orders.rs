//! Order routes. An order is a snapshot of the owner's cart, keyed like
//! the cart by the hashed email, and immutable once written (there is no
//! PUT route).
//!
//! Billing is opt-in through the client-supplied `accept` query flag:
//! without it the order persists with placeholder payment fields and no
//! provider is contacted. That gate is part of the preserved contract,
//! questionable as it is.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde_json::{Map, Value};

use pizzapp_core::{Email, RecordId, hashed_key};

use crate::envelope::Envelope;
use crate::error::{Failure, Result};
use crate::models::{Cart, Order, User};
use crate::pipeline::{Pipeline, StepFuture, state_missing};
use crate::schema;
use crate::state::AppState;
use crate::store::Collection;

use super::{Params, email_param, has_flag, token_header, verify_token};

// POST /orders

struct CreateCtx {
    state: AppState,
    email: Email,
    token_id: RecordId,
    accepted: bool,
    user: Option<User>,
    cart: Option<Cart>,
    order: Option<Order>,
}

fn create_pipeline() -> Pipeline<CreateCtx> {
    Pipeline::new("orders.create")
        .step("read-user", cr_read_user)
        .step("verify-token", cr_verify_token)
        .step("read-cart", cr_read_cart)
        .step("build-order", cr_build_order)
        .step("charge-card", cr_charge_card)
        .step("send-receipt", cr_send_receipt)
        .step("check-shape", cr_check_shape)
        .step("persist", cr_persist)
}

fn cr_read_user(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.user = Some(ctx.state.store().read(Collection::Users, &key).await?);
        Ok(())
    })
}

fn cr_verify_token(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        verify_token(ctx.state.store(), &ctx.token_id, &ctx.email).await?;
        Ok(())
    })
}

fn cr_read_cart(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.cart = Some(ctx.state.store().read(Collection::Carts, &key).await?);
        Ok(())
    })
}

fn cr_build_order(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let cart = ctx.cart.as_ref().ok_or_else(|| state_missing("cart"))?;
        let user = ctx.user.as_ref().ok_or_else(|| state_missing("user"))?;
        ctx.order = Some(Order::from_cart(cart, user, ctx.accepted));
        Ok(())
    })
}

fn cr_charge_card(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        if !ctx.accepted {
            return Ok(());
        }
        let Some(payment) = ctx.state.payment().cloned() else {
            tracing::warn!("order accepted but no payment provider is configured");
            return Ok(());
        };
        let user = ctx.user.as_ref().ok_or_else(|| state_missing("user"))?;
        let email = user.email.to_string();
        let order = ctx.order.as_mut().ok_or_else(|| state_missing("order"))?;

        let customer_id = payment.create_customer(&email).await?;
        payment.attach_source(&customer_id).await?;
        let description = format!("PizzApp order {}", order.id);
        let charge = payment
            .charge(&customer_id, order.total, &order.currency, &description)
            .await?;

        order.country = charge.source.country;
        order.payment_method = charge.source.brand;
        order.last4 = charge.source.last4.parse().unwrap_or(0);
        order.payment_object = Some(charge.source.object);
        Ok(())
    })
}

fn cr_send_receipt(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        if !ctx.accepted {
            return Ok(());
        }
        let Some(email) = ctx.state.email().cloned() else {
            tracing::warn!("order accepted but no email provider is configured");
            return Ok(());
        };
        let order = ctx.order.as_ref().ok_or_else(|| state_missing("order"))?;
        email.send_receipt(order).await
    })
}

fn cr_check_shape(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let order = ctx.order.as_ref().ok_or_else(|| state_missing("order"))?;
        schema::check_order(order)
    })
}

fn cr_persist(ctx: &mut CreateCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let order = ctx.order.as_ref().ok_or_else(|| state_missing("order"))?;
        let key = hashed_key(&ctx.email);
        ctx.state.store().create(Collection::Orders, &key, order).await
    })
}

/// POST `/orders?id=<email>[&accept]` with a `token` header. `accept`
/// opts into the charge and the receipt email; without it both side
/// effects are skipped and the placeholder payment fields persist.
pub async fn create(
    State(state): State<AppState>,
    Query(params): Query<Params>,
    headers: HeaderMap,
) -> Result<Envelope> {
    let email = email_param(&params)?;
    let token_id = token_header(&headers)?;
    let accepted = has_flag(&params, "accept");

    let mut ctx = CreateCtx {
        state,
        email,
        token_id,
        accepted,
        user: None,
        cart: None,
        order: None,
    };
    create_pipeline().run(&mut ctx).await?;
    let order = ctx.order.ok_or_else(|| state_missing("order"))?;
    Ok(Envelope::created("Order created", serde_json::to_value(order)?))
}

// GET /orders

struct ReadCtx {
    state: AppState,
    email: Email,
    token_id: RecordId,
    order: Option<Order>,
}

fn read_pipeline() -> Pipeline<ReadCtx> {
    Pipeline::new("orders.read")
        .step("user-exists", rd_user_exists)
        .step("verify-token", rd_verify_token)
        .step("cart-exists", rd_cart_exists)
        .step("read-order", rd_read_order)
}

fn rd_user_exists(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.state.store().ensure_exists(Collection::Users, &key).await
    })
}

fn rd_verify_token(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        verify_token(ctx.state.store(), &ctx.token_id, &ctx.email).await?;
        Ok(())
    })
}

fn rd_cart_exists(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.state.store().ensure_exists(Collection::Carts, &key).await
    })
}

fn rd_read_order(ctx: &mut ReadCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.order = Some(ctx.state.store().read(Collection::Orders, &key).await?);
        Ok(())
    })
}

/// GET `/orders?id=<email>` with a `token` header.
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
        order: None,
    };
    read_pipeline().run(&mut ctx).await?;
    let order = ctx.order.ok_or_else(|| state_missing("order"))?;
    Ok(Envelope::ok("Order", serde_json::to_value(order)?))
}

// DELETE /orders

struct RemoveCtx {
    state: AppState,
    email: Email,
    token_id: RecordId,
    user: Option<User>,
}

fn remove_pipeline() -> Pipeline<RemoveCtx> {
    Pipeline::new("orders.remove")
        .step("read-user", rm_read_user)
        .step("verify-token", rm_verify_token)
        .step("token-is-current", rm_token_is_current)
        .step("cart-exists", rm_cart_exists)
        .step("order-exists", rm_order_exists)
        .step("delete-order", rm_delete_order)
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

fn rm_token_is_current(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let user = ctx.user.as_ref().ok_or_else(|| state_missing("user"))?;
        if user.token == ctx.token_id.as_str() {
            Ok(())
        } else {
            Err(Failure::InvalidOrExpiredToken)
        }
    })
}

fn rm_cart_exists(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.state.store().ensure_exists(Collection::Carts, &key).await
    })
}

fn rm_order_exists(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.state.store().ensure_exists(Collection::Orders, &key).await
    })
}

fn rm_delete_order(ctx: &mut RemoveCtx) -> StepFuture<'_> {
    Box::pin(async move {
        let key = hashed_key(&ctx.email);
        ctx.state.store().delete(Collection::Orders, &key).await
    })
}

/// DELETE `/orders?id=<email>` with a `token` header.
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
    Ok(Envelope::created("Order deleted", Value::Object(Map::new())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use tempfile::TempDir;

    use pizzapp_core::keyed_digest;

    use crate::config::Config;
    use crate::models::{CartItem, Token};

    use super::*;

    struct Fixture {
        state: AppState,
        email: Email,
        token_id: RecordId,
    }

    async fn checkout_ready(dir: &TempDir) -> Fixture {
        let state = AppState::new(Config::for_tests(dir.path()));
        state.store().bootstrap().await.unwrap();

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
        let mut cart = Cart::empty();
        cart.push_line(CartItem {
            id: RecordId::generate(),
            name: "margherita".into(),
            price: 10.0,
            amount: 2.0,
            total_item: 20.0,
        });

        let key = hashed_key(&email);
        state.store().create(Collection::Users, &key, &user).await.unwrap();
        state
            .store()
            .create(Collection::Tokens, token.id.as_str(), &token)
            .await
            .unwrap();
        state.store().create(Collection::Carts, &key, &cart).await.unwrap();

        Fixture {
            state,
            email,
            token_id: token.id,
        }
    }

    async fn place_order(fixture: &Fixture, accepted: bool) -> Result<Order> {
        let mut ctx = CreateCtx {
            state: fixture.state.clone(),
            email: fixture.email.clone(),
            token_id: fixture.token_id.clone(),
            accepted,
            user: None,
            cart: None,
            order: None,
        };
        create_pipeline().run(&mut ctx).await?;
        Ok(ctx.order.unwrap())
    }

    #[tokio::test]
    async fn unaccepted_order_persists_placeholders() {
        let dir = TempDir::new().unwrap();
        let fixture = checkout_ready(&dir).await;

        let order = place_order(&fixture, false).await.unwrap();

        assert_eq!(order.customer, "testName");
        assert_eq!(order.email, "test@email.com");
        assert_eq!(order.last4, 0);
        assert_eq!(order.payment_method, "XX");
        assert_eq!(order.total, 20.0);

        let stored: Order = fixture
            .state
            .store()
            .read(Collection::Orders, &hashed_key(&fixture.email))
            .await
            .unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn accepted_order_uses_user_identity_without_providers() {
        let dir = TempDir::new().unwrap();
        let fixture = checkout_ready(&dir).await;

        let order = place_order(&fixture, true).await.unwrap();

        assert_eq!(order.customer, "Alice");
        assert_eq!(order.email, "alice@example.com");
        // No provider configured, so the payment fields keep their
        // placeholders.
        assert_eq!(order.last4, 0);
        assert_eq!(order.payment_method, "XX");
    }

    #[tokio::test]
    async fn second_order_for_same_user_conflicts() {
        let dir = TempDir::new().unwrap();
        let fixture = checkout_ready(&dir).await;

        place_order(&fixture, false).await.unwrap();
        let err = place_order(&fixture, false).await.unwrap_err();
        assert!(matches!(err, Failure::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn order_without_cart_is_not_found() {
        let dir = TempDir::new().unwrap();
        let fixture = checkout_ready(&dir).await;
        fixture
            .state
            .store()
            .delete(Collection::Carts, &hashed_key(&fixture.email))
            .await
            .unwrap();

        let err = place_order(&fixture, false).await.unwrap_err();
        assert!(matches!(err, Failure::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_requires_current_token() {
        let dir = TempDir::new().unwrap();
        let fixture = checkout_ready(&dir).await;
        place_order(&fixture, false).await.unwrap();

        let stale = Token::issue(fixture.email.clone());
        fixture
            .state
            .store()
            .create(Collection::Tokens, stale.id.as_str(), &stale)
            .await
            .unwrap();

        let mut ctx = RemoveCtx {
            state: fixture.state.clone(),
            email: fixture.email.clone(),
            token_id: stale.id,
            user: None,
        };
        let err = remove_pipeline().run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, Failure::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn remove_deletes_the_order_file() {
        let dir = TempDir::new().unwrap();
        let fixture = checkout_ready(&dir).await;
        place_order(&fixture, false).await.unwrap();

        let mut ctx = RemoveCtx {
            state: fixture.state.clone(),
            email: fixture.email.clone(),
            token_id: fixture.token_id.clone(),
            user: None,
        };
        remove_pipeline().run(&mut ctx).await.unwrap();

        assert!(
            !fixture
                .state
                .store()
                .exists(Collection::Orders, &hashed_key(&fixture.email))
                .await
        );
    }
}
