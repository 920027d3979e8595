//! Per-entity shape checks.
//!
//! Serde enforces field presence and JSON types at the boundary; these
//! checks add what the type system cannot: id lengths, non-empty strings,
//! non-negative finite numbers, email syntax. A failed check aborts the
//! pipeline with [`Failure::InvalidShape`].

use pizzapp_core::{Email, RecordId};

use crate::error::{Failure, Result};
use crate::models::{Cart, CartItem, MenuItem, Order, Token, User};
use crate::validate::{valid_number, valid_string};

fn require(ok: bool, what: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Failure::InvalidShape(what.to_owned()))
    }
}

fn require_id(id: &RecordId, what: &str) -> Result<()> {
    require(RecordId::parse(id.as_str()).is_ok(), what)
}

fn require_email(email: &Email, what: &str) -> Result<()> {
    require(Email::parse(email.as_str()).is_ok(), what)
}

/// Menu item: 21-char id, named, described, price and amount finite `>= 0`.
///
/// # Errors
///
/// [`Failure::InvalidShape`] naming the offending field.
pub fn check_menu_item(item: &MenuItem) -> Result<()> {
    require_id(&item.id, "item.id")?;
    require(valid_string(&item.name), "item.name")?;
    require(valid_number(item.price), "item.price")?;
    require(valid_number(item.amount), "item.amount")?;
    require(valid_string(&item.description), "item.description")
}

/// User: 21-char id, valid email, non-empty address/name/password digest.
/// The token field is either empty or a 21-char id.
///
/// # Errors
///
/// [`Failure::InvalidShape`] naming the offending field.
pub fn check_user(user: &User) -> Result<()> {
    require_id(&user.id, "user.id")?;
    require_email(&user.email, "user.email")?;
    require(valid_string(&user.address), "user.address")?;
    require(valid_string(&user.name), "user.name")?;
    require(valid_string(&user.password), "user.password")?;
    require(
        user.token.is_empty() || RecordId::parse(&user.token).is_ok(),
        "user.token",
    )
}

/// Token: 21-char id, valid email, positive expiry.
///
/// # Errors
///
/// [`Failure::InvalidShape`] naming the offending field.
pub fn check_token(token: &Token) -> Result<()> {
    require_id(&token.id, "token.id")?;
    require_email(&token.email, "token.email")?;
    require(token.expires > 0, "token.expires")
}

/// Cart line: references a 21-char item id, named, all quantities finite
/// `>= 0`.
///
/// # Errors
///
/// [`Failure::InvalidShape`] naming the offending field.
pub fn check_cart_item(line: &CartItem) -> Result<()> {
    require_id(&line.id, "cartItem.id")?;
    require(valid_string(&line.name), "cartItem.name")?;
    require(valid_number(line.price), "cartItem.price")?;
    require(valid_number(line.amount), "cartItem.amount")?;
    require(valid_number(line.total_item), "cartItem.totalItem")
}

/// Cart: 21-char id, non-negative finite total, every line well-shaped.
///
/// # Errors
///
/// [`Failure::InvalidShape`] naming the offending field.
pub fn check_cart(cart: &Cart) -> Result<()> {
    require_id(&cart.id, "cart.id")?;
    require(valid_number(cart.total), "cart.total")?;
    for line in &cart.items {
        check_cart_item(line)?;
    }
    Ok(())
}

/// Order: 21-char ids, non-empty descriptive fields, non-negative total,
/// every snapshotted line well-shaped.
///
/// # Errors
///
/// [`Failure::InvalidShape`] naming the offending field.
pub fn check_order(order: &Order) -> Result<()> {
    require_id(&order.id, "order.id")?;
    require(valid_string(&order.country), "order.country")?;
    require(valid_string(&order.customer), "order.customer")?;
    require(valid_string(&order.email), "order.email")?;
    require(valid_string(&order.currency), "order.currency")?;
    require(valid_number(order.total), "order.total")?;
    require(order.last4 >= 0, "order.last4")?;
    require(valid_string(&order.payment_method), "order.paymentMethod")?;
    require_id(&order.shopping_cart_id, "order.shoppingCartId")?;
    require(
        valid_string(&order.authorization_date),
        "order.authorizationDate",
    )?;
    for line in &order.items {
        check_cart_item(line)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn menu_item() -> MenuItem {
        MenuItem::new("margherita".into(), 9.5, 20.0, "classic".into())
    }

    #[test]
    fn well_formed_item_passes() {
        assert!(check_menu_item(&menu_item()).is_ok());
    }

    #[test]
    fn negative_price_is_invalid_shape() {
        let mut item = menu_item();
        item.price = -1.0;
        assert!(matches!(
            check_menu_item(&item).unwrap_err(),
            Failure::InvalidShape(field) if field == "item.price"
        ));
    }

    #[test]
    fn zero_price_is_accepted() {
        let mut item = menu_item();
        item.price = 0.0;
        assert!(check_menu_item(&item).is_ok());
    }

    #[test]
    fn short_id_is_invalid_shape() {
        // Deserialization does not length-check ids, the schema does.
        let raw = serde_json::json!({
            "id": "short",
            "name": "margherita",
            "price": 9.5,
            "amount": 20.0,
            "description": "classic",
            "shoppingCartsList": []
        });
        let item: MenuItem = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            check_menu_item(&item).unwrap_err(),
            Failure::InvalidShape(field) if field == "item.id"
        ));
    }

    #[test]
    fn user_token_may_be_empty_but_not_garbage() {
        let raw = serde_json::json!({
            "id": RecordId::generate(),
            "email": "alice@example.com",
            "address": "1 Pizza Way",
            "name": "Alice",
            "password": "digest",
            "token": "",
            "tosAgreement": true
        });
        let mut user: User = serde_json::from_value(raw).unwrap();
        assert!(check_user(&user).is_ok());

        user.token = "not-an-id".into();
        assert!(check_user(&user).is_err());

        user.token = RecordId::generate().to_string();
        assert!(check_user(&user).is_ok());
    }

    #[test]
    fn cart_checks_every_line() {
        let mut cart = Cart::empty();
        cart.push_line(CartItem {
            id: RecordId::generate(),
            name: "margherita".into(),
            price: 10.0,
            amount: 2.0,
            total_item: 20.0,
        });
        assert!(check_cart(&cart).is_ok());

        cart.items[0].amount = f64::NAN;
        assert!(matches!(
            check_cart(&cart).unwrap_err(),
            Failure::InvalidShape(field) if field == "cartItem.amount"
        ));
    }
}
