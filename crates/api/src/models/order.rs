//! Purchase order document.

use serde::{Deserialize, Serialize};

use pizzapp_core::{RecordId, display_timestamp, now_ms};

use super::{Cart, CartItem, User};

/// A purchase order, keyed by the owner's hashed email. Created as a
/// snapshot of the cart; immutable once persisted (there is no update
/// path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: RecordId,
    pub country: String,
    pub customer: String,
    pub email: String,
    pub currency: String,
    pub total: f64,
    /// Last four digits of the charged card; 0 until a charge runs.
    pub last4: i64,
    /// Cart lines copied verbatim.
    pub items: Vec<CartItem>,
    pub payment_method: String,
    pub authorization: bool,
    pub shopping_cart_id: RecordId,
    pub authorization_date: String,
    /// Provider object tag of the charge source, set only after a charge.
    #[serde(rename = "object", default, skip_serializing_if = "Option::is_none")]
    pub payment_object: Option<String>,
}

impl Order {
    /// Snapshot a cart into an order with placeholder payment fields.
    ///
    /// When `accepted` the customer identity comes from the user record;
    /// otherwise the placeholders stand until (and unless) a charge fills
    /// them in.
    #[must_use]
    pub fn from_cart(cart: &Cart, user: &User, accepted: bool) -> Self {
        let (customer, email) = if accepted {
            (user.name.clone(), user.email.to_string())
        } else {
            ("testName".to_owned(), "test@email.com".to_owned())
        };

        Self {
            id: RecordId::generate(),
            country: "US".to_owned(),
            customer,
            email,
            currency: "usd".to_owned(),
            total: cart.total,
            last4: 0,
            items: cart.items.clone(),
            payment_method: "XX".to_owned(),
            authorization: true,
            shopping_cart_id: cart.id.clone(),
            authorization_date: display_timestamp(now_ms()),
            payment_object: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use pizzapp_core::Email;

    fn fixtures() -> (Cart, User) {
        let mut cart = Cart::empty();
        cart.push_line(CartItem {
            id: RecordId::generate(),
            name: "margherita".into(),
            price: 10.0,
            amount: 2.0,
            total_item: 20.0,
        });
        let user = User {
            id: RecordId::generate(),
            email: Email::parse("alice@example.com").unwrap(),
            address: "1 Pizza Way".into(),
            name: "Alice".into(),
            password: "digest".into(),
            token: String::new(),
            tos_agreement: true,
        };
        (cart, user)
    }

    #[test]
    fn snapshot_without_accept_uses_placeholders() {
        let (cart, user) = fixtures();
        let order = Order::from_cart(&cart, &user, false);

        assert_eq!(order.customer, "testName");
        assert_eq!(order.email, "test@email.com");
        assert_eq!(order.last4, 0);
        assert_eq!(order.payment_method, "XX");
        assert!(order.authorization);
        assert_eq!(order.total, 20.0);
        assert_eq!(order.items, cart.items);
        assert_eq!(order.shopping_cart_id, cart.id);
    }

    #[test]
    fn snapshot_with_accept_uses_user_identity() {
        let (cart, user) = fixtures();
        let order = Order::from_cart(&cart, &user, true);
        assert_eq!(order.customer, "Alice");
        assert_eq!(order.email, "alice@example.com");
    }

    #[test]
    fn payment_object_is_omitted_until_charged() {
        let (cart, user) = fixtures();
        let order = Order::from_cart(&cart, &user, false);
        let value = serde_json::to_value(&order).unwrap();
        assert!(value.get("object").is_none());
        assert!(value.get("shoppingCartId").is_some());
    }
}
