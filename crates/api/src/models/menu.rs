//! Menu item document.

use serde::{Deserialize, Serialize};

use pizzapp_core::RecordId;

/// An item on the menu. Keyed by `name` in the `menus` collection, which
/// makes the name unique across the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: RecordId,
    pub name: String,
    pub price: f64,
    /// Available quantity.
    pub amount: f64,
    pub description: String,
    /// Ids of shopping carts referencing this item.
    pub shopping_carts_list: Vec<String>,
}

impl MenuItem {
    /// Build a fresh item with a generated id and no cart references.
    #[must_use]
    pub fn new(name: String, price: f64, amount: f64, description: String) -> Self {
        Self {
            id: RecordId::generate(),
            name,
            price,
            amount,
            description,
            shopping_carts_list: Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let item = MenuItem::new("margherita".into(), 9.5, 20.0, "classic".into());
        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("shoppingCartsList").is_some());
        assert!(value.get("shopping_carts_list").is_none());
    }
}
