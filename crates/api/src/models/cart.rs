//! Shopping cart document.

use serde::{Deserialize, Serialize};

use pizzapp_core::RecordId;

/// One line in a shopping cart: a menu item at a requested quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Id of the referenced menu item.
    pub id: RecordId,
    pub name: String,
    /// Unit price at the time the line was added.
    pub price: f64,
    /// Requested quantity.
    pub amount: f64,
    /// Line total: `amount * price`.
    pub total_item: f64,
}

/// A shopping cart, keyed by the owner's hashed email: one cart per user.
///
/// Invariant: `total` equals the sum of `items[].total_item` after every
/// mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: RecordId,
    pub total: f64,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// A fresh, empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            id: RecordId::generate(),
            total: 0.0,
            items: Vec::new(),
        }
    }

    /// Sum of line totals, for asserting the total invariant.
    #[must_use]
    pub fn line_total_sum(&self) -> f64 {
        self.items.iter().map(|item| item.total_item).sum()
    }

    /// Append a line and add it to the running total.
    pub fn push_line(&mut self, line: CartItem) {
        self.total += line.total_item;
        self.items.push(line);
    }

    /// Change the quantity of the named line, re-totalling the line and the
    /// cart. Returns false if no line has that name.
    pub fn retotal_line(&mut self, name: &str, amount: f64) -> bool {
        for line in &mut self.items {
            if line.name == name {
                self.total -= line.total_item;
                line.amount = amount;
                line.total_item = line.price * amount;
                self.total += line.total_item;
                return true;
            }
        }
        false
    }
}
