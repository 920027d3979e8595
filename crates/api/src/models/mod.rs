//! Entity documents stored by the record store.
//!
//! Field names serialize in camelCase to match the on-disk JSON documents.

mod cart;
mod menu;
mod order;
mod token;
mod user;

pub use cart::{Cart, CartItem};
pub use menu::MenuItem;
pub use order::Order;
pub use token::{TOKEN_TTL_MS, Token};
pub use user::User;
pub(crate) use user::strip_password;
