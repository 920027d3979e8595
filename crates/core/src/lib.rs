//! PizzApp Core - Shared types library.
//!
//! This crate provides common types used across all PizzApp components:
//! - `api` - JSON API binary (menus, carts, orders, tokens, users)
//! - `integration-tests` - end-to-end scenario tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients, no filesystem access. This keeps it lightweight and allows it to
//! be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - `Email` and `RecordId` newtypes, key hashing, timestamps

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
