//! PizzApp API library.
//!
//! A flat-file ordering API: menus, user accounts, access tokens,
//! shopping carts and orders, each persisted as one JSON file per
//! record. Request handling runs as explicit validation pipelines over
//! the record store, with optional payment and email providers at
//! checkout.
//!
//! The binary in `main.rs` wires this up; the library exists so the
//! integration tests can drive the router in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod envelope;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod schema;
pub mod services;
pub mod state;
pub mod store;
pub mod validate;
