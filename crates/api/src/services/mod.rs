//! Clients for the external payment and email providers.

mod email;
mod payment;

pub use email::{receipt_html, EmailClient};
pub use payment::{Charge, ChargeCard, PaymentClient};
