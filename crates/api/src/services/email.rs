//! Email provider client (Mailgun-shaped REST API).
//!
//! Sends the order receipt as an HTML message. Fire and forget: a
//! provider failure surfaces as [`Failure::Upstream`] and is never
//! retried.

use secrecy::ExposeSecret;

use crate::config::EmailConfig;
use crate::error::{Failure, Result};
use crate::models::Order;

/// Email provider API client.
#[derive(Clone)]
pub struct EmailClient {
    client: reqwest::Client,
    config: EmailConfig,
}

impl EmailClient {
    /// Create a new email client.
    #[must_use]
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Send the receipt for an order to the configured recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::Upstream`] if the request fails or the provider
    /// answers with a non-success status.
    pub async fn send_receipt(&self, order: &Order) -> Result<()> {
        let url = format!(
            "{}/v3/{}/messages",
            self.config.base_url, self.config.domain
        );
        let html = receipt_html(order);

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(self.config.api_key.expose_secret()))
            .form(&[
                ("from", self.config.from.as_str()),
                ("to", self.config.to.as_str()),
                ("subject", self.config.subject.as_str()),
                ("html", html.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Failure::Upstream(format!("email request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Failure::Upstream(format!(
                "email provider returned {status}: {body}"
            )));
        }

        Ok(())
    }
}

/// Render the HTML receipt body for an order.
#[must_use]
pub fn receipt_html(order: &Order) -> String {
    let mut rows = String::new();
    for item in &order.items {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            item.name,
            item.amount,
            currency_formatted(item.price),
            currency_formatted(item.total_item),
        ));
    }
    format!(
        "<h1>Thank you for your order, {}!</h1>\
         <table>\
         <tr><th>Item</th><th>Qty</th><th>Price</th><th>Subtotal</th></tr>\
         {rows}\
         </table>\
         <p>Total charged: {}</p>\
         <p>Order {} placed on {}.</p>",
        order.customer,
        currency_formatted(order.total),
        order.id,
        order.authorization_date,
    )
}

/// Format an amount as dollars with the cents in a `<small>` tag.
fn currency_formatted(amount: f64) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let cents = (amount * 100.0).round() as i64;
    format!("${}<small>.{:02}</small>", cents / 100, cents % 100)
}
