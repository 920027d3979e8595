//! Payment provider client (Stripe-shaped REST API).
//!
//! Charging a card is three calls: create a customer for the buyer's
//! email, attach the configured card source to it, then create the
//! charge. The provider is treated as opaque; any non-success status
//! surfaces as [`Failure::Upstream`] and nothing is retried.

use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::PaymentConfig;
use crate::error::{Failure, Result};

/// Payment provider API client.
#[derive(Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    config: PaymentConfig,
}

/// A completed charge.
#[derive(Debug, Clone, Deserialize)]
pub struct Charge {
    pub id: String,
    pub source: ChargeCard,
}

/// Card details echoed back on a charge.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeCard {
    pub brand: String,
    pub country: String,
    pub last4: String,
    pub object: String,
}

#[derive(Debug, Deserialize)]
struct Customer {
    id: String,
}

impl PaymentClient {
    /// Create a new payment client.
    #[must_use]
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a provider customer for the given email, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::Upstream`] if the request fails or the provider
    /// answers with a non-success status.
    pub async fn create_customer(&self, email: &str) -> Result<String> {
        let url = format!("{}/v1/customers", self.config.base_url);
        let customer: Customer = self.post_form(&url, &[("email", email)]).await?;
        Ok(customer.id)
    }

    /// Attach the configured card source to a customer.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::Upstream`] on request or provider failure.
    pub async fn attach_source(&self, customer_id: &str) -> Result<()> {
        let url = format!("{}/v1/customers/{customer_id}/sources", self.config.base_url);
        let _: serde_json::Value = self
            .post_form(&url, &[("source", self.config.source_token.as_str())])
            .await?;
        Ok(())
    }

    /// Charge a customer. The amount is given in the currency's main unit
    /// and converted to the provider's smallest-unit integer.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::Upstream`] on request or provider failure.
    pub async fn charge(
        &self,
        customer_id: &str,
        amount: f64,
        currency: &str,
        description: &str,
    ) -> Result<Charge> {
        let url = format!("{}/v1/charges", self.config.base_url);
        let cents = smallest_unit(amount).to_string();
        self.post_form(
            &url,
            &[
                ("amount", cents.as_str()),
                ("currency", currency),
                ("customer", customer_id),
                ("description", description),
            ],
        )
        .await
    }

    /// POST a form-encoded body with bearer auth, decode a JSON response.
    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .post(url)
            .bearer_auth(self.config.api_key.expose_secret())
            .form(form)
            .send()
            .await
            .map_err(|e| Failure::Upstream(format!("payment request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Failure::Upstream(format!(
                "payment provider returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Failure::Upstream(format!("payment response unreadable: {e}")))
    }
}

/// Convert a main-unit amount to the provider's smallest-unit integer.
fn smallest_unit(amount: f64) -> i64 {
    // Half-up on the cent boundary, matching how totals are displayed.
    #[allow(clippy::cast_possible_truncation)]
    let cents = (amount * 100.0).round() as i64;
    cents
}
