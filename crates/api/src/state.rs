//! Shared application state passed to every route handler.

use std::sync::Arc;

use crate::config::Config;
use crate::services::{EmailClient, PaymentClient};
use crate::store::RecordStore;

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: RecordStore,
    payment: Option<PaymentClient>,
    email: Option<EmailClient>,
}

impl AppState {
    /// Build the state from a loaded configuration. Provider clients are
    /// constructed only when their section is configured.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let store = RecordStore::new(config.data_dir.clone());
        let payment = config.payment.clone().map(PaymentClient::new);
        let email = config.email.clone().map(EmailClient::new);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                payment,
                email,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.inner.store
    }

    #[must_use]
    pub fn payment(&self) -> Option<&PaymentClient> {
        self.inner.payment.as_ref()
    }

    #[must_use]
    pub fn email(&self) -> Option<&EmailClient> {
        self.inner.email.as_ref()
    }
}
