//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::config::PlatformConfig;
use crate::middleware::tenant::StoreCache;
use crate::openai::{OpenAiClient, OpenAiError};
use crate::services::EmailService;
use crate::stripe::{StripeClient, StripeError};

/// Error building application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("stripe client: {0}")]
    Stripe(#[from] StripeError),
    #[error("openai client: {0}")]
    OpenAi(#[from] OpenAiError),
    #[error("smtp transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PlatformConfig,
    pool: PgPool,
    stripe: StripeClient,
    openai: OpenAiClient,
    email: EmailService,
    stores: StoreCache,
}

impl AppState {
    /// Build state and the external API clients.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client or the SMTP transport cannot be
    /// configured.
    pub fn new(config: PlatformConfig, pool: PgPool) -> Result<Self, StateError> {
        let stripe = StripeClient::new(&config.stripe, &config.base_url)?;
        let openai = OpenAiClient::new(&config.openai)?;
        let email = EmailService::new(
            config.email.as_ref(),
            &config.email_from,
            &config.base_url,
            &config.root_domain,
        )?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                stripe,
                openai,
                email,
                stores: StoreCache::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &PlatformConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    #[must_use]
    pub fn openai(&self) -> &OpenAiClient {
        &self.inner.openai
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Resolved storefronts, keyed by host.
    #[must_use]
    pub fn stores(&self) -> &StoreCache {
        &self.inner.stores
    }
}
