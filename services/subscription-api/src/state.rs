//! Application state for the Subscription API service.

use std::sync::Arc;

use tiffin_db::pg::Repositories;
use tiffin_db::{DbPool, SessionRepository};
use tiffin_lifecycle::{
    Catalog, LifecycleService, PaymentGateway, RazorpayGateway, Stores, WebhookHandler,
};

use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Lifecycle rules, billing and the credit ledger
    pub lifecycle: Arc<LifecycleService>,
    /// Plans, trial types and platform settings
    pub catalog: Arc<Catalog>,
    /// Razorpay webhook verification
    pub webhooks: Arc<WebhookHandler>,
    /// Bearer session lookup
    pub sessions: Arc<dyn SessionRepository>,
    /// Database pool for the readiness check
    pub pool: DbPool,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the services over the Postgres repositories
    pub fn new(repos: Repositories, pool: DbPool, config: Config) -> Self {
        let sessions: Arc<dyn SessionRepository> = Arc::new(repos.sessions.clone());
        let gateway = Arc::new(RazorpayGateway::new(config.gateway.clone()));
        Self::with_stores(Stores::from(repos), sessions, gateway, pool, config)
    }

    /// Wire the services over arbitrary stores and payment gateway
    pub fn with_stores(
        stores: Stores,
        sessions: Arc<dyn SessionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        pool: DbPool,
        config: Config,
    ) -> Self {
        let lifecycle = LifecycleService::new(
            stores.clone(),
            gateway,
            config.gateway.key_secret.clone(),
        );

        Self {
            lifecycle: Arc::new(lifecycle),
            catalog: Arc::new(Catalog::new(stores)),
            webhooks: Arc::new(WebhookHandler::new(config.gateway.webhook_secret.clone())),
            sessions,
            pool,
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
