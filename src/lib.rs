pub mod api;
pub mod config;
pub mod db;
pub mod identity;
pub mod payments;
pub mod reporting;

pub use db::DbPool;

use config::Config;
use identity::TokenVerifier;
use payments::PaymentGateway;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tokens: TokenVerifier,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: DbPool,
        tokens: TokenVerifier,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            config,
            db,
            tokens,
            payments,
        }
    }
}
