pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logger;
pub mod store;

use std::sync::Arc;

use auth::TokenIssuer;
use config::AppConfig;
use store::CredentialStore;

// 应用状态
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub issuer: TokenIssuer,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            issuer: TokenIssuer::new(config),
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}
