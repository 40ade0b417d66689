//! Shared application state handed to every handler through `Extension`.

use crate::auth::rate_limit::RateLimiter;
use crate::config::Config;
use crate::utils::jwt::TokenService;
use crate::utils::password::PasswordHasher;
use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenService>,
    pub passwords: Arc<PasswordHasher>,
    pub login_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Builds the state from configuration: loads or generates the signing
    /// key, precomputes the dummy bcrypt hash and sizes the login limiter.
    pub fn new(pool: SqlitePool, config: Config) -> Result<Self> {
        let tokens = TokenService::from_config(&config)?;
        let passwords = PasswordHasher::new(config.bcrypt_cost)?;
        let login_limiter = RateLimiter::new(
            config.login_attempts_per_minute,
            Duration::from_secs(60),
            config.rate_limit_enabled,
        );

        Ok(Self {
            pool,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            passwords: Arc::new(passwords),
            login_limiter: Arc::new(login_limiter),
        })
    }
}

#[cfg(test)]
impl AppState {
    /// State over a fresh in-memory database with test-friendly settings.
    pub async fn for_tests() -> Self {
        Self::for_tests_with(Config::for_tests()).await
    }

    pub async fn for_tests_with(config: Config) -> Self {
        let db = crate::database::Database::in_memory().await.unwrap();
        Self::new(db.pool().clone(), config).unwrap()
    }
}
