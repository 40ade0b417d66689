//! Periodic pruning of the token revocation ledger.
//!
//! Entries are only needed until the token they block would have expired on
//! its own; after that signature validation rejects the token anyway.

use crate::database::models::BlacklistStats;
use crate::errors::ServiceResult;
use crate::repositories::token_blacklist_repository::TokenBlacklistRepository;
use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub struct BlacklistCleanupService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BlacklistCleanupService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Removes expired ledger entries.
    ///
    /// # Returns
    /// Number of entries removed
    pub async fn cleanup_expired_tokens(&self) -> ServiceResult<u64> {
        let removed = TokenBlacklistRepository::new(self.pool)
            .delete_expired(Utc::now())
            .await?;

        if removed > 0 {
            info!(removed, "Pruned expired revocation ledger entries");
        } else {
            debug!("No expired revocation ledger entries");
        }
        Ok(removed)
    }

    pub async fn stats(&self) -> ServiceResult<BlacklistStats> {
        Ok(TokenBlacklistRepository::new(self.pool)
            .stats(Utc::now())
            .await?)
    }

    /// One cleanup round: prune, then log the remaining ledger size.
    pub async fn run_once(&self) -> ServiceResult<BlacklistStats> {
        let removed = self.cleanup_expired_tokens().await?;
        let stats = self.stats().await?;

        info!(
            removed,
            total = stats.total,
            active = stats.active,
            expired = stats.expired,
            "Revocation ledger cleanup finished"
        );
        Ok(stats)
    }
}

/// Spawns the background cleanup loop. The first round runs immediately.
pub fn spawn_cleanup_task(pool: SqlitePool, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = BlacklistCleanupService::new(&pool).run_once().await {
                error!("Revocation ledger cleanup failed: {}", e);
            }
        }
    })
}
