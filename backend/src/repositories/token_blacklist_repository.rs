//! Database repository for the session token revocation ledger.
//!
//! The ledger is append-only apart from pruning rows whose tokens have
//! expired on their own. Expiry timestamps are stored at whole-second
//! precision so that the textual comparison in SQL orders correctly.

use crate::database::models::{BlacklistStats, RevokedToken};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct TokenBlacklistRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TokenBlacklistRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Records a revoked token id. Revoking the same jti twice is a no-op.
    ///
    /// # Returns
    /// `true` if a new ledger row was written
    pub async fn revoke(&self, jti: &str, username: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO jwt_blacklist (jti, username, expires_at, revoked_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(jti)
        .bind(username)
        .bind(whole_seconds(expires_at))
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Checks whether a jti is present in the ledger.
    pub async fn is_revoked(&self, jti: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jwt_blacklist WHERE jti = ?")
            .bind(jti)
            .fetch_one(self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Fetches a single ledger entry.
    pub async fn get(&self, jti: &str) -> Result<Option<RevokedToken>> {
        let entry = sqlx::query_as::<_, RevokedToken>(
            "SELECT jti, username, expires_at, revoked_at FROM jwt_blacklist WHERE jti = ?",
        )
        .bind(jti)
        .fetch_optional(self.pool)
        .await?;

        Ok(entry)
    }

    /// Deletes every entry whose token expired before `now`.
    ///
    /// # Returns
    /// Number of rows removed
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM jwt_blacklist WHERE expires_at < ?")
            .bind(whole_seconds(now))
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Counts total and already-expired ledger rows.
    pub async fn stats(&self, now: DateTime<Utc>) -> Result<BlacklistStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jwt_blacklist")
            .fetch_one(self.pool)
            .await?;

        let expired: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jwt_blacklist WHERE expires_at < ?")
                .bind(whole_seconds(now))
                .fetch_one(self.pool)
                .await?;

        Ok(BlacklistStats {
            total,
            expired,
            active: total - expired,
        })
    }
}

fn whole_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}
