//! Password hashing with bcrypt.
//!
//! Hashing and verification run on the blocking thread pool. Verification
//! always performs a full bcrypt comparison, falling back to a dummy hash of
//! the same cost when the user does not exist, so an unknown username costs
//! as much wall-clock time as a wrong password.

use crate::errors::{ServiceError, ServiceResult};
use bcrypt::{hash, verify};

pub struct PasswordHasher {
    cost: u32,
    dummy_hash: String,
}

impl PasswordHasher {
    /// Creates a hasher for the given bcrypt cost, precomputing the dummy hash.
    pub fn new(cost: u32) -> ServiceResult<Self> {
        let dummy_hash = hash("homestock-timing-equaliser", cost)
            .map_err(|e| ServiceError::internal_error(format!("Password hashing failed: {}", e)))?;

        Ok(Self { cost, dummy_hash })
    }

    /// Hashes a plain text password before storing it.
    pub async fn hash_password(&self, password: &str) -> ServiceResult<String> {
        let password = password.to_string();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(|e| ServiceError::internal_error(format!("Hashing task failed: {}", e)))?
            .map_err(|e| ServiceError::internal_error(format!("Password hashing failed: {}", e)))
    }

    /// Verifies `password` against `stored_hash`, or against the dummy hash
    /// when there is no stored hash. Returns `false` in the latter case.
    pub async fn verify_password(&self, password: &str, stored_hash: Option<&str>) -> bool {
        let exists = stored_hash.is_some();
        let password = password.to_string();
        let target = stored_hash.unwrap_or(&self.dummy_hash).to_string();

        let matched = tokio::task::spawn_blocking(move || verify(password, &target))
            .await
            .ok()
            .and_then(Result::ok)
            .unwrap_or(false);

        matched && exists
    }
}
