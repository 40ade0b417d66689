//! Module for core business logic services.
//!
//! This module encapsulates services that perform specific business operations
//! and orchestrate interactions between the repositories, such as user
//! credential management, inventory writes guarded by freshness
//! preconditions, and pruning of the token revocation ledger.

use crate::errors::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use validator::Validate;

pub mod blacklist_cleanup;
pub mod category_service;
pub mod item_service;
pub mod unit_service;
pub mod user_service;

/// Number of compare-and-swap attempts for writes without a precondition.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Freshness precondition taken from an `If-Unmodified-Since` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnmodifiedSince {
    pub timestamp: DateTime<Utc>,
    /// HTTP-dates only carry whole seconds.
    pub whole_seconds: bool,
}

impl UnmodifiedSince {
    pub fn exact(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            whole_seconds: false,
        }
    }

    /// `true` when the entity changed after the client's last known version.
    pub fn is_violated_by(&self, current: DateTime<Utc>) -> bool {
        if self.whole_seconds {
            current.timestamp() > self.timestamp.timestamp()
        } else {
            current > self.timestamp
        }
    }
}

/// Runs `validator` on an input DTO and flattens the field messages.
pub fn validate_input<T: Validate>(input: &T) -> ServiceResult<()> {
    if let Err(validation_errors) = input.validate() {
        let mut error_messages: Vec<String> = validation_errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    format!(
                        "{}: {}",
                        field,
                        error.message.as_ref().unwrap_or(&"Invalid value".into())
                    )
                })
            })
            .collect();
        error_messages.sort();

        return Err(ServiceError::validation(error_messages.join(", ")));
    }
    Ok(())
}

/// Rejects the write with `PreconditionFailed` if the entity is newer than
/// the client's fencing timestamp.
pub fn check_unmodified_since(
    entity: &str,
    id: i64,
    current: DateTime<Utc>,
    precondition: Option<UnmodifiedSince>,
) -> ServiceResult<()> {
    match precondition {
        Some(since) if since.is_violated_by(current) => {
            tracing::info!(entity, id, "Rejected stale write");
            Err(ServiceError::precondition_failed(entity, id))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_precondition_exact() {
        let now = Utc::now();
        let since = UnmodifiedSince::exact(now);

        assert!(!since.is_violated_by(now));
        assert!(!since.is_violated_by(now - Duration::seconds(1)));
        assert!(since.is_violated_by(now + Duration::milliseconds(1)));
    }

    #[test]
    fn test_precondition_whole_seconds() {
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let since = UnmodifiedSince {
            timestamp: base,
            whole_seconds: true,
        };

        assert!(!since.is_violated_by(base + Duration::milliseconds(900)));
        assert!(since.is_violated_by(base + Duration::seconds(1)));
    }

    #[test]
    fn test_check_unmodified_since() {
        let now = Utc::now();
        assert!(check_unmodified_since("Item", 1, now, None).is_ok());
        assert!(matches!(
            check_unmodified_since(
                "Item",
                1,
                now,
                Some(UnmodifiedSince::exact(now - Duration::hours(1)))
            ),
            Err(ServiceError::PreconditionFailed { .. })
        ));
    }
}
