//! Global application error types and handlers.
//!
//! This module defines custom error types that are used across the entire
//! backend application and provides mechanisms for consistent error handling
//! and response formatting.

use thiserror::Error;

/// Reasons a session token was rejected.
///
/// These never reach the caller: the API boundary collapses all of them into
/// a single unauthenticated response. They are kept apart for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Missing, malformed or badly signed token.
    #[error("invalid token")]
    Invalid,
    /// Signature is fine but the token is past its expiry.
    #[error("expired token")]
    Expired,
    /// Signature and expiry are fine but the token was revoked.
    #[error("revoked token")]
    Revoked,
}

/// Generic service error that can be used across all entities
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    #[error("{entity} already exists: {identifier}")]
    AlreadyExists { entity: String, identifier: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Collapses every token failure; `reason` is only used for logging.
    #[error("Not authenticated ({reason})")]
    Unauthenticated { reason: TokenError },

    #[error("{entity} {identifier} has been modified since the provided timestamp")]
    PreconditionFailed { entity: String, identifier: String },

    #[error("Too many requests, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Database error: {source}")]
    Database {
        #[from]
        source: anyhow::Error,
    },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    // Helper constructors for common patterns

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            identifier: identifier.to_string(),
        }
    }

    pub fn already_exists(entity: impl Into<String>, identifier: impl ToString) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            identifier: identifier.to_string(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    pub fn precondition_failed(entity: impl Into<String>, identifier: impl ToString) -> Self {
        Self::PreconditionFailed {
            entity: entity.into(),
            identifier: identifier.to_string(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Maps a repository error to `AlreadyExists` when it is a unique constraint
    /// violation, otherwise keeps it as a database error.
    pub fn from_write(
        error: anyhow::Error,
        entity: impl Into<String>,
        identifier: impl ToString,
    ) -> Self {
        let unique_violation = error
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_unique_violation());

        if unique_violation {
            Self::already_exists(entity, identifier)
        } else {
            Self::Database { source: error }
        }
    }
}

impl From<TokenError> for ServiceError {
    fn from(reason: TokenError) -> Self {
        ServiceError::Unauthenticated { reason }
    }
}
