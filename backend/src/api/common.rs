//! Shared plumbing for API handlers.
//!
//! Provides the response envelope, conversion of service-layer errors into
//! HTTP responses, pagination helpers for list endpoints and parsing of the
//! `If-Unmodified-Since` precondition header.
//!
//! # Response Format
//! All errors return consistent JSON responses containing:
//! - `message`: Human-readable message
//! - `error.error_type`: Machine-readable error category
//! - `error.details`: Optional field-specific validation errors
//!
//! Paginated responses include:
//! - `pagination`: Metadata about current page, total items, etc.
//!
//! # Error Handling Flow
//! 1. Service layer returns domain-specific `ServiceError`
//! 2. `service_error_to_http` converts to appropriate HTTP response
//! 3. Validation errors are automatically formatted with field details

use crate::errors::ServiceError;
use crate::services::UnmodifiedSince;
use axum::http::{HeaderMap, StatusCode, header::IF_UNMODIFIED_SINCE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Standard API response wrapper for all endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Indicates if the request was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message
    pub message: String,
    /// Error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    /// Pagination metadata (present for paginated responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
    /// Request timestamp
    pub timestamp: String,
}

/// Pagination metadata for list responses
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Current page number (1-indexed)
    pub current_page: u32,
    /// Number of items per page
    pub per_page: u32,
    /// Total number of items across all pages
    pub total_items: u64,
    /// Total number of pages
    pub total_pages: u32,
    /// Whether there is a next page
    pub has_next: bool,
    /// Whether there is a previous page
    pub has_prev: bool,
    /// Next page number (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u32>,
    /// Previous page number (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_page: Option<u32>,
}

/// Paginated response wrapper containing items and pagination metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedData<T> {
    /// List of items for current page
    pub items: Vec<T>,
    /// Total count of items (redundant with pagination.total_items but convenient)
    pub total: u64,
}

/// Error details for failed requests
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error type identifier
    pub error_type: String,
    /// Field-specific validation errors when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Field-specific validation error details
#[derive(Debug, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the field with validation error
    pub field: String,
    /// Description of the validation failure
    pub message: String,
}

/// Page selection handed from list endpoints to the services
#[derive(Debug, Clone, Copy)]
pub struct PaginationFilter {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Query string accepted by every list endpoint
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct ListQuery {
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100, message = "Per page must be between 1-100"))]
    pub per_page: Option<u32>,

    /// Case-insensitive substring match on the name
    #[validate(length(max = 200, message = "Search term must be at most 200 characters"))]
    pub q: Option<String>,
}

// ============================================================================
// Implementation Details
// ============================================================================

impl PaginationMeta {
    /// Create pagination metadata from page parameters and total count
    pub fn new(current_page: u32, per_page: u32, total_items: u64) -> Self {
        let total_pages = if total_items == 0 {
            1
        } else {
            ((total_items - 1) / per_page as u64 + 1) as u32
        };

        let has_next = current_page < total_pages;
        let has_prev = current_page > 1;

        Self {
            current_page,
            per_page,
            total_items,
            total_pages,
            has_next,
            has_prev,
            next_page: if has_next {
                Some(current_page + 1)
            } else {
                None
            },
            prev_page: if has_prev {
                Some(current_page - 1)
            } else {
                None
            },
        }
    }

    pub fn from_filter(filter: &PaginationFilter, total_items: u64) -> Self {
        Self::new(filter.page(), filter.per_page(), total_items)
    }
}

impl<T> PaginatedData<T> {
    /// Create a new paginated data wrapper
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            pagination: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a successful paginated response
    pub fn paginated(data: T, pagination: PaginationMeta, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            pagination: Some(pagination),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create an error response
    pub fn error(
        message: impl Into<String>,
        error_type: impl Into<String>,
        details: Option<Vec<FieldError>>,
    ) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: message.into(),
            error: Some(ErrorDetails {
                error_type: error_type.into(),
                details,
            }),
            pagination: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl PaginationFilter {
    /// Get page number with default
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    /// Get per_page with default
    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20)
    }

    /// Calculate offset for database queries
    pub fn offset(&self) -> u64 {
        (self.page().saturating_sub(1) as u64) * self.per_page() as u64
    }

    /// Get limit for database queries
    pub fn limit(&self) -> u64 {
        self.per_page() as u64
    }
}

impl Default for PaginationFilter {
    fn default() -> Self {
        Self {
            page: Some(1),
            per_page: Some(20),
        }
    }
}

impl ListQuery {
    pub fn pagination(&self) -> PaginationFilter {
        PaginationFilter {
            page: self.page,
            per_page: self.per_page,
        }
    }

    /// The trimmed search term, `None` when absent or blank.
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// Converts ServiceError to appropriate HTTP response with standard format
pub fn service_error_to_http(error: ServiceError) -> (StatusCode, String) {
    let (status, error_type, message, details) = match error {
        ServiceError::Validation { message } => {
            let details = field_errors_from_message(&message);
            (StatusCode::BAD_REQUEST, "validation_error", message, details)
        }
        ServiceError::NotFound { entity, identifier } => (
            StatusCode::NOT_FOUND,
            "not_found",
            format!("{} '{}' not found", entity, identifier),
            None,
        ),
        ServiceError::AlreadyExists { entity, identifier } => (
            StatusCode::CONFLICT,
            "already_exists",
            format!("{} '{}' already exists", entity, identifier),
            None,
        ),
        ServiceError::PermissionDenied { message } => {
            (StatusCode::FORBIDDEN, "permission_denied", message, None)
        }
        ServiceError::InvalidOperation { message } => {
            (StatusCode::BAD_REQUEST, "invalid_operation", message, None)
        }
        ServiceError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Invalid username or password".to_string(),
            None,
        ),
        // The rejection reason stays in the logs.
        ServiceError::Unauthenticated { .. } => (
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "Not authenticated".to_string(),
            None,
        ),
        ServiceError::PreconditionFailed { entity, identifier } => (
            StatusCode::PRECONDITION_FAILED,
            "precondition_failed",
            format!(
                "{} '{}' was modified since the provided timestamp",
                entity, identifier
            ),
            None,
        ),
        ServiceError::RateLimited { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            format!("Too many requests, retry after {} seconds", retry_after_secs),
            None,
        ),
        ServiceError::Database { source } => {
            tracing::error!("Database error: {}", source);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                "Internal server error".to_string(),
                None,
            )
        }
        ServiceError::InternalError { message } => {
            tracing::error!("Internal error: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
                None,
            )
        }
    };

    let error_response = ApiResponse::<()>::error(message, error_type, details);
    (
        status,
        serde_json::to_string(&error_response).unwrap_or_default(),
    )
}

/// Splits a flattened `field: message, field: message` validation message
/// back into field errors. Messages without a field prefix yield `None`.
fn field_errors_from_message(message: &str) -> Option<Vec<FieldError>> {
    let details: Vec<FieldError> = message
        .split(", ")
        .filter_map(|part| part.split_once(": "))
        .filter(|(field, _)| {
            !field.is_empty()
                && field
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
        .map(|(field, message)| FieldError {
            field: field.to_string(),
            message: message.to_string(),
        })
        .collect();

    if details.is_empty() {
        None
    } else {
        Some(details)
    }
}

/// Reads the optional `If-Unmodified-Since` precondition.
///
/// RFC 3339 timestamps (as returned in `updated_at`) are compared exactly;
/// RFC 2822 HTTP-dates only to the second.
pub fn parse_if_unmodified_since(
    headers: &HeaderMap,
) -> Result<Option<UnmodifiedSince>, ServiceError> {
    let Some(value) = headers.get(IF_UNMODIFIED_SINCE) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| ServiceError::validation("If-Unmodified-Since header is not valid text"))?
        .trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(UnmodifiedSince::exact(timestamp.with_timezone(&Utc))));
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc2822(raw) {
        return Ok(Some(UnmodifiedSince {
            timestamp: timestamp.with_timezone(&Utc),
            whole_seconds: true,
        }));
    }

    Err(ServiceError::validation(format!(
        "If-Unmodified-Since header is not a valid timestamp: {}",
        raw
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Timelike;

    #[test]
    fn test_pagination_meta_calculation() {
        // Test normal pagination
        let meta = PaginationMeta::new(2, 10, 25);
        assert_eq!(meta.current_page, 2);
        assert_eq!(meta.per_page, 10);
        assert_eq!(meta.total_items, 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_prev);
        assert_eq!(meta.next_page, Some(3));
        assert_eq!(meta.prev_page, Some(1));

        // Test last page
        let meta = PaginationMeta::new(3, 10, 25);
        assert!(meta.has_prev);
        assert!(!meta.has_next);

        // Test empty result set
        let meta = PaginationMeta::new(1, 10, 0);
        assert_eq!(meta.total_pages, 1);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn test_list_query() {
        let query = ListQuery {
            page: Some(3),
            per_page: Some(10),
            q: Some("  milk ".to_string()),
        };
        assert_eq!(query.search(), Some("milk"));
        assert_eq!(query.pagination().offset(), 20);

        let blank = ListQuery {
            q: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.search(), None);
        assert_eq!(blank.pagination().per_page(), 20);

        let invalid = ListQuery {
            per_page: Some(500),
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (ServiceError::validation("name: too long"), StatusCode::BAD_REQUEST),
            (ServiceError::not_found("Item", 1), StatusCode::NOT_FOUND),
            (ServiceError::already_exists("Item", "Milk"), StatusCode::CONFLICT),
            (ServiceError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (
                ServiceError::from(crate::errors::TokenError::Expired),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ServiceError::precondition_failed("Item", 1),
                StatusCode::PRECONDITION_FAILED,
            ),
            (
                ServiceError::RateLimited {
                    retry_after_secs: 5,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(service_error_to_http(error).0, expected);
        }
    }

    #[test]
    fn test_unauthenticated_body_hides_reason() {
        use crate::errors::TokenError;

        let bodies: Vec<String> = [TokenError::Invalid, TokenError::Expired, TokenError::Revoked]
            .into_iter()
            .map(|reason| {
                let body = service_error_to_http(reason.into()).1;
                let parsed: ApiResponse<()> = serde_json::from_str(&body).unwrap();
                parsed.message
            })
            .collect();

        assert!(bodies.iter().all(|message| message == "Not authenticated"));
    }

    #[test]
    fn test_validation_details() {
        let (_, body) = service_error_to_http(ServiceError::validation(
            "name: Name is required, quantity: Quantity must be non-negative",
        ));
        let parsed: ApiResponse<()> = serde_json::from_str(&body).unwrap();
        let details = parsed.error.unwrap().details.unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[1].field, "quantity");
    }

    #[test]
    fn test_if_unmodified_since() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_if_unmodified_since(&headers).unwrap(), None);

        headers.insert(
            IF_UNMODIFIED_SINCE,
            HeaderValue::from_static("2025-03-01T10:00:00.123456Z"),
        );
        let exact = parse_if_unmodified_since(&headers).unwrap().unwrap();
        assert!(!exact.whole_seconds);
        assert_eq!(exact.timestamp.timestamp_subsec_micros(), 123456);

        headers.insert(
            IF_UNMODIFIED_SINCE,
            HeaderValue::from_static("Sat, 01 Mar 2025 10:00:00 GMT"),
        );
        let http_date = parse_if_unmodified_since(&headers).unwrap().unwrap();
        assert!(http_date.whole_seconds);
        assert_eq!(http_date.timestamp, exact.timestamp.with_nanosecond(0).unwrap());

        headers.insert(IF_UNMODIFIED_SINCE, HeaderValue::from_static("yesterday"));
        assert!(matches!(
            parse_if_unmodified_since(&headers),
            Err(ServiceError::Validation { .. })
        ));
    }
}
