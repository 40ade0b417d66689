//! Client-side error taxonomy.
//!
//! Every failure the adapter can report is one of a closed set of kinds the
//! UI and the optimistic controller branch on; the HTTP status, when there
//! was one, is kept alongside.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No valid session; the UI should route to login.
    Unauthenticated,
    /// Login rejected.
    InvalidCredentials,
    /// The entity changed on the server since the client last saw it.
    Conflict,
    NotFound,
    RateLimited,
    Validation,
    /// Network failures, timeouts and anything else.
    Unexpected,
}

#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ClientError {
    pub kind: ErrorKind,
    pub message: String,
    pub status_code: Option<u16>,
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ClientError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
        }
    }

    /// Maps a non-success response to an error, preferring the server's
    /// own message from the JSON envelope.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let kind = match status {
            StatusCode::UNAUTHORIZED => ErrorKind::Unauthenticated,
            StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => ErrorKind::Conflict,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::Validation,
            _ => ErrorKind::Unexpected,
        };

        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.message)
            .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });

        Self {
            kind,
            message,
            status_code: Some(status.as_u16()),
        }
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            "Request timed out".to_string()
        } else {
            format!("Request failed: {}", error)
        };

        Self {
            kind: ErrorKind::Unexpected,
            message,
            status_code: error.status().map(|s| s.as_u16()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (StatusCode::UNAUTHORIZED, ErrorKind::Unauthenticated),
            (StatusCode::PRECONDITION_FAILED, ErrorKind::Conflict),
            (StatusCode::NOT_FOUND, ErrorKind::NotFound),
            (StatusCode::TOO_MANY_REQUESTS, ErrorKind::RateLimited),
            (StatusCode::BAD_REQUEST, ErrorKind::Validation),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Unexpected),
        ];
        for (status, kind) in cases {
            let error = ClientError::from_response(status, "");
            assert_eq!(error.kind, kind);
            assert_eq!(error.status_code, Some(status.as_u16()));
        }
    }

    #[test]
    fn test_message_extraction() {
        let body = r#"{"success":false,"message":"Item '3' not found","timestamp":"x"}"#;
        let error = ClientError::from_response(StatusCode::NOT_FOUND, body);
        assert_eq!(error.message, "Item '3' not found");

        let error = ClientError::from_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(error.message, "upstream down");

        let error = ClientError::from_response(StatusCode::BAD_GATEWAY, "");
        assert_eq!(error.message, "Bad Gateway");
    }
}
