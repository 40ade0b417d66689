//! Middleware for protecting authenticated routes and throttling logins.
//!
//! `session_auth` validates the `access_token` cookie and makes the caller
//! available to handlers as `Extension<CurrentUser>`. Every rejection reason
//! is logged separately but answered with the same 401.

use crate::api::common::service_error_to_http;
use crate::auth::cookie::session_token;
use crate::auth::rate_limit::client_key;
use crate::auth::service::AuthService;
use crate::errors::ServiceError;
use crate::state::AppState;
use axum::{
    Extension,
    extract::{ConnectInfo, Request},
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::{debug, error};

/// Session cookie authentication middleware
pub async fn session_auth(
    Extension(state): Extension<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let token = session_token(request.headers());

    match AuthService::new(&state)
        .authenticate_session(token.as_deref())
        .await
    {
        Ok(current) => {
            request.extensions_mut().insert(current);
            Ok(next.run(request).await)
        }
        Err(ServiceError::Unauthenticated { reason }) => {
            debug!(
                %reason,
                method = %request.method(),
                path = %request.uri().path(),
                "Rejected session"
            );
            Err(service_error_to_http(ServiceError::Unauthenticated { reason }))
        }
        Err(e) => {
            error!("Session validation failed: {}", e);
            Err(service_error_to_http(e))
        }
    }
}

/// Fixed-window throttle in front of the login endpoint
pub async fn login_rate_limit(
    Extension(state): Extension<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request.extensions().get::<ConnectInfo<SocketAddr>>();
    let key = client_key(request.headers(), peer, state.config.trust_proxy_headers);

    match state.login_limiter.check(&key) {
        Ok(()) => next.run(request).await,
        Err(retry_after_secs) => rate_limited(retry_after_secs),
    }
}

/// 429 answer carrying `Retry-After`.
pub fn rate_limited(retry_after_secs: u64) -> Response {
    let (status, body) = service_error_to_http(ServiceError::RateLimited { retry_after_secs });
    let mut response = (status, body).into_response();
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}
