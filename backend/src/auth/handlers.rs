//! Handler functions for authentication-related API endpoints.
//!
//! These functions process incoming HTTP requests for login, logout,
//! registration and credential changes, and translate the outcome of
//! `auth::service` into cookies and JSON bodies.

use crate::api::common::service_error_to_http;
use crate::auth::cookie::{clear_session_cookie, session_cookie, session_token};
use crate::auth::middleware::rate_limited;
use crate::auth::models::*;
use crate::auth::service::{AuthService, CurrentUser};
use crate::errors::ServiceError;
use crate::state::AppState;
use axum::{
    Form,
    extract::{Extension, Json},
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Json as ResponseJson, Response},
};

type SetCookie = [(axum::http::HeaderName, HeaderValue); 1];

/// Handle login form submission
#[axum::debug_handler]
pub async fn login(
    Extension(state): Extension<AppState>,
    Form(payload): Form<LoginRequest>,
) -> Result<(SetCookie, ResponseJson<LoginResponse>), Response> {
    let (user, issued) = AuthService::new(&state)
        .login(payload)
        .await
        .map_err(|e| match e {
            ServiceError::RateLimited { retry_after_secs } => rate_limited(retry_after_secs),
            other => service_error_to_http(other).into_response(),
        })?;

    let response = LoginResponse {
        message: "Login successful".to_string(),
        token_type: "bearer".to_string(),
        username: user.username,
    };

    Ok((
        [(SET_COOKIE, session_cookie(&state.config, &issued.token))],
        ResponseJson(response),
    ))
}

/// Handle logout. Always succeeds and always clears the cookie.
#[axum::debug_handler]
pub async fn logout(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> (SetCookie, ResponseJson<MessageResponse>) {
    AuthService::new(&state)
        .logout(session_token(&headers).as_deref())
        .await;

    (
        [(SET_COOKIE, clear_session_cookie(&state.config))],
        ResponseJson(MessageResponse::new("Logged out successfully")),
    )
}

/// Handle user registration
#[axum::debug_handler]
pub async fn register(
    Extension(state): Extension<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, ResponseJson<UserInfo>), (StatusCode, String)> {
    let user = AuthService::new(&state)
        .register(payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((StatusCode::CREATED, ResponseJson(user)))
}

/// Get current user information from the session
#[axum::debug_handler]
pub async fn me(Extension(current): Extension<CurrentUser>) -> ResponseJson<UserInfo> {
    ResponseJson(UserInfo::from(&current.user))
}

/// Change the password; ends every session of the user.
#[axum::debug_handler]
pub async fn change_password(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<(SetCookie, ResponseJson<MessageResponse>), (StatusCode, String)> {
    AuthService::new(&state)
        .change_password(&current, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        [(SET_COOKIE, clear_session_cookie(&state.config))],
        ResponseJson(MessageResponse::new(
            "Password changed, please log in again",
        )),
    ))
}

/// Change the username; ends every session of the user.
#[axum::debug_handler]
pub async fn change_username(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<ChangeUsernameRequest>,
) -> Result<(SetCookie, ResponseJson<UserInfo>), (StatusCode, String)> {
    let user = AuthService::new(&state)
        .change_username(&current, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        [(SET_COOKIE, clear_session_cookie(&state.config))],
        ResponseJson(user),
    ))
}

/// Delete the current account
#[axum::debug_handler]
pub async fn delete_account(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<(SetCookie, ResponseJson<MessageResponse>), (StatusCode, String)> {
    AuthService::new(&state)
        .delete_account(&current, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        [(SET_COOKIE, clear_session_cookie(&state.config))],
        ResponseJson(MessageResponse::new("Account deleted")),
    ))
}
