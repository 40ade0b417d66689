//! Defines the HTTP routes specifically for authentication.
//!
//! These routes handle login, logout, registration and the current user's
//! session and credentials. They are nested under `/api/auth`.

use crate::auth::handlers::*;
use crate::auth::middleware::*;
use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

/// Creates the authentication router with all auth-related routes
pub fn auth_router() -> Router {
    let protected = Router::new()
        .route("/me", get(me).delete(delete_account))
        .route("/me/password", patch(change_password))
        .route("/me/username", patch(change_username))
        .route_layer(middleware::from_fn(session_auth));

    Router::new()
        .route(
            "/token",
            post(login).route_layer(middleware::from_fn(login_rate_limit)),
        )
        .route("/register", post(register))
        .route("/logout", post(logout))
        .merge(protected)
}
