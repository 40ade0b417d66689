//! HomeStock backend library.
//!
//! A household inventory service (items, categories, units) behind
//! cookie-based JWT sessions with server-side revocation, plus the client
//! side of the session protocol and an optimistic update controller.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod database;
pub mod errors;
pub mod repositories;
pub mod services;
pub mod state;
pub mod utils;

use axum::{
    Extension, Router,
    http::{HeaderValue, Method, header},
    response::Json,
    routing::get,
};
use serde_json::{Value, json};
use state::AppState;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Builds the complete HTTP application around the shared state.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/api/healthz", get(healthz))
        .nest("/api/auth", auth::routes::auth_router())
        .nest("/api/items", api::items::routes::item_router())
        .nest("/api/data", api::data::routes::data_router())
        .layer(Extension(state.pool.clone()))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::IF_UNMODIFIED_SINCE])
        .max_age(Duration::from_secs(600))
}

async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true }))
}
