//! Defines the HTTP routes for categories and units.

use super::handlers::*;
use crate::auth::middleware::session_auth;
use axum::{Router, middleware, routing::get};

pub fn data_router() -> Router {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
        .route("/units", get(list_units).post(create_unit))
        .route(
            "/units/{id}",
            get(get_unit).patch(update_unit).delete(delete_unit),
        )
        .route_layer(middleware::from_fn(session_auth))
}
