//! Defines the HTTP routes for inventory items.

use super::handlers::{create_item, delete_item, get_item, list_items, patch_stock, update_item};
use crate::auth::middleware::session_auth;
use axum::{
    Router, middleware,
    routing::{get, patch},
};

pub fn item_router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route(
            "/{id}",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/{id}/stock", patch(patch_stock))
        .route_layer(middleware::from_fn(session_auth))
}
