//! Module for inventory item API endpoints.
//!
//! Listing with search and pagination, creation, field updates, stock
//! changes and deletion of items.

pub mod handlers;
pub mod routes;
