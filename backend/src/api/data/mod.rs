//! Module for the reference data API endpoints.
//!
//! Categories and units that items may point at.

pub mod handlers;
pub mod routes;
