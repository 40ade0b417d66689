//! Authentication module for managing user sessions and access control.
//!
//! This module provides the public interface for authentication-related
//! functionality such as login, logout, registration, credential changes,
//! the session cookie contract and the session/throttling middleware.

pub mod cookie;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod service;
