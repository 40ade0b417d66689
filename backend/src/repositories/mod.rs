//! Data access layer.
//!
//! Each repository wraps a borrowed `SqlitePool` and exposes the queries for
//! one table. Repositories return `anyhow::Result`; services translate the
//! errors into `ServiceError`.

pub mod category_repository;
pub mod item_repository;
pub mod token_blacklist_repository;
pub mod unit_repository;
pub mod user_repository;

/// `LIKE` pattern matching `term` as a literal substring; use with
/// `ESCAPE '\\'`.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
