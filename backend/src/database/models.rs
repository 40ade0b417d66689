//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database, together with the validated input DTOs used to create
//! and patch them. Note that these may differ from API-specific models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Embedded in every issued token; bumping it revokes them all.
    pub session_epoch: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RevokedToken {
    pub jti: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: DateTime<Utc>,
}

/// Snapshot of the revocation ledger size.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct BlacklistStats {
    pub total: i64,
    pub expired: i64,
    pub active: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Food,
    Household,
    Equipment,
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemType::Food => write!(f, "food"),
            ItemType::Household => write!(f, "household"),
            ItemType::Equipment => write!(f, "equipment"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub item_type: ItemType,
    pub category_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub quantity: f64,
    pub notes: String,
    pub mealie_food_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1-200 characters"))]
    pub name: String,

    pub item_type: ItemType,

    pub category_id: Option<i64>,

    pub unit_id: Option<i64>,

    #[validate(range(min = 0.0, message = "Quantity must be non-negative"))]
    pub quantity: Option<f64>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Mealie food ID must be 1-100 characters"))]
    pub mealie_food_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ItemPatch {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1-200 characters"))]
    pub name: Option<String>,

    pub category_id: Option<i64>,

    pub unit_id: Option<i64>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category_id.is_none()
            && self.unit_id.is_none()
            && self.notes.is_none()
    }
}

/// Stock change: either a relative `delta` or an absolute `new_qty`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockPatch {
    pub delta: Option<f64>,
    pub new_qty: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CategoryPatch {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub abbreviation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUnit {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1-50 characters"))]
    pub name: String,

    #[validate(length(max = 20, message = "Abbreviation must be at most 20 characters"))]
    pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UnitPatch {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1-50 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 20, message = "Abbreviation must be at most 20 characters"))]
    pub abbreviation: Option<String>,
}

/// Usernames are 3-50 characters of ASCII letters, digits, `_` or `-`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let length_ok = (3..=50).contains(&username.chars().count());
    let charset_ok = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if !length_ok || !charset_ok {
        return Err(ValidationError::new("username").with_message(
            "Username must be 3-50 characters: letters, digits, underscores or hyphens".into(),
        ));
    }
    Ok(())
}
