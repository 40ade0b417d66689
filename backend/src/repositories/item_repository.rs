//! Database repository for inventory items.
//!
//! Writes to an existing item are conditional on its `updated_at` value so a
//! concurrent modification between read and write is never overwritten.

use crate::{
    api::common::PaginationFilter,
    database::models::{CreateItem, Item},
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use super::like_pattern;

const ITEM_COLUMNS: &str = "id, name, item_type, category_id, unit_id, quantity, notes, \
                            mealie_food_id, created_at, updated_at";

/// Repository for item database operations.
pub struct ItemRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> ItemRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new item.
    ///
    /// # Returns
    /// The newly created Item with all fields populated
    pub async fn create_item(&self, item: &CreateItem) -> Result<Item> {
        let now = Utc::now();
        let item = sqlx::query_as::<_, Item>(&format!(
            "INSERT INTO items
             (name, item_type, category_id, unit_id, quantity, notes, mealie_food_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(&item.name)
        .bind(item.item_type)
        .bind(item.category_id)
        .bind(item.unit_id)
        .bind(item.quantity.unwrap_or(0.0))
        .bind(item.notes.clone().unwrap_or_default())
        .bind(&item.mealie_food_id)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(item)
    }

    /// Retrieves an item by its identifier.
    pub async fn get_item_by_id(&self, id: i64) -> Result<Option<Item>> {
        let item =
            sqlx::query_as::<_, Item>(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(item)
    }

    /// Lists items ordered by name, optionally filtered by a name substring.
    pub async fn list_items(
        &self,
        search: Option<&str>,
        pagination: &PaginationFilter,
    ) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\\')
             ORDER BY name ASC
             LIMIT ?2 OFFSET ?3"
        ))
        .bind(search.map(like_pattern).as_deref())
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Counts items matching the optional name substring.
    pub async fn count_items(&self, search: Option<&str>) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM items WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\\')",
        )
        .bind(search.map(like_pattern).as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(count as u64)
    }

    /// Writes every mutable field of `item` if the stored `updated_at` still
    /// equals `expected_updated_at`.
    ///
    /// # Returns
    /// The stored item, or `None` if it was modified or deleted in between
    pub async fn update_item(
        &self,
        item: &Item,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<Option<Item>> {
        let updated = sqlx::query_as::<_, Item>(&format!(
            "UPDATE items
             SET name = ?, category_id = ?, unit_id = ?, quantity = ?, notes = ?, updated_at = ?
             WHERE id = ? AND updated_at = ?
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(&item.name)
        .bind(item.category_id)
        .bind(item.unit_id)
        .bind(item.quantity)
        .bind(&item.notes)
        .bind(Utc::now())
        .bind(item.id)
        .bind(expected_updated_at)
        .fetch_optional(self.pool)
        .await?;

        Ok(updated)
    }

    /// Deletes an item unconditionally.
    ///
    /// # Returns
    /// `true` if a row was removed
    pub async fn delete_item(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
