//! Database repository for item categories.

use crate::{
    api::common::PaginationFilter,
    database::models::{Category, CreateCategory},
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use super::like_pattern;

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

pub struct CategoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CategoryRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_category(&self, category: &CreateCategory) -> Result<Category> {
        let now = Utc::now();
        let category = sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(&category.name)
        .bind(&category.description)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(category)
    }

    pub async fn get_category_by_id(&self, id: i64) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    pub async fn list_categories(
        &self,
        search: Option<&str>,
        pagination: &PaginationFilter,
    ) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories
             WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\\')
             ORDER BY name ASC
             LIMIT ?2 OFFSET ?3"
        ))
        .bind(search.map(like_pattern).as_deref())
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn count_categories(&self, search: Option<&str>) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM categories WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\\')",
        )
        .bind(search.map(like_pattern).as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(count as u64)
    }

    /// Conditional write, see `ItemRepository::update_item`.
    pub async fn update_category(
        &self,
        category: &Category,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<Option<Category>> {
        let updated = sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET name = ?, description = ?, updated_at = ?
             WHERE id = ? AND updated_at = ?
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(&category.name)
        .bind(&category.description)
        .bind(Utc::now())
        .bind(category.id)
        .bind(expected_updated_at)
        .fetch_optional(self.pool)
        .await?;

        Ok(updated)
    }

    /// Items referencing the category keep existing with `category_id = NULL`.
    pub async fn delete_category(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
