//! Database repository for measurement units.

use crate::{
    api::common::PaginationFilter,
    database::models::{CreateUnit, Unit},
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use super::like_pattern;

const UNIT_COLUMNS: &str = "id, name, abbreviation, created_at, updated_at";

pub struct UnitRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UnitRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_unit(&self, unit: &CreateUnit) -> Result<Unit> {
        let now = Utc::now();
        let unit = sqlx::query_as::<_, Unit>(&format!(
            "INSERT INTO units (name, abbreviation, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             RETURNING {UNIT_COLUMNS}"
        ))
        .bind(&unit.name)
        .bind(&unit.abbreviation)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(unit)
    }

    pub async fn get_unit_by_id(&self, id: i64) -> Result<Option<Unit>> {
        let unit =
            sqlx::query_as::<_, Unit>(&format!("SELECT {UNIT_COLUMNS} FROM units WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(unit)
    }

    pub async fn list_units(
        &self,
        search: Option<&str>,
        pagination: &PaginationFilter,
    ) -> Result<Vec<Unit>> {
        let units = sqlx::query_as::<_, Unit>(&format!(
            "SELECT {UNIT_COLUMNS} FROM units
             WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\\')
             ORDER BY name ASC
             LIMIT ?2 OFFSET ?3"
        ))
        .bind(search.map(like_pattern).as_deref())
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(units)
    }

    pub async fn count_units(&self, search: Option<&str>) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM units WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\\')",
        )
        .bind(search.map(like_pattern).as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(count as u64)
    }

    pub async fn update_unit(
        &self,
        unit: &Unit,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<Option<Unit>> {
        let updated = sqlx::query_as::<_, Unit>(&format!(
            "UPDATE units SET name = ?, abbreviation = ?, updated_at = ?
             WHERE id = ? AND updated_at = ?
             RETURNING {UNIT_COLUMNS}"
        ))
        .bind(&unit.name)
        .bind(&unit.abbreviation)
        .bind(Utc::now())
        .bind(unit.id)
        .bind(expected_updated_at)
        .fetch_optional(self.pool)
        .await?;

        Ok(updated)
    }

    pub async fn delete_unit(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM units WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
