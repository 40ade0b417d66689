//! Unit of measure business logic service.

use crate::api::common::PaginationFilter;
use crate::database::models::{CreateUnit, Unit, UnitPatch};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::unit_repository::UnitRepository;
use crate::services::{MAX_WRITE_ATTEMPTS, UnmodifiedSince, check_unmodified_since, validate_input};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

pub struct UnitService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UnitService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_units(
        &self,
        search: Option<&str>,
        pagination: &PaginationFilter,
    ) -> ServiceResult<(Vec<Unit>, u64)> {
        let repo = UnitRepository::new(self.pool);
        let units = repo.list_units(search, pagination).await?;
        let total = repo.count_units(search).await?;
        Ok((units, total))
    }

    pub async fn get_unit(&self, id: i64) -> ServiceResult<Unit> {
        UnitRepository::new(self.pool)
            .get_unit_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Unit", id))
    }

    pub async fn create_unit(&self, unit: CreateUnit) -> ServiceResult<Unit> {
        validate_input(&unit)?;

        let created = UnitRepository::new(self.pool)
            .create_unit(&unit)
            .await
            .map_err(|e| ServiceError::from_write(e, "Unit", &unit.name))?;

        info!(unit_id = created.id, name = %created.name, "Unit created");
        Ok(created)
    }

    pub async fn update_unit(
        &self,
        id: i64,
        patch: UnitPatch,
        precondition: Option<UnmodifiedSince>,
    ) -> ServiceResult<Unit> {
        if patch.name.is_none() && patch.abbreviation.is_none() {
            return Err(ServiceError::validation("No fields to update"));
        }
        validate_input(&patch)?;

        let repo = UnitRepository::new(self.pool);
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.get_unit(id).await?;
            check_unmodified_since("Unit", id, current.updated_at, precondition)?;

            let mut next = current.clone();
            if let Some(name) = &patch.name {
                next.name = name.clone();
            }
            if let Some(abbreviation) = &patch.abbreviation {
                next.abbreviation = Some(abbreviation.clone());
            }

            let stored = repo
                .update_unit(&next, current.updated_at)
                .await
                .map_err(|e| ServiceError::from_write(e, "Unit", &next.name))?;
            if let Some(updated) = stored {
                info!(unit_id = id, "Unit updated");
                return Ok(updated);
            }
            debug!(unit_id = id, attempt, "Unit changed during write, re-reading");
        }

        warn!(unit_id = id, "Giving up on contended unit write");
        Err(ServiceError::precondition_failed("Unit", id))
    }

    pub async fn delete_unit(&self, id: i64) -> ServiceResult<()> {
        if !UnitRepository::new(self.pool).delete_unit(id).await? {
            return Err(ServiceError::not_found("Unit", id));
        }

        info!(unit_id = id, "Unit deleted");
        Ok(())
    }
}
