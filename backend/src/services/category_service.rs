//! Category business logic service.

use crate::api::common::PaginationFilter;
use crate::database::models::{Category, CategoryPatch, CreateCategory};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::category_repository::CategoryRepository;
use crate::services::{MAX_WRITE_ATTEMPTS, UnmodifiedSince, check_unmodified_since, validate_input};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

pub struct CategoryService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CategoryService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_categories(
        &self,
        search: Option<&str>,
        pagination: &PaginationFilter,
    ) -> ServiceResult<(Vec<Category>, u64)> {
        let repo = CategoryRepository::new(self.pool);
        let categories = repo.list_categories(search, pagination).await?;
        let total = repo.count_categories(search).await?;
        Ok((categories, total))
    }

    pub async fn get_category(&self, id: i64) -> ServiceResult<Category> {
        CategoryRepository::new(self.pool)
            .get_category_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", id))
    }

    pub async fn create_category(&self, category: CreateCategory) -> ServiceResult<Category> {
        validate_input(&category)?;

        let created = CategoryRepository::new(self.pool)
            .create_category(&category)
            .await
            .map_err(|e| ServiceError::from_write(e, "Category", &category.name))?;

        info!(category_id = created.id, name = %created.name, "Category created");
        Ok(created)
    }

    /// Partial update guarded by the optional freshness precondition.
    pub async fn update_category(
        &self,
        id: i64,
        patch: CategoryPatch,
        precondition: Option<UnmodifiedSince>,
    ) -> ServiceResult<Category> {
        if patch.name.is_none() && patch.description.is_none() {
            return Err(ServiceError::validation("No fields to update"));
        }
        validate_input(&patch)?;

        let repo = CategoryRepository::new(self.pool);
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.get_category(id).await?;
            check_unmodified_since("Category", id, current.updated_at, precondition)?;

            let mut next = current.clone();
            if let Some(name) = &patch.name {
                next.name = name.clone();
            }
            if let Some(description) = &patch.description {
                next.description = Some(description.clone());
            }

            let stored = repo
                .update_category(&next, current.updated_at)
                .await
                .map_err(|e| ServiceError::from_write(e, "Category", &next.name))?;
            if let Some(updated) = stored {
                info!(category_id = id, "Category updated");
                return Ok(updated);
            }
            debug!(category_id = id, attempt, "Category changed during write, re-reading");
        }

        warn!(category_id = id, "Giving up on contended category write");
        Err(ServiceError::precondition_failed("Category", id))
    }

    /// Deletes a category; items that referenced it keep existing uncategorised.
    pub async fn delete_category(&self, id: i64) -> ServiceResult<()> {
        if !CategoryRepository::new(self.pool).delete_category(id).await? {
            return Err(ServiceError::not_found("Category", id));
        }

        info!(category_id = id, "Category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use chrono::Duration;

    fn dairy() -> CreateCategory {
        CreateCategory {
            name: "Dairy".to_string(),
            description: Some("Milk, cheese".to_string()),
        }
    }

    #[tokio::test]
    async fn test_category_crud() {
        let db = Database::in_memory().await.unwrap();
        let service = CategoryService::new(db.pool());

        let created = service.create_category(dairy()).await.unwrap();
        assert!(matches!(
            service.create_category(dairy()).await,
            Err(ServiceError::AlreadyExists { .. })
        ));

        let renamed = service
            .update_category(
                created.id,
                CategoryPatch {
                    name: Some("Chilled".to_string()),
                    description: None,
                },
                Some(UnmodifiedSince::exact(created.updated_at)),
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Chilled");
        assert_eq!(renamed.description.as_deref(), Some("Milk, cheese"));

        let (categories, total) = service
            .list_categories(None, &PaginationFilter::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(categories[0].id, created.id);

        service.delete_category(created.id).await.unwrap();
        assert!(matches!(
            service.get_category(created.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_category_stale_update() {
        let db = Database::in_memory().await.unwrap();
        let service = CategoryService::new(db.pool());
        let created = service.create_category(dairy()).await.unwrap();

        let result = service
            .update_category(
                created.id,
                CategoryPatch {
                    name: Some("Chilled".to_string()),
                    description: None,
                },
                Some(UnmodifiedSince::exact(created.updated_at - Duration::minutes(1))),
            )
            .await;
        assert!(matches!(result, Err(ServiceError::PreconditionFailed { .. })));

        assert!(matches!(
            service
                .update_category(created.id, CategoryPatch::default(), None)
                .await,
            Err(ServiceError::Validation { .. })
        ));
    }
}
