//! Item business logic service.
//!
//! Every write to an existing item is a read, an optional freshness check
//! against the client's `If-Unmodified-Since`, then a compare-and-swap on
//! `updated_at`. A lost swap re-reads the row: with a precondition the next
//! round reports `PreconditionFailed` (or `NotFound` after a delete), without
//! one the write is simply retried against the new state.

use crate::api::common::PaginationFilter;
use crate::database::models::{CreateItem, Item, ItemPatch, StockPatch};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::category_repository::CategoryRepository;
use crate::repositories::item_repository::ItemRepository;
use crate::repositories::unit_repository::UnitRepository;
use crate::services::{MAX_WRITE_ATTEMPTS, UnmodifiedSince, check_unmodified_since, validate_input};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

pub struct ItemService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ItemService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Lists one page of items plus the total number of matches.
    pub async fn list_items(
        &self,
        search: Option<&str>,
        pagination: &PaginationFilter,
    ) -> ServiceResult<(Vec<Item>, u64)> {
        let repo = ItemRepository::new(self.pool);
        let items = repo.list_items(search, pagination).await?;
        let total = repo.count_items(search).await?;
        Ok((items, total))
    }

    pub async fn get_item(&self, id: i64) -> ServiceResult<Item> {
        ItemRepository::new(self.pool)
            .get_item_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item", id))
    }

    /// Creates an item after validating the input and its references.
    pub async fn create_item(&self, item: CreateItem) -> ServiceResult<Item> {
        validate_input(&item)?;
        if item.quantity.is_some_and(|q| !q.is_finite()) {
            return Err(ServiceError::validation("quantity: Quantity must be a finite number"));
        }
        self.check_references(item.category_id, item.unit_id).await?;

        let created = ItemRepository::new(self.pool)
            .create_item(&item)
            .await
            .map_err(|e| ServiceError::from_write(e, "Item", &item.name))?;

        info!(item_id = created.id, name = %created.name, "Item created");
        Ok(created)
    }

    /// Applies a partial update. An empty patch is rejected.
    pub async fn update_item(
        &self,
        id: i64,
        patch: ItemPatch,
        precondition: Option<UnmodifiedSince>,
    ) -> ServiceResult<Item> {
        if patch.is_empty() {
            return Err(ServiceError::validation("No fields to update"));
        }
        validate_input(&patch)?;
        self.check_references(patch.category_id, patch.unit_id).await?;

        self.write(id, precondition, |item| {
            if let Some(name) = &patch.name {
                item.name = name.clone();
            }
            if let Some(category_id) = patch.category_id {
                item.category_id = Some(category_id);
            }
            if let Some(unit_id) = patch.unit_id {
                item.unit_id = Some(unit_id);
            }
            if let Some(notes) = &patch.notes {
                item.notes = notes.clone();
            }
            Ok(())
        })
        .await
    }

    /// Changes the stock level by `delta` or sets it to `new_qty`.
    ///
    /// # Errors
    /// `Validation` when both or neither field is given, or when the
    /// resulting quantity would be negative.
    pub async fn patch_stock(
        &self,
        id: i64,
        patch: StockPatch,
        precondition: Option<UnmodifiedSince>,
    ) -> ServiceResult<Item> {
        let change = match (patch.delta, patch.new_qty) {
            (Some(delta), None) => StockChange::Delta(delta),
            (None, Some(new_qty)) => StockChange::Set(new_qty),
            _ => {
                return Err(ServiceError::validation(
                    "Provide exactly one of delta or new_qty",
                ));
            }
        };

        self.write(id, precondition, |item| {
            let quantity = match change {
                StockChange::Delta(delta) => item.quantity + delta,
                StockChange::Set(new_qty) => new_qty,
            };
            if !quantity.is_finite() {
                return Err(ServiceError::validation("quantity: Quantity must be a finite number"));
            }
            if quantity < 0.0 {
                return Err(ServiceError::validation(format!(
                    "quantity: Resulting quantity {} would be negative",
                    quantity
                )));
            }
            item.quantity = quantity;
            Ok(())
        })
        .await
    }

    /// Deletes an item. Deletes are never subject to a precondition.
    pub async fn delete_item(&self, id: i64) -> ServiceResult<()> {
        if !ItemRepository::new(self.pool).delete_item(id).await? {
            return Err(ServiceError::not_found("Item", id));
        }

        info!(item_id = id, "Item deleted");
        Ok(())
    }

    async fn check_references(
        &self,
        category_id: Option<i64>,
        unit_id: Option<i64>,
    ) -> ServiceResult<()> {
        if let Some(category_id) = category_id {
            let exists = CategoryRepository::new(self.pool)
                .get_category_by_id(category_id)
                .await?
                .is_some();
            if !exists {
                return Err(ServiceError::validation(format!(
                    "category_id: Category {} does not exist",
                    category_id
                )));
            }
        }

        if let Some(unit_id) = unit_id {
            let exists = UnitRepository::new(self.pool)
                .get_unit_by_id(unit_id)
                .await?
                .is_some();
            if !exists {
                return Err(ServiceError::validation(format!(
                    "unit_id: Unit {} does not exist",
                    unit_id
                )));
            }
        }

        Ok(())
    }

    async fn write<F>(
        &self,
        id: i64,
        precondition: Option<UnmodifiedSince>,
        mut apply: F,
    ) -> ServiceResult<Item>
    where
        F: FnMut(&mut Item) -> ServiceResult<()>,
    {
        let repo = ItemRepository::new(self.pool);

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = repo
                .get_item_by_id(id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Item", id))?;
            check_unmodified_since("Item", id, current.updated_at, precondition)?;

            let mut next = current.clone();
            apply(&mut next)?;

            let stored = repo
                .update_item(&next, current.updated_at)
                .await
                .map_err(|e| ServiceError::from_write(e, "Item", &next.name))?;

            if let Some(updated) = stored {
                debug!(item_id = id, attempt, "Item updated");
                return Ok(updated);
            }
            debug!(item_id = id, attempt, "Item changed during write, re-reading");
        }

        warn!(item_id = id, "Giving up on contended item write");
        Err(ServiceError::precondition_failed("Item", id))
    }
}

#[derive(Debug, Clone, Copy)]
enum StockChange {
    Delta(f64),
    Set(f64),
}
