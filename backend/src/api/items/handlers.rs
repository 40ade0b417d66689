//! Handler functions for inventory item endpoints.
//!
//! PATCH handlers honour `If-Unmodified-Since`; DELETE ignores it.

use crate::api::common::{
    ApiResponse, ListQuery, PaginatedData, PaginationMeta, parse_if_unmodified_since,
    service_error_to_http,
};
use crate::database::models::{CreateItem, Item, ItemPatch, StockPatch};
use crate::services::item_service::ItemService;
use crate::services::validate_input;
use axum::{
    extract::{Extension, Json, Path, Query},
    http::{HeaderMap, StatusCode},
    response::Json as ResponseJson,
};
use sqlx::SqlitePool;

/// Lists items, optionally filtered by a name substring.
#[axum::debug_handler]
pub async fn list_items(
    Extension(pool): Extension<SqlitePool>,
    Query(query): Query<ListQuery>,
) -> Result<ResponseJson<ApiResponse<PaginatedData<Item>>>, (StatusCode, String)> {
    validate_input(&query).map_err(service_error_to_http)?;
    let pagination = query.pagination();

    let (items, total) = ItemService::new(&pool)
        .list_items(query.search(), &pagination)
        .await
        .map_err(service_error_to_http)?;

    Ok(ResponseJson(ApiResponse::paginated(
        PaginatedData::new(items, total),
        PaginationMeta::from_filter(&pagination, total),
        "Items retrieved successfully",
    )))
}

#[axum::debug_handler]
pub async fn create_item(
    Extension(pool): Extension<SqlitePool>,
    Json(payload): Json<CreateItem>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Item>>), (StatusCode, String)> {
    let item = ItemService::new(&pool)
        .create_item(payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(item, "Item created successfully")),
    ))
}

#[axum::debug_handler]
pub async fn get_item(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Item>>, (StatusCode, String)> {
    match ItemService::new(&pool).get_item(id).await {
        Ok(item) => Ok(ResponseJson(ApiResponse::success(
            item,
            "Item retrieved successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

#[axum::debug_handler]
pub async fn update_item(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<ItemPatch>,
) -> Result<ResponseJson<ApiResponse<Item>>, (StatusCode, String)> {
    let precondition = parse_if_unmodified_since(&headers).map_err(service_error_to_http)?;

    let item = ItemService::new(&pool)
        .update_item(id, payload, precondition)
        .await
        .map_err(service_error_to_http)?;

    Ok(ResponseJson(ApiResponse::success(
        item,
        "Item updated successfully",
    )))
}

/// Adjusts the stock level by `delta` or sets it to `new_qty`.
#[axum::debug_handler]
pub async fn patch_stock(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<StockPatch>,
) -> Result<ResponseJson<ApiResponse<Item>>, (StatusCode, String)> {
    let precondition = parse_if_unmodified_since(&headers).map_err(service_error_to_http)?;

    let item = ItemService::new(&pool)
        .patch_stock(id, payload, precondition)
        .await
        .map_err(service_error_to_http)?;

    Ok(ResponseJson(ApiResponse::success(
        item,
        "Stock updated successfully",
    )))
}

#[axum::debug_handler]
pub async fn delete_item(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, (StatusCode, String)> {
    ItemService::new(&pool)
        .delete_item(id)
        .await
        .map_err(service_error_to_http)?;

    Ok(ResponseJson(ApiResponse::success((), "Item deleted successfully")))
}
