//! Handler functions for the reference data endpoints (categories and units).

use crate::api::common::{
    ApiResponse, ListQuery, PaginatedData, PaginationMeta, parse_if_unmodified_since,
    service_error_to_http,
};
use crate::database::models::{
    Category, CategoryPatch, CreateCategory, CreateUnit, Unit, UnitPatch,
};
use crate::services::category_service::CategoryService;
use crate::services::unit_service::UnitService;
use crate::services::validate_input;
use axum::{
    extract::{Extension, Json, Path, Query},
    http::{HeaderMap, StatusCode},
    response::Json as ResponseJson,
};
use sqlx::SqlitePool;

// ============================================================================
// Categories
// ============================================================================

#[axum::debug_handler]
pub async fn list_categories(
    Extension(pool): Extension<SqlitePool>,
    Query(query): Query<ListQuery>,
) -> Result<ResponseJson<ApiResponse<PaginatedData<Category>>>, (StatusCode, String)> {
    validate_input(&query).map_err(service_error_to_http)?;
    let pagination = query.pagination();

    let (categories, total) = CategoryService::new(&pool)
        .list_categories(query.search(), &pagination)
        .await
        .map_err(service_error_to_http)?;

    Ok(ResponseJson(ApiResponse::paginated(
        PaginatedData::new(categories, total),
        PaginationMeta::from_filter(&pagination, total),
        "Categories retrieved successfully",
    )))
}

#[axum::debug_handler]
pub async fn create_category(
    Extension(pool): Extension<SqlitePool>,
    Json(payload): Json<CreateCategory>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Category>>), (StatusCode, String)> {
    let category = CategoryService::new(&pool)
        .create_category(payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(
            category,
            "Category created successfully",
        )),
    ))
}

#[axum::debug_handler]
pub async fn get_category(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Category>>, (StatusCode, String)> {
    match CategoryService::new(&pool).get_category(id).await {
        Ok(category) => Ok(ResponseJson(ApiResponse::success(
            category,
            "Category retrieved successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

#[axum::debug_handler]
pub async fn update_category(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<CategoryPatch>,
) -> Result<ResponseJson<ApiResponse<Category>>, (StatusCode, String)> {
    let precondition = parse_if_unmodified_since(&headers).map_err(service_error_to_http)?;

    let category = CategoryService::new(&pool)
        .update_category(id, payload, precondition)
        .await
        .map_err(service_error_to_http)?;

    Ok(ResponseJson(ApiResponse::success(
        category,
        "Category updated successfully",
    )))
}

#[axum::debug_handler]
pub async fn delete_category(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, (StatusCode, String)> {
    CategoryService::new(&pool)
        .delete_category(id)
        .await
        .map_err(service_error_to_http)?;

    Ok(ResponseJson(ApiResponse::success(
        (),
        "Category deleted successfully",
    )))
}

// ============================================================================
// Units
// ============================================================================

#[axum::debug_handler]
pub async fn list_units(
    Extension(pool): Extension<SqlitePool>,
    Query(query): Query<ListQuery>,
) -> Result<ResponseJson<ApiResponse<PaginatedData<Unit>>>, (StatusCode, String)> {
    validate_input(&query).map_err(service_error_to_http)?;
    let pagination = query.pagination();

    let (units, total) = UnitService::new(&pool)
        .list_units(query.search(), &pagination)
        .await
        .map_err(service_error_to_http)?;

    Ok(ResponseJson(ApiResponse::paginated(
        PaginatedData::new(units, total),
        PaginationMeta::from_filter(&pagination, total),
        "Units retrieved successfully",
    )))
}

#[axum::debug_handler]
pub async fn create_unit(
    Extension(pool): Extension<SqlitePool>,
    Json(payload): Json<CreateUnit>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Unit>>), (StatusCode, String)> {
    let unit = UnitService::new(&pool)
        .create_unit(payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(unit, "Unit created successfully")),
    ))
}

#[axum::debug_handler]
pub async fn get_unit(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Unit>>, (StatusCode, String)> {
    match UnitService::new(&pool).get_unit(id).await {
        Ok(unit) => Ok(ResponseJson(ApiResponse::success(
            unit,
            "Unit retrieved successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

#[axum::debug_handler]
pub async fn update_unit(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<UnitPatch>,
) -> Result<ResponseJson<ApiResponse<Unit>>, (StatusCode, String)> {
    let precondition = parse_if_unmodified_since(&headers).map_err(service_error_to_http)?;

    let unit = UnitService::new(&pool)
        .update_unit(id, payload, precondition)
        .await
        .map_err(service_error_to_http)?;

    Ok(ResponseJson(ApiResponse::success(
        unit,
        "Unit updated successfully",
    )))
}

#[axum::debug_handler]
pub async fn delete_unit(
    Extension(pool): Extension<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, (StatusCode, String)> {
    UnitService::new(&pool)
        .delete_unit(id)
        .await
        .map_err(service_error_to_http)?;

    Ok(ResponseJson(ApiResponse::success((), "Unit deleted successfully")))
}
