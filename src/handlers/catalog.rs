// =============================================================================
// CATALOG HANDLERS (public)
// =============================================================================

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::catalog::ProductQuery;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, ApiQuery};
use crate::models::{
    ApiResponse, CollectionSummary, CollectionWithProducts, Page, ProductWithCollection,
};
use crate::AppState;

/// GET /products?collection=&minPrice=&maxPrice=&stockStatus=&search=&limit=&offset=
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> AppResult<Json<ApiResponse<Page<ProductWithCollection>>>> {
    let filter = query.into_filter()?;
    let page = state.store.list_products(&filter).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /products/:slug
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<Json<ApiResponse<ProductWithCollection>>> {
    let product = find_product(&state, &slug).await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// schema.org JSON-LD for the product page
///
/// GET /products/:slug/structured-data
pub async fn product_structured_data(
    State(state): State<Arc<AppState>>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<Json<serde_json::Value>> {
    let product = find_product(&state, &slug).await?;
    Ok(Json(state.content.product_structured_data(&product)))
}

/// GET /collections
pub async fn list_collections(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<CollectionSummary>>>> {
    let collections = state.store.list_collections().await?;
    Ok(Json(ApiResponse::ok(collections)))
}

/// GET /collections/:slug
pub async fn get_collection(
    State(state): State<Arc<AppState>>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<Json<ApiResponse<CollectionWithProducts>>> {
    let collection = state
        .store
        .collection_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Collection not found: {slug}")))?;
    Ok(Json(ApiResponse::ok(collection)))
}

async fn find_product(state: &AppState, slug: &str) -> AppResult<ProductWithCollection> {
    state
        .store
        .product_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {slug}")))
}
