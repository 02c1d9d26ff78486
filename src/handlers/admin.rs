// =============================================================================
// ADMIN HANDLERS
// =============================================================================
// Back-office API. Every route here sits behind `auth::require_admin`, so a
// handler only runs once the shared secret has been checked.
// =============================================================================

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::catalog::{CollectionRecord, OrderQuery, ProductRecord};
use crate::content::{PageCopy, SeoContent};
use crate::error::{AppError, AppResult, FieldError};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{
    ApiResponse, Collection, CollectionInput, DashboardStats, GenerateDescriptionRequest,
    GeneratePageRequest, Order, OrderDetails, Page, PageContent, PageContentInput,
    PageContentUpdate, Product, ProductInput, SettingInput, SiteSetting, UpdateOrderStatusRequest,
};
use crate::store::product_not_found;
use crate::AppState;

// =============================================================================
// DASHBOARD
// =============================================================================

/// GET /admin/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    Ok(Json(ApiResponse::ok(state.store.dashboard_stats().await?)))
}

// =============================================================================
// PRODUCTS
// =============================================================================

/// POST /admin/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<ProductInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let record = ProductRecord::from_input(input)?;
    let product = state.store.create_product(&record).await?;
    tracing::info!(slug = %product.slug, quantity = product.quantity, "Product created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Product created", product)),
    ))
}

/// PUT /admin/products/:id
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<ProductInput>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let record = ProductRecord::from_input(input)?;
    let product = state.store.update_product(id, &record).await?;
    tracing::info!(slug = %product.slug, quantity = product.quantity, "Product updated");
    Ok(Json(ApiResponse::with_message("Product updated", product)))
}

/// DELETE /admin/products/:id
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.store.delete_product(id).await?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(Json(ApiResponse::with_message("Product deleted", ())))
}

// =============================================================================
// COLLECTIONS
// =============================================================================

/// POST /admin/collections
pub async fn create_collection(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<CollectionInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Collection>>)> {
    let record = CollectionRecord::from_input(input)?;
    let collection = state.store.create_collection(&record).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Collection created", collection)),
    ))
}

/// PUT /admin/collections/:id
pub async fn update_collection(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CollectionInput>,
) -> AppResult<Json<ApiResponse<Collection>>> {
    let record = CollectionRecord::from_input(input)?;
    let collection = state.store.update_collection(id, &record).await?;
    Ok(Json(ApiResponse::with_message("Collection updated", collection)))
}

/// DELETE /admin/collections/:id
pub async fn delete_collection(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.store.delete_collection(id).await?;
    Ok(Json(ApiResponse::with_message("Collection deleted", ())))
}

// =============================================================================
// ORDERS
// =============================================================================

/// GET /admin/orders?status=&limit=&offset=
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> AppResult<Json<ApiResponse<Page<Order>>>> {
    let page = state.orders.list(&query.into_filter()).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /admin/orders/:id
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetails>>> {
    Ok(Json(ApiResponse::ok(state.orders.find_by_id(id).await?)))
}

/// PATCH /admin/orders/:id/status
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.update_status(id, request.status).await?;
    let message = format!("Order status is now {}", order.status.as_str());
    Ok(Json(ApiResponse::with_message(message, order)))
}

// =============================================================================
// CONTENT & SETTINGS
// =============================================================================

/// GET /admin/content
pub async fn list_page_content(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<PageContent>>>> {
    Ok(Json(ApiResponse::ok(state.store.list_page_content().await?)))
}

/// POST /admin/content
pub async fn create_page_content(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<PageContentInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<PageContent>>)> {
    input.validate()?;
    let page = state
        .store
        .create_page_content(input.key.trim(), input.title.trim(), &input.content)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Page content created", page)),
    ))
}

/// PUT /admin/content/:key
pub async fn update_page_content(
    State(state): State<Arc<AppState>>,
    ApiPath(key): ApiPath<String>,
    ApiJson(input): ApiJson<PageContentUpdate>,
) -> AppResult<Json<ApiResponse<PageContent>>> {
    let page = state
        .store
        .update_page_content(&key, input.title.trim(), &input.content)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Page content not found: {key}")))?;
    Ok(Json(ApiResponse::with_message("Page content updated", page)))
}

/// PUT /admin/settings/:key
pub async fn upsert_setting(
    State(state): State<Arc<AppState>>,
    ApiPath(key): ApiPath<String>,
    ApiJson(input): ApiJson<SettingInput>,
) -> AppResult<Json<ApiResponse<SiteSetting>>> {
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::Validation(vec![FieldError::new(
            "key",
            "must not be empty",
        )]));
    }
    let setting = state.store.upsert_setting(key, &input.value).await?;
    Ok(Json(ApiResponse::with_message("Setting saved", setting)))
}

// =============================================================================
// GENERATED COPY
// =============================================================================

/// POST /admin/ai/product-description
pub async fn generate_product_description(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<GenerateDescriptionRequest>,
) -> AppResult<Json<ApiResponse<SeoContent>>> {
    let product = state
        .store
        .product_by_id(request.product_id)
        .await?
        .ok_or_else(|| product_not_found(request.product_id))?;
    let content = state.content.product_description(&product).await;
    Ok(Json(ApiResponse::ok(content)))
}

/// POST /admin/ai/page-content
pub async fn generate_page_content(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<GeneratePageRequest>,
) -> AppResult<Json<ApiResponse<PageCopy>>> {
    request.validate()?;
    let brief = request.brief.as_deref().map(str::trim).filter(|b| !b.is_empty());
    let copy = state.content.page_copy(request.page.trim(), brief).await;
    Ok(Json(ApiResponse::ok(copy)))
}
