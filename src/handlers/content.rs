// =============================================================================
// CONTENT HANDLERS (public)
// =============================================================================

use axum::{extract::State, Json};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::extract::ApiPath;
use crate::models::{ApiResponse, PageContent};
use crate::AppState;

/// GET /content/:key
pub async fn get_page_content(
    State(state): State<Arc<AppState>>,
    ApiPath(key): ApiPath<String>,
) -> AppResult<Json<ApiResponse<PageContent>>> {
    let page = state
        .store
        .page_content(&key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Page content not found: {key}")))?;
    Ok(Json(ApiResponse::ok(page)))
}

/// Site settings as a flat `{ key: value }` map
///
/// GET /settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<BTreeMap<String, String>>>> {
    let settings = state
        .store
        .list_settings()
        .await?
        .into_iter()
        .map(|s| (s.key, s.value))
        .collect();
    Ok(Json(ApiResponse::ok(settings)))
}
