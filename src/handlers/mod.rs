// =============================================================================
// HANDLERS MODULE
// =============================================================================
// HTTP request handlers (controller layer). Handlers extract and shape
// request data, call into the services and wrap results in `ApiResponse`.
//
// - `catalog`: public product/collection reads
// - `orders`:  public order placement and lookup
// - `content`: public page content and site settings
// - `admin`:   everything behind the admin gate
// =============================================================================

pub mod admin;
pub mod catalog;
pub mod content;
pub mod orders;

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::models::{HealthResponse, ReadinessChecks, ReadinessResponse};
use crate::AppState;

// =============================================================================
// HEALTH CHECK ENDPOINTS
// =============================================================================

/// Liveness probe
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness probe. Redis is only checked when one is configured.
///
/// GET /ready
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let db_healthy = state.store.health_check().await;

    let redis_healthy = match &state.redis {
        Some(conn) => Some(
            redis::cmd("PING")
                .query_async::<_, String>(&mut conn.clone())
                .await
                .is_ok(),
        ),
        None => None,
    };

    let ready = db_healthy && redis_healthy.unwrap_or(true);
    let response = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        checks: ReadinessChecks {
            database: db_healthy,
            redis: redis_healthy,
        },
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

// =============================================================================
// METRICS ENDPOINT
// =============================================================================

/// Prometheus text exposition
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
