// =============================================================================
// ORDER HANDLERS
// =============================================================================

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath};
use crate::models::{ApiResponse, OrderDetails, PlaceOrderRequest};
use crate::AppState;

/// Places a cash-on-delivery order.
///
/// POST /orders
///
/// # Request
/// ```json
/// {
///   "customerName": "Amina Belkacem",
///   "customerPhone": "0550123456",
///   "customerEmail": "amina@example.com",
///   "deliveryAddress": "12 rue des Oliviers",
///   "city": "Oran",
///   "items": [{ "productId": "…", "quantity": 2 }]
/// }
/// ```
///
/// # Errors
/// - 400 validation, out of stock, insufficient stock
/// - 404 unknown product
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<PlaceOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderDetails>>)> {
    let details = state.orders.place_order(request).await?;
    let message = format!(
        "Order {} placed. We will call you to confirm delivery.",
        details.order.order_number
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(message, details)),
    ))
}

/// GET /orders/:orderNumber
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    ApiPath(order_number): ApiPath<String>,
) -> AppResult<Json<ApiResponse<OrderDetails>>> {
    let details = state.orders.find_by_number(&order_number).await?;
    Ok(Json(ApiResponse::ok(details)))
}
