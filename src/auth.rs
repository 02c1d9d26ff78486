// =============================================================================
// ADMIN GATE
// =============================================================================
// Every `/admin/*` route requires the shared admin secret in the
// `x-admin-password` header. There are no sessions or user accounts.
// =============================================================================

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::AppState;

pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !is_authorized(request.headers(), &state.admin_password) {
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}

fn is_authorized(headers: &HeaderMap, expected: &str) -> bool {
    match headers.get(ADMIN_PASSWORD_HEADER).map(|v| v.as_bytes()) {
        Some(given) => constant_time_eq(given, expected.as_bytes()),
        None => false,
    }
}

/// Compares without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
