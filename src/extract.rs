// =============================================================================
// EXTRACTORS
// =============================================================================
// Wrappers around axum's Json/Query/Path whose rejections are `AppError`,
// so malformed input gets the same `{ success: false, ... }` body as every
// other failure.
//
// LEARNING NOTE:
// `via(axum::Json)` runs the stock extractor first; its rejection is then
// converted with `From<JsonRejection> for AppError` (see error.rs).
// =============================================================================

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
