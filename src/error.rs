// =============================================================================
// ERROR MODULE
// =============================================================================
// Custom error type and its HTTP response mapping.
//
// - Validation and business-rule failures are expected; they go back to the
//   caller with a specific message.
// - Storage and internal failures are logged in full and reach the caller
//   only as a generic message.
// =============================================================================

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

// =============================================================================
// CUSTOM ERROR TYPE
// =============================================================================
#[derive(Debug, Error)]
pub enum AppError {
    // -------------------------------------------------------------------------
    // CLIENT INPUT ERRORS
    // -------------------------------------------------------------------------
    /// One or more fields failed validation
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Request body could not be decoded
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // -------------------------------------------------------------------------
    // BUSINESS LOGIC ERRORS
    // -------------------------------------------------------------------------
    /// Referenced product, order or collection does not exist
    #[error("{0}")]
    NotFound(String),

    #[error("Product '{product}' is out of stock")]
    OutOfStock { product: String },

    #[error("Insufficient stock for '{product}': only {available} available, {requested} requested")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    /// Duplicate slug/key, delete blocked by dependents, forbidden status change
    #[error("{0}")]
    BusinessRule(String),

    /// Admin shared secret missing or wrong
    #[error("Unauthorized")]
    Unauthorized,

    // -------------------------------------------------------------------------
    // INTERNAL ERRORS
    // -------------------------------------------------------------------------
    /// The generated order number collided with an existing one.
    /// Handled by the order service, which retries with a new number.
    #[error("Order number already taken")]
    OrderNumberTaken,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error body. Every failure carries `success: false` and a readable `error`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl AppError {
    /// Stable machine-readable code, also used as a metrics label
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::OutOfStock { .. } => "OUT_OF_STOCK",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::BusinessRule(_) => "BUSINESS_RULE",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::OrderNumberTaken | AppError::Database(_) | AppError::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::OutOfStock { .. }
            | AppError::InsufficientStock { .. }
            | AppError::BusinessRule(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::OrderNumberTaken | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// =============================================================================
// HTTP RESPONSE CONVERSION
// =============================================================================
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            // Full detail stays in the logs
            tracing::error!(error_code = code, error = %self, "Request failed");
        } else {
            tracing::warn!(error_code = code, error = %self, "Request rejected");
        }

        let body = match self {
            AppError::Validation(errors) => ErrorResponse {
                success: false,
                error: "Validation failed".to_string(),
                code,
                errors: Some(errors),
            },
            _ if status.is_server_error() => ErrorResponse {
                success: false,
                error: "An unexpected error occurred".to_string(),
                code,
                errors: None,
            },
            other => ErrorResponse {
                success: false,
                error: other.to_string(),
                code,
                errors: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

// =============================================================================
// CONVERSION HELPERS
// =============================================================================

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(field_errors(&errors, ""))
    }
}

/// Flattens validator output into `FieldError`s with camelCase field names,
/// prefixed with `prefix` (e.g. `items[2].`). Sorted for stable responses.
pub fn field_errors(errors: &ValidationErrors, prefix: &str) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let name = format!("{prefix}{}", camel_case(field));
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("is invalid ({})", e.code));
                FieldError::new(name.clone(), message)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
