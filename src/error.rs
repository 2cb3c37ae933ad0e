use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// User-facing error messages shared between handlers, the service layer and tests.
pub mod msg {
    pub const LICENSE_KEY_NOT_FOUND: &str = "License key not found";
    pub const LICENSE_NOT_FOUND_FOR_PRODUCT: &str = "License not found for product";
    pub const NO_ACTIVE_LICENSES: &str = "No active licenses on this key";
    pub const NO_ACTIVE_ACTIVATION: &str = "No active activation found";
    pub const UNKNOWN_PRODUCTS: &str = "One or more products not found for this brand";
    pub const DUPLICATE_PRODUCTS: &str = "product_codes must not contain duplicates";
    pub const PRODUCT_CODES_EMPTY: &str = "product_codes must not be empty";
    pub const PRODUCT_CODE_EMPTY: &str = "product_codes must not contain empty codes";
    pub const EMAIL_EMPTY: &str = "Email cannot be empty";
    pub const INVALID_EMAIL_FORMAT: &str = "Invalid email format";
    pub const UNKNOWN_ACTION: &str = "Unknown action";
    pub const EXTEND_DAYS_NOT_INTEGER: &str = "extend_days must be an integer";
    pub const EXTEND_DAYS_OUT_OF_RANGE: &str = "extend_days must be between 1 and 36500";
    pub const INSTANCE_ID_TOO_LONG: &str = "instance_id must be at most 255 characters";
    pub const BRAND_NOT_FOUND: &str = "Brand not found";
    pub const PRODUCT_NOT_FOUND: &str = "Product not found";
    pub const BRAND_NAME_TAKEN: &str = "A brand with this name already exists";
    pub const PRODUCT_CODE_TAKEN: &str = "This brand already has a product with this code";
    pub const BRAND_HAS_PRODUCTS: &str = "Brand still has products; delete them first";
    pub const PRODUCT_HAS_LICENSES: &str = "Product is referenced by licenses";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A uniqueness race the store could not absorb by re-reading.
    #[error("Store constraint violation: {0}")]
    StoreConflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
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

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", Some(msg.clone())),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone())),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "Forbidden", Some(msg.clone())),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", Some(msg.clone())),
            AppError::StoreConflict(msg) => {
                tracing::error!("Store constraint violation after retry: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Turns a missing lookup into a `NotFound` with the given message.
pub trait OptionExt<T> {
    fn or_not_found(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(message.to_string()))
    }
}
