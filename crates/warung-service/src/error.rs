//! HTTP error mapping for the storefront API.
//!
//! Every failure surfaces as a JSON body of the shape
//! `{"error": {"code", "message", "details?"}}` with a matching status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use warung_core::EngineError;
use warung_store::StoreError;

/// Failure modes the API reports to callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service API key is missing or wrong.
    #[error("unauthorized")]
    Unauthorized,

    /// The named entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request payload failed validation.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request collides with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Insufficient balance for the requested settlement.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// What the buyer holds.
        balance: i64,
        /// What the purchase costs.
        required: i64,
    },

    /// The product's content queue is empty.
    #[error("out of stock: {0}")]
    OutOfStock(String),

    /// The transaction cannot be cancelled anymore.
    #[error("not cancelable: {0}")]
    NotCancelable(String),

    /// Upstream payment gateway failure or decline.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Ledger or serialization fault. The detail stays in the log.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientFunds { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_funds",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::OutOfStock(product) => (
                StatusCode::CONFLICT,
                "out_of_stock",
                format!("product out of stock: {product}"),
                None,
            ),
            Self::NotCancelable(ref_id) => (
                StatusCode::CONFLICT,
                "not_cancelable",
                format!("transaction {ref_id} cannot be cancelled"),
                None,
            ),
            Self::Gateway(msg) => (StatusCode::BAD_GATEWAY, "gateway_error", msg.clone(), None),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            StoreError::OutOfStock { product } => Self::OutOfStock(product),
            StoreError::NotCancelable { ref_id } => Self::NotCancelable(ref_id),
            StoreError::DuplicateRef { ref_id } => {
                Self::Conflict(format!("reference id already exists: {ref_id}"))
            }
            StoreError::AlreadySettled { ref_id, status } => {
                Self::Conflict(format!("transaction {ref_id} already settled as {status:?}"))
            }
            StoreError::NameTaken { name } => {
                Self::Conflict(format!("product name already taken: {name}"))
            }
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => Self::BadRequest(msg),
            EngineError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            EngineError::OutOfStock { product } => Self::OutOfStock(product),
            EngineError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            EngineError::Duplicate(ref_id) => {
                Self::Conflict(format!("transaction {ref_id} already settled"))
            }
            EngineError::Gateway(msg) => Self::Gateway(msg),
            EngineError::NotCancelable(ref_id) => Self::NotCancelable(ref_id.to_string()),
            EngineError::Store(msg) => Self::Internal(msg),
        }
    }
}
