//! Error types for the relay service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dhru_client::DhruError;
use serde::Serialize;
use thiserror::Error;

/// Relay error types.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid service id (3-60 characters required)")]
    InvalidServiceId,

    #[error("invalid device identifier: {0}")]
    InvalidDevice(String),

    #[error("invalid order id (3-60 characters required)")]
    InvalidOrderId,

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("provider error: {0}")]
    Provider(#[from] DhruError),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            RelayError::InvalidServiceId => (StatusCode::BAD_REQUEST, "INVALID_SERVICE_ID"),
            RelayError::InvalidDevice(_) => (StatusCode::BAD_REQUEST, "INVALID_DEVICE"),
            RelayError::InvalidOrderId => (StatusCode::BAD_REQUEST, "INVALID_ORDER_ID"),
            RelayError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
            RelayError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            // The widget dialect reports real provider statuses; pass them
            // through the way the provider sent them.
            RelayError::Provider(DhruError::Api { status, .. }) => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                "PROVIDER_ERROR",
            ),
            RelayError::Provider(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
            RelayError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        };

        let details = match &self {
            RelayError::Provider(DhruError::Api { body, .. }) => Some(body.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<order_store::OrderStoreError> for RelayError {
    fn from(e: order_store::OrderStoreError) -> Self {
        RelayError::Storage(e.to_string())
    }
}
