// =============================================================================
// ERROR MODULE
// =============================================================================
// This module defines the HTTP-facing error type and its responses.
//
// ERROR HANDLING PHILOSOPHY:
// - Each layer has its own typed error (StoreError, PaymentError, ViewError)
// - AppError wraps them and maps each to an HTTP status code
// - Write failures carry the backend's message back to the admin
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::inventory::ViewError;
use crate::models::ErrorResponse;
use crate::payment::PaymentError;
use crate::store::StoreError;

// =============================================================================
// CUSTOM ERROR TYPE
// =============================================================================
#[derive(Debug, Error)]
pub enum AppError {
    /// Row store call failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Payment gateway call failed or was refused up front
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Form or request validation failed
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Another submission is still running
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ViewError> for AppError {
    fn from(err: ViewError) -> Self {
        match err {
            ViewError::Validation(msg) => AppError::BadRequest(msg),
            ViewError::SubmitInProgress => {
                AppError::Conflict(ViewError::SubmitInProgress.to_string())
            }
            ViewError::NotImplemented(what) => AppError::NotImplemented(what.to_string()),
            ViewError::Store(e) => AppError::Store(e),
        }
    }
}

// =============================================================================
// HTTP RESPONSE CONVERSION
// =============================================================================
impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            AppError::Conflict(msg) => (StatusCode::CONFLICT, "SUBMIT_IN_PROGRESS", msg.clone()),

            AppError::NotImplemented(msg) => {
                (StatusCode::NOT_IMPLEMENTED, "NOT_IMPLEMENTED", msg.clone())
            }

            AppError::Store(StoreError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string())
            }

            AppError::Store(StoreError::UnknownColumn { .. } | StoreError::InvalidRow(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", self.to_string())
            }

            // The admin sees the backend's own message
            AppError::Store(e) => (StatusCode::BAD_GATEWAY, "STORE_ERROR", e.to_string()),

            AppError::Payment(e @ (PaymentError::InvalidAmount(_) | PaymentError::InvalidCurrency(_))) => {
                (StatusCode::BAD_REQUEST, "INVALID_PAYMENT_REQUEST", e.to_string())
            }

            AppError::Payment(e) => (StatusCode::BAD_GATEWAY, "PAYMENT_GATEWAY_ERROR", e.to_string()),

            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        tracing::error!(
            error_code = error_code,
            message = %message,
            "Request failed"
        );

        let body = match &self {
            AppError::Payment(PaymentError::Gateway { status, .. }) => ErrorResponse::with_details(
                error_code,
                message,
                format!("gateway status {status}"),
            ),
            _ => ErrorResponse::new(error_code, message),
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// RESULT TYPE ALIAS
// =============================================================================
pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
