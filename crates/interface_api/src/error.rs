//! API error handling
//!
//! User-facing rejections (not found, validation, illegal transition) are a
//! `303 See Other` back to `/` with a flash body; clients follow the redirect
//! and show the message. Infrastructure failures are a bare `500` and their
//! detail only goes to the log.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain_gop::GopError;

use crate::auth::AuthError;

/// Landing page for rejected requests
pub const FLASH_REDIRECT: &str = "/";

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Rejected(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (error_type, message, field) = match self {
            ApiError::Unauthorized => {
                let body = ErrorResponse {
                    error: "unauthorized".to_string(),
                    message: "Please sign in".to_string(),
                    field: None,
                };
                return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
            }
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "request failed");
                let body = ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Something went wrong, please try again".to_string(),
                    field: None,
                };
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
            // wrong-tenant access reads exactly like a missing id
            ApiError::NotFound => ("not_found", "Request not found".to_string(), None),
            ApiError::Validation { field, message } => ("validation_error", message, Some(field)),
            ApiError::Rejected(message) => ("rejected", message, None),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            field,
        };

        (StatusCode::SEE_OTHER, [(header::LOCATION, FLASH_REDIRECT)], Json(body)).into_response()
    }
}

impl From<GopError> for ApiError {
    fn from(err: GopError) -> Self {
        match err {
            GopError::NotFound { .. } | GopError::NotAuthorized => ApiError::NotFound,
            GopError::Validation { field, message } => ApiError::Validation { field, message },
            err @ (GopError::InvalidTransition { .. } | GopError::Closed(_)) => ApiError::Rejected(err.to_string()),
            GopError::Port(port) => ApiError::Internal(port.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        tracing::debug!(error = %err, "authentication failed");
        ApiError::Unauthorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{GopId, PortError};

    #[test]
    fn test_hidden_outcomes_collapse() {
        assert!(matches!(ApiError::from(GopError::NotAuthorized), ApiError::NotFound));
        assert!(matches!(
            ApiError::from(GopError::not_found("GuaranteeOfPayment", 7)),
            ApiError::NotFound
        ));
    }

    #[test]
    fn test_rejections_redirect_home() {
        let response = ApiError::from(GopError::Closed(GopId::new(3))).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], FLASH_REDIRECT);
    }

    #[test]
    fn test_backend_failure_is_opaque() {
        let error = ApiError::from(GopError::Port(PortError::connection("pool timed out")));
        assert!(matches!(error, ApiError::Internal(_)));
        assert_eq!(error.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
