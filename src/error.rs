//! Handler error type and its JSON rendering.
//!
//! Every failure a handler can produce is surfaced to the caller as an
//! `ErrorBody` with a matching status code. Errors are logged before the
//! response is built.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::vault::VaultError;

/// JSON shape of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request body lacked usable input. Carries parser detail when the body was malformed.
    #[error("Input is required")]
    InvalidRequest(Option<String>),

    #[error("Failed to retrieve secret: {0}")]
    SecretAccess(#[from] VaultError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::SecretAccess(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            AppError::InvalidRequest(details) => ErrorBody {
                error: "Input is required".to_string(),
                message: "Please provide some text to check".to_string(),
                details: details.clone(),
            },
            AppError::SecretAccess(err) => ErrorBody {
                error: "Failed to retrieve secret".to_string(),
                message: "Could not access Key Vault. Check managed identity permissions."
                    .to_string(),
                details: Some(err.to_string()),
            },
            AppError::Internal(details) => internal_error_body(details.clone()),
        }
    }
}

/// Body used for unexpected failures, including caught panics.
pub fn internal_error_body(details: String) -> ErrorBody {
    ErrorBody {
        error: "Internal server error".to_string(),
        message: "Something went wrong on the server".to_string(),
        details: Some(details),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::InvalidRequest(details) => {
                tracing::warn!(details = ?details, "Rejected request without input");
            }
            AppError::SecretAccess(err) => {
                tracing::error!(error = %err, "Key Vault error");
            }
            AppError::Internal(details) => {
                tracing::error!(details = %details, "Server error");
            }
        }

        (self.status(), Json(self.body())).into_response()
    }
}
