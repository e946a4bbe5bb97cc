//! Vault connectivity probe.
//!
//! Attempts to read the demo secret and reports whether it succeeded. The
//! secret value itself is never included in the response.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::config::DEMO_SECRET_NAME;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStatusResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub secret_retrieved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /api/status`
pub async fn vault_status(State(state): State<AppState>) -> (StatusCode, Json<VaultStatusResponse>) {
    match state.secrets.get_secret(DEMO_SECRET_NAME).await {
        Ok(_) => (
            StatusCode::OK,
            Json(VaultStatusResponse {
                status: "success",
                message: "Successfully connected to Key Vault",
                secret_retrieved: true,
                error: None,
            }),
        ),
        Err(err) => {
            tracing::error!(
                error = %err,
                vault_url = %state.secrets.vault_url(),
                "Key Vault status check failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(VaultStatusResponse {
                    status: "failure",
                    message: "Failed to connect to Key Vault",
                    secret_retrieved: false,
                    error: Some(err.to_string()),
                }),
            )
        }
    }
}
