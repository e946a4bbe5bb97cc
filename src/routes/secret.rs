//! The secret-check action endpoint.
//!
//! Echoes arbitrary input back to the caller. When the input is "secret"
//! (any casing), the demo secret is fetched from the vault and returned in
//! the response instead.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use super::now_timestamp;
use crate::config::{DEMO_SECRET_NAME, SECRET_TRIGGER};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSecretResponse {
    pub success: bool,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_value: Option<String>,
    pub message: String,
    pub timestamp: String,
}

impl CheckSecretResponse {
    fn echo(input: String) -> Self {
        let message = format!(
            "You entered: \"{}\". Try entering \"{}\" to see the Key Vault integration!",
            input, SECRET_TRIGGER
        );
        Self {
            success: true,
            input,
            secret_value: None,
            message,
            timestamp: now_timestamp(),
        }
    }

    fn revealed(input: String, secret_value: String) -> Self {
        Self {
            success: true,
            input,
            secret_value: Some(secret_value),
            message: "Secret retrieved successfully from Key Vault!".to_string(),
            timestamp: now_timestamp(),
        }
    }
}

/// True when the input asks for the secret, ignoring case.
pub fn is_secret_trigger(input: &str) -> bool {
    input.to_lowercase() == SECRET_TRIGGER
}

/// Pull the `input` string out of a request body.
///
/// Bodies that are not JSON objects, and falsy values (`null`, `false`, `0`,
/// `""`), count as missing input. Any other non-string value cannot be
/// case-folded and is an internal error.
pub fn extract_input(body: Value) -> Result<String, AppError> {
    let Value::Object(mut fields) = body else {
        return Err(AppError::InvalidRequest(None));
    };

    match fields.remove("input") {
        Some(Value::String(input)) if !input.is_empty() => Ok(input),
        None | Some(Value::Null) | Some(Value::Bool(false)) | Some(Value::String(_)) => {
            Err(AppError::InvalidRequest(None))
        }
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Err(AppError::InvalidRequest(None)),
        Some(other) => Err(AppError::Internal(format!(
            "input must be a string, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `POST /api/check-secret`
#[instrument(name = "check_secret", skip_all)]
pub async fn check_secret(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CheckSecretResponse>, AppError> {
    let Json(body) =
        payload.map_err(|rejection| AppError::InvalidRequest(Some(rejection.body_text())))?;
    let input = extract_input(body)?;

    if !is_secret_trigger(&input) {
        return Ok(Json(CheckSecretResponse::echo(input)));
    }

    let secret = state.secrets.get_secret(DEMO_SECRET_NAME).await?;
    tracing::info!(secret = %secret.name, "Secret retrieved from Key Vault");

    Ok(Json(CheckSecretResponse::revealed(input, secret.value)))
}
