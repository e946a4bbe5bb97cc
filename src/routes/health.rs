//! Health check endpoint for container orchestration.
//!
//! This is a liveness probe - it only checks that the process can respond to
//! HTTP. Vault reachability is reported separately by `/api/status`.

use axum::{extract::State, Json};
use serde::Serialize;

use super::now_timestamp;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub environment: String,
}

/// Health check handler.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: now_timestamp(),
        environment: state.config.app.environment.clone(),
    })
}
