//! HTTP route handlers.
//!
//! `/api/*` responses are marked `no-store` since they may contain secret
//! values. Static assets get a short public cache lifetime.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod health;
pub mod secret;
pub mod status;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{CACHE_CONTROL_API, CACHE_CONTROL_STATIC};
use crate::http::static_files::{create_index_service, create_static_service};
use crate::middleware::{panic_response, request_id_layer};
use crate::state::AppState;

/// Render a UTC instant as ISO-8601 with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time as an ISO-8601 timestamp.
pub fn now_timestamp() -> String {
    iso_timestamp(Utc::now())
}

/// Creates the Axum router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // API routes - never cached, responses may carry secret values
    let api_routes = Router::new()
        .route("/api/check-secret", post(secret::check_secret))
        .route("/api/status", get(status::vault_status))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_API),
        ));

    // Health check - no caching, always fresh for liveness probes
    let health_routes = Router::new().route("/health", get(health::health));

    // Landing page and other assets from the public directory
    let static_routes = Router::new()
        .route_service("/", create_index_service(&state.config.app))
        .fallback_service(create_static_service(&state.config.app))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_STATIC),
        ));

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .merge(static_routes)
        .with_state(state)
        // Panics become the JSON internal-error response
        .layer(CatchPanicLayer::custom(panic_response))
        // Browser clients may call the API from any origin
        .layer(CorsLayer::permissive())
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_iso_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(iso_timestamp(at), "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn test_now_timestamp_parses_back() {
        let stamp = now_timestamp();
        assert!(stamp.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&stamp).is_ok());
    }
}
