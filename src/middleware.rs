//! Request middleware: request IDs and panic recovery.
//!
//! Each request runs inside a span carrying a UUID v4, so handler and vault
//! logs can be correlated. The span also records the final status and outcome.

use std::any::Any;
use std::time::Instant;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::internal_error_body;

/// Extension type for accessing request ID in handlers if needed.
#[derive(Clone, Debug)]
pub struct RequestId(pub Uuid);

/// Coarse result of a request, recorded on its span.
pub fn outcome(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        "server_error"
    } else if status.is_client_error() {
        "rejected"
    } else {
        "ok"
    }
}

/// Middleware that tags each request with an ID and logs how it ended.
///
/// Install as the outermost layer so the span covers handlers and the
/// panic catcher. Server errors are logged at `warn`, everything else at `info`.
pub async fn request_id_layer(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    request.extensions_mut().insert(RequestId(request_id));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        status = tracing::field::Empty,
        outcome = tracing::field::Empty,
    );

    let start = Instant::now();

    async move {
        let response = next.run(request).await;
        let status = response.status();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let span = tracing::Span::current();
        span.record("status", status.as_u16());
        span.record("outcome", outcome(status));

        if status.is_server_error() {
            tracing::warn!(elapsed_ms, "Request failed");
        } else {
            tracing::info!(elapsed_ms, "Request handled");
        }

        response
    }
    .instrument(span)
    .await
}

/// Convert a handler panic into the JSON internal-error response.
///
/// Used with `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "handler panicked".to_string()
    };

    tracing::error!(details = %details, "Server error");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(internal_error_body(details)),
    )
        .into_response()
}
