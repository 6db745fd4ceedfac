//! Liveness handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Plain-text liveness check.
pub async fn liveness_handler() -> Response {
    (StatusCode::OK, "websteps test helper\n").into_response()
}
