//! Helper API server.
//!
//! Provides two endpoints:
//! - `POST /api/v1/websteps` - measure a URL (JSON in, JSON out)
//! - `GET /` - liveness check
//!
//! Every response carries a `Server` header naming the helper and its version.

mod handlers;
mod types;

use std::future::Future;

use axum::http::header::SERVER;
use axum::http::HeaderValue;
use axum::middleware::map_response;
use axum::response::Response;
use axum::routing::{any, get};
use axum::Router;
use tokio::net::TcpListener;

use crate::config::{server_header_value, WEBSTEPS_API_PATH};
use handlers::{liveness_handler, websteps_handler};
pub use types::{InFlightGuard, ServerState};

/// Builds the helper API router.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(WEBSTEPS_API_PATH, any(websteps_handler))
        .route("/", get(liveness_handler))
        .layer(map_response(add_server_header))
        .with_state(state)
}

async fn add_server_header(mut response: Response) -> Response {
    if let Ok(value) = HeaderValue::from_str(&server_header_value()) {
        response.headers_mut().insert(SERVER, value);
    }
    response
}

/// Serves the helper API on `listener` until `shutdown` completes.
///
/// # Errors
///
/// Returns an error if the server fails while running.
pub async fn serve<F>(listener: TcpListener, state: ServerState, shutdown: F) -> Result<(), anyhow::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| anyhow::anyhow!("Failed to read listener address: {}", e))?;
    log::info!("Test helper listening on http://{}/", addr);
    log::info!("  - Measure: http://{}{}", addr, WEBSTEPS_API_PATH);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("Test helper server error: {}", e))?;

    Ok(())
}
