//! Measurement handler.

use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::super::types::ServerState;
use crate::classify::classify;
use crate::config::MAX_ACCEPTABLE_BODY_SIZE;
use crate::models::CtrlRequest;
use crate::utils::read_all_context;

const APPLICATION_JSON: &str = "application/json";

/// Measures the URL in a JSON [`CtrlRequest`] and answers with the report.
///
/// Anything other than a well-formed `POST` that measures successfully gets
/// an empty `400`.
pub async fn websteps_handler(State(state): State<ServerState>, request: Request) -> Response {
    let index = state.next_index();
    let in_flight = state.enter();
    let prefix = format!("[#{index}]");

    if request.method() != Method::POST {
        debug!("{prefix} rejecting method {}", request.method());
        return bad_request();
    }
    if let Some(content_type) = request.headers().get(CONTENT_TYPE) {
        if !is_json(content_type) {
            debug!("{prefix} rejecting content type {content_type:?}");
            return bad_request();
        }
    }

    // Cancels everything still running for this request once the handler
    // returns or is dropped because the client went away
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let stream = request.into_body().into_data_stream();
    let body = match read_all_context(stream, MAX_ACCEPTABLE_BODY_SIZE, &cancel).await {
        Ok(body) => body,
        Err(e) => {
            warn!("{prefix} reading request body: {e}");
            return bad_request();
        }
    };
    let ctrl: CtrlRequest = match serde_json::from_slice(&body) {
        Ok(ctrl) => ctrl,
        Err(e) => {
            debug!("{prefix} parsing request body: {}", classify(&e));
            return bad_request();
        }
    };

    info!(
        "{prefix} measure {} ({} in flight)",
        ctrl.http_request,
        in_flight.count()
    );
    let response = match state.measurer.measure(&ctrl, &cancel).await {
        Ok(response) => response,
        Err(e) => {
            info!("{prefix} measure {} failed: {}", ctrl.http_request, e.failure());
            return bad_request();
        }
    };

    match serde_json::to_vec(&response) {
        Ok(json) => {
            info!(
                "{prefix} measure {}: {} urls",
                ctrl.http_request,
                response.urls.len()
            );
            (
                StatusCode::OK,
                [(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))],
                json,
            )
                .into_response()
        }
        Err(e) => {
            warn!("{prefix} serializing response: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn bad_request() -> Response {
    StatusCode::BAD_REQUEST.into_response()
}

/// Accepts `application/json`, with or without parameters.
fn is_json(content_type: &HeaderValue) -> bool {
    content_type
        .to_str()
        .ok()
        .and_then(|value| value.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case(APPLICATION_JSON))
}
