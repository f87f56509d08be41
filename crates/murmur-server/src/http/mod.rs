// SPDX-License-Identifier: Apache-2.0

pub(crate) mod auth;
pub(crate) mod feeds;
pub(crate) mod media_files;
pub(crate) mod posts;
pub(crate) mod social;

use crate::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::Response;
use murmur_core::Error;
use murmur_model::User;
use serde_json::Value;
use std::collections::HashMap;

pub(crate) fn html_response(status: StatusCode, body: String) -> Response {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    resp
}

/// Not-found renders the 404 document; everything else is logged and
/// surfaced as the 500 document, no recovery attempted.
pub(crate) fn error_response(state: &AppState, err: &Error, path: &str) -> Response {
    if err.is_not_found() {
        html_response(StatusCode::NOT_FOUND, state.renderer.not_found(path))
    } else {
        tracing::error!(error = %err, path = %path, "request failed");
        html_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            state.renderer.server_error(),
        )
    }
}

pub(crate) fn not_found_page(state: &AppState, path: &str) -> Response {
    html_response(StatusCode::NOT_FOUND, state.renderer.not_found(path))
}

pub(crate) async fn not_found_handler(State(state): State<AppState>, uri: Uri) -> Response {
    not_found_page(&state, uri.path())
}

/// Absent or non-numeric `?page=` means page 1; range clamping happens in
/// the paginator.
pub(crate) fn page_param(params: &HashMap<String, String>) -> i64 {
    params
        .get("page")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(1)
}

pub(crate) fn viewer_json(user: &Option<User>) -> Value {
    serde_json::to_value(user).unwrap_or(Value::Null)
}
