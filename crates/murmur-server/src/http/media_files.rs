// SPDX-License-Identifier: Apache-2.0

use super::error_response;
use crate::AppState;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

pub(crate) async fn media_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    match state.media.load(&path) {
        Ok(bytes) => {
            let mut resp = Response::new(Body::from(bytes));
            *resp.status_mut() = StatusCode::OK;
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(content_type_for(&path)),
            );
            resp
        }
        Err(err) => error_response(&state, &err, &format!("/media/{path}")),
    }
}
