// SPDX-License-Identifier: Apache-2.0

use crate::extract::AuthContext;
use crate::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::atomic::Ordering;
use tracing::Instrument;

/// Wraps the request in an `http.request` span and stamps the response with
/// a process-unique request id.
pub(crate) async fn request_tracing_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let route = request.uri().path().to_string();
    let request_id = format!(
        "req-{}",
        state.request_id_seed.fetch_add(1, Ordering::Relaxed)
    );

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        route = %route,
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Resolves the session cookie to a user record and passes it forward
/// explicitly in the request extensions; handlers never reach into ambient
/// session state.
pub(crate) async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let cookie_header = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let identity = state.sessions.resolve(cookie_header.as_deref());

    let user = match identity.username() {
        None => None,
        Some(name) => {
            let store = state.store.lock().await;
            store.user_by_name(name).ok().flatten()
        }
    };
    request.extensions_mut().insert(AuthContext { user });
    next.run(request).await
}
