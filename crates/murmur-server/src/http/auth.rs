// SPDX-License-Identifier: Apache-2.0

use super::{error_response, html_response};
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use murmur_model::Username;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

pub(crate) async fn login_form_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let next = params.get("next").cloned().unwrap_or_default();
    html_response(
        StatusCode::OK,
        state
            .renderer
            .render("login", &json!({ "next": next, "error": null })),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    next: String,
}

/// Only same-site paths are honored as post-login destinations.
fn safe_next(next: &str) -> &str {
    if next.starts_with('/') && !next.starts_with("//") {
        next
    } else {
        "/"
    }
}

/// Establishes a session. The user record is created on first login;
/// account provisioning proper is the identity collaborator's concern.
pub(crate) async fn login_submit_handler(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = match Username::parse(&form.username) {
        Ok(username) => username,
        Err(err) => {
            return html_response(
                StatusCode::OK,
                state.renderer.render(
                    "login",
                    &json!({ "next": form.next, "error": err.to_string() }),
                ),
            );
        }
    };

    let display_name = if form.display_name.trim().is_empty() {
        username.as_str().to_string()
    } else {
        form.display_name.trim().to_string()
    };

    let user = {
        let store = state.store.lock().await;
        match store.ensure_user(&username, &display_name) {
            Ok(user) => user,
            Err(err) => return error_response(&state, &err, "/auth/login/"),
        }
    };

    let mut resp = Redirect::to(safe_next(&form.next)).into_response();
    if let Ok(value) = HeaderValue::from_str(&state.sessions.issue(&user.username)) {
        resp.headers_mut().insert(header::SET_COOKIE, value);
    }
    resp
}

pub(crate) async fn logout_handler(State(state): State<AppState>) -> Response {
    let mut resp = Redirect::to("/").into_response();
    if let Ok(value) = HeaderValue::from_str(&state.sessions.clear()) {
        resp.headers_mut().insert(header::SET_COOKIE, value);
    }
    resp
}
