// SPDX-License-Identifier: Apache-2.0

use super::{error_response, html_response, page_param, viewer_json};
use crate::extract::{CurrentUser, RequireUser};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use murmur_feed::FeedService;
use serde_json::json;
use std::collections::HashMap;

/// Global feed. The only cached view: within the TTL the stored rendering
/// is returned verbatim and the whole query/pagination/render chain is
/// bypassed.
pub(crate) async fn index_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let requested = page_param(&params);
    let key = format!("page:{requested}");
    let now = state.clock.now();

    if let Some(hit) = state.index_cache.lock().await.get(&key, now) {
        return page_with_etag(hit.body, &hit.etag, &headers);
    }

    let rendered = {
        let store = state.store.lock().await;
        let feeds = FeedService::new(&store, state.config.page_size);
        match feeds.global(requested) {
            Ok(page) => state
                .renderer
                .render("index", &json!({ "base_path": "/", "page": page })),
            Err(err) => return error_response(&state, &err, "/"),
        }
    };

    let entry = state.index_cache.lock().await.put(key, rendered, now);
    page_with_etag(entry.body, &entry.etag, &headers)
}

fn page_with_etag(body: String, etag: &str, headers: &HeaderMap) -> Response {
    let matched = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        == Some(etag);
    let mut resp = if matched {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        html_response(StatusCode::OK, body)
    };
    if let Ok(value) = HeaderValue::from_str(etag) {
        resp.headers_mut().insert(header::ETAG, value);
    }
    resp
}

pub(crate) async fn group_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    CurrentUser(viewer): CurrentUser,
) -> Response {
    let requested = page_param(&params);
    let path = format!("/group/{slug}/");
    let store = state.store.lock().await;
    let feeds = FeedService::new(&store, state.config.page_size);
    match feeds.group(&slug, requested) {
        Ok(feed) => html_response(
            StatusCode::OK,
            state.renderer.render(
                "group",
                &json!({
                    "base_path": path,
                    "group": feed.group,
                    "page": feed.page,
                    "viewer": viewer_json(&viewer),
                }),
            ),
        ),
        Err(err) => error_response(&state, &err, &path),
    }
}

pub(crate) async fn profile_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    CurrentUser(viewer): CurrentUser,
) -> Response {
    let requested = page_param(&params);
    let path = format!("/{username}/");
    let viewer_id = viewer.as_ref().map(|u| u.id);
    let store = state.store.lock().await;
    let feeds = FeedService::new(&store, state.config.page_size);
    match feeds.author(&username, viewer_id, requested) {
        Ok(feed) => html_response(
            StatusCode::OK,
            state.renderer.render(
                "profile",
                &json!({
                    "base_path": path,
                    "author": feed.author,
                    "page": feed.page,
                    "following": feed.following,
                    "follower_count": feed.follower_count,
                    "following_count": feed.following_count,
                    "viewer": viewer_json(&viewer),
                }),
            ),
        ),
        Err(err) => error_response(&state, &err, &path),
    }
}

/// Personalized feed of followed authors. Auth-gated; an empty following
/// set renders an empty page.
pub(crate) async fn follow_index_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    RequireUser(user): RequireUser,
) -> Response {
    let requested = page_param(&params);
    let store = state.store.lock().await;
    let feeds = FeedService::new(&store, state.config.page_size);
    match feeds.following(user.id, requested) {
        Ok(page) => html_response(
            StatusCode::OK,
            state.renderer.render(
                "follow",
                &json!({
                    "base_path": "/follow/",
                    "page": page,
                    "viewer": user,
                }),
            ),
        ),
        Err(err) => error_response(&state, &err, "/follow/"),
    }
}
