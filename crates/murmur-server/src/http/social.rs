// SPDX-License-Identifier: Apache-2.0

use super::{error_response, not_found_page};
use crate::extract::RequireUser;
use crate::AppState;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};

/// Creates a follow edge and returns to the author's profile. Self-follow
/// and double-follow are silent no-ops inside the store.
pub(crate) async fn follow_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
    RequireUser(user): RequireUser,
) -> Response {
    mutate_edge(state, username, user.id, EdgeAction::Follow).await
}

pub(crate) async fn unfollow_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
    RequireUser(user): RequireUser,
) -> Response {
    mutate_edge(state, username, user.id, EdgeAction::Unfollow).await
}

enum EdgeAction {
    Follow,
    Unfollow,
}

async fn mutate_edge(
    state: AppState,
    username: String,
    follower: murmur_model::UserId,
    action: EdgeAction,
) -> Response {
    let profile_path = format!("/{username}/");
    let store = state.store.lock().await;
    let author = match store.user_by_name(&username) {
        Ok(Some(author)) => author,
        Ok(None) => return not_found_page(&state, &profile_path),
        Err(err) => return error_response(&state, &err, &profile_path),
    };
    let result = match action {
        EdgeAction::Follow => store.follow(follower, author.id),
        EdgeAction::Unfollow => store.unfollow(follower, author.id),
    };
    match result {
        Ok(()) => Redirect::to(&profile_path).into_response(),
        Err(err) => error_response(&state, &err, &profile_path),
    }
}
