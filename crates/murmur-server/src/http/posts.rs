// SPDX-License-Identifier: Apache-2.0

use super::{error_response, html_response, not_found_page, viewer_json};
use crate::extract::{CurrentUser, RequireUser};
use crate::AppState;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use murmur_core::Result;
use murmur_feed::FeedService;
use murmur_model::{
    CommentDraft, FieldErrors, Group, GroupId, PostDraft, PostId, PostUpload, User,
};
use murmur_store::EntityStore;
use serde::Deserialize;
use serde_json::{json, Value};

async fn read_post_draft(multipart: &mut Multipart) -> PostDraft {
    let mut draft = PostDraft::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => draft.text = field.text().await.unwrap_or_default(),
            Some("group") => {
                let raw = field.text().await.unwrap_or_default();
                draft.group = raw.trim().parse::<i64>().ok();
            }
            Some("image") => {
                let filename = field.file_name().map(str::to_string).unwrap_or_default();
                let bytes = field
                    .bytes()
                    .await
                    .map(|b| b.to_vec())
                    .unwrap_or_default();
                if !filename.is_empty() && !bytes.is_empty() {
                    draft.upload = Some(PostUpload { filename, bytes });
                }
            }
            _ => {}
        }
    }
    draft
}

/// A group reference on the form must resolve to an existing group;
/// anything else is a field error, not a fatal failure.
fn resolve_group(
    store: &EntityStore,
    draft: &PostDraft,
    errors: &mut FieldErrors,
) -> Result<Option<GroupId>> {
    match draft.group {
        None => Ok(None),
        Some(raw) => match store.group_by_id(GroupId(raw))? {
            Some(group) => Ok(Some(group.id)),
            None => {
                errors.add("group", "Choose a valid group.");
                Ok(None)
            }
        },
    }
}

fn form_context(
    action: &str,
    draft: &PostDraft,
    errors: &FieldErrors,
    groups: &[Group],
    viewer: &User,
    is_edit: bool,
) -> Value {
    json!({
        "action": action,
        "errors": errors,
        "values": { "text": &draft.text, "group": draft.group },
        "groups": groups,
        "is_edit": is_edit,
        "viewer": viewer,
    })
}

pub(crate) async fn new_post_form_handler(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Response {
    let store = state.store.lock().await;
    let groups = store.all_groups().unwrap_or_default();
    html_response(
        StatusCode::OK,
        state.renderer.render(
            "post_form",
            &form_context("/new/", &PostDraft::default(), &FieldErrors::new(), &groups, &user, false),
        ),
    )
}

pub(crate) async fn new_post_submit_handler(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    mut multipart: Multipart,
) -> Response {
    let draft = read_post_draft(&mut multipart).await;
    let mut errors = draft.validate();

    let store = state.store.lock().await;
    let group = match resolve_group(&store, &draft, &mut errors) {
        Ok(group) => group,
        Err(err) => return error_response(&state, &err, "/new/"),
    };

    if !errors.is_empty() {
        let groups = store.all_groups().unwrap_or_default();
        return html_response(
            StatusCode::OK,
            state.renderer.render(
                "post_form",
                &form_context("/new/", &draft, &errors, &groups, &user, false),
            ),
        );
    }

    let image = match &draft.upload {
        None => None,
        Some(upload) => match state.media.store(&upload.filename, &upload.bytes) {
            Ok(path) => Some(path),
            Err(err) => return error_response(&state, &err, "/new/"),
        },
    };

    let now = state.clock.now();
    match store.create_post(user.id, &draft.trimmed_text(), group, image, now) {
        Ok(_) => Redirect::to("/").into_response(),
        Err(err) => error_response(&state, &err, "/new/"),
    }
}

fn parse_post_id(raw: &str) -> Option<PostId> {
    raw.parse::<i64>().ok().map(PostId)
}

pub(crate) async fn post_detail_handler(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    CurrentUser(viewer): CurrentUser,
) -> Response {
    let path = format!("/{username}/{post_id}/");
    let Some(post_id) = parse_post_id(&post_id) else {
        return not_found_page(&state, &path);
    };
    let store = state.store.lock().await;
    let feeds = FeedService::new(&store, state.config.page_size);
    match feeds.post_detail(&username, post_id) {
        Ok(view) => html_response(
            StatusCode::OK,
            state.renderer.render(
                "post",
                &json!({ "view": view, "viewer": viewer_json(&viewer) }),
            ),
        ),
        Err(err) => error_response(&state, &err, &path),
    }
}

pub(crate) async fn post_edit_form_handler(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    CurrentUser(viewer): CurrentUser,
) -> Response {
    let detail_path = format!("/{username}/{post_id}/");
    let Some(post_id) = parse_post_id(&post_id) else {
        return not_found_page(&state, &detail_path);
    };
    let store = state.store.lock().await;
    let record = match store.post_of_author(&username, post_id) {
        Ok(Some(record)) => record,
        Ok(None) => return not_found_page(&state, &detail_path),
        Err(err) => return error_response(&state, &err, &detail_path),
    };
    // Non-authors (and the anonymous) are silently sent to the read view.
    let Some(viewer) = viewer.filter(|u| u.id == record.post.author_id) else {
        return Redirect::to(&detail_path).into_response();
    };

    let draft = PostDraft {
        text: record.post.text.clone(),
        group: record.post.group_id.map(GroupId::get),
        upload: None,
    };
    let groups = store.all_groups().unwrap_or_default();
    let action = format!("/{username}/{}/edit/", post_id.get());
    html_response(
        StatusCode::OK,
        state.renderer.render(
            "post_form",
            &form_context(&action, &draft, &FieldErrors::new(), &groups, &viewer, true),
        ),
    )
}

pub(crate) async fn post_edit_submit_handler(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    CurrentUser(viewer): CurrentUser,
    mut multipart: Multipart,
) -> Response {
    let detail_path = format!("/{username}/{post_id}/");
    let Some(post_id) = parse_post_id(&post_id) else {
        return not_found_page(&state, &detail_path);
    };
    let store = state.store.lock().await;
    let record = match store.post_of_author(&username, post_id) {
        Ok(Some(record)) => record,
        Ok(None) => return not_found_page(&state, &detail_path),
        Err(err) => return error_response(&state, &err, &detail_path),
    };
    let Some(viewer) = viewer.filter(|u| u.id == record.post.author_id) else {
        return Redirect::to(&detail_path).into_response();
    };

    let draft = read_post_draft(&mut multipart).await;
    let mut errors = draft.validate();
    let group = match resolve_group(&store, &draft, &mut errors) {
        Ok(group) => group,
        Err(err) => return error_response(&state, &err, &detail_path),
    };

    if !errors.is_empty() {
        let groups = store.all_groups().unwrap_or_default();
        let action = format!("/{username}/{}/edit/", post_id.get());
        return html_response(
            StatusCode::OK,
            state.renderer.render(
                "post_form",
                &form_context(&action, &draft, &errors, &groups, &viewer, true),
            ),
        );
    }

    let image = match &draft.upload {
        None => None,
        Some(upload) => match state.media.store(&upload.filename, &upload.bytes) {
            Ok(path) => Some(path),
            Err(err) => return error_response(&state, &err, &detail_path),
        },
    };

    match store.update_post(post_id, &draft.trimmed_text(), group, image.as_deref()) {
        Ok(()) => Redirect::to(&detail_path).into_response(),
        Err(err) => error_response(&state, &err, &detail_path),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentFormData {
    #[serde(default)]
    text: String,
}

/// Creates the comment when the draft is valid and redirects back to the
/// detail view either way.
pub(crate) async fn add_comment_handler(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    RequireUser(user): RequireUser,
    Form(form): Form<CommentFormData>,
) -> Response {
    let detail_path = format!("/{username}/{post_id}/");
    let Some(post_id) = parse_post_id(&post_id) else {
        return not_found_page(&state, &detail_path);
    };
    let store = state.store.lock().await;
    let record = match store.post_of_author(&username, post_id) {
        Ok(Some(record)) => record,
        Ok(None) => return not_found_page(&state, &detail_path),
        Err(err) => return error_response(&state, &err, &detail_path),
    };

    let draft = CommentDraft { text: form.text };
    if draft.is_valid() {
        let now = state.clock.now();
        if let Err(err) =
            store.create_comment(record.post.id, user.id, &draft.trimmed_text(), now)
        {
            return error_response(&state, &err, &detail_path);
        }
    }
    Redirect::to(&detail_path).into_response()
}
