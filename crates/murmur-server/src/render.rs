// SPDX-License-Identifier: Apache-2.0

//! Built-in implementation of the renderer port: maps a template id and a
//! context mapping to an HTML document. User-supplied text is escaped at
//! the point of interpolation.

use murmur_core::Renderer;
use serde_json::Value;

pub struct PageRenderer;

#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or("")
}

fn num_at(value: &Value, pointer: &str) -> i64 {
    value.pointer(pointer).and_then(Value::as_i64).unwrap_or(0)
}

fn bool_at(value: &Value, pointer: &str) -> bool {
    value
        .pointer(pointer)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// "2023-11-14T22:13:20Z" -> "2023-11-14 22:13"
fn format_timestamp(raw: &str) -> String {
    let mut shown: String = raw.chars().take(16).collect();
    if let Some(pos) = shown.find('T') {
        shown.replace_range(pos..=pos, " ");
    }
    shown
}

fn layout(title: &str, viewer: Option<&Value>, body: &str) -> String {
    let account = match viewer.and_then(|v| v.get("username")).and_then(Value::as_str) {
        Some(name) => format!(
            "<a href=\"/{name}/\">@{name}</a> <a href=\"/auth/logout/\">log out</a>",
            name = escape_html(name)
        ),
        None => "<a href=\"/auth/login/\">log in</a>".to_string(),
    };
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title} — murmur</title></head><body>\
<nav><a href=\"/\">murmur</a> <a href=\"/new/\">new post</a> <a href=\"/follow/\">following</a> {account}</nav>\
<main>{body}</main>\
</body></html>",
        title = escape_html(title),
    )
}

fn article(item: &Value, with_comments: bool) -> String {
    let username = escape_html(str_at(item, "/author/username"));
    let display = escape_html(str_at(item, "/author/display_name"));
    let post_id = num_at(item, "/post/id");
    let when = format_timestamp(str_at(item, "/post/published_at"));
    let text = escape_html(str_at(item, "/post/text"));

    let group_line = match item.pointer("/group").filter(|g| !g.is_null()) {
        Some(group) => format!(
            " in <a href=\"/group/{slug}/\">{title}</a>",
            slug = escape_html(group.get("slug").and_then(Value::as_str).unwrap_or("")),
            title = escape_html(group.get("title").and_then(Value::as_str).unwrap_or("")),
        ),
        None => String::new(),
    };
    let image = match item.pointer("/post/image").and_then(Value::as_str) {
        Some(path) if !path.is_empty() => format!(
            "<img src=\"/media/{}\" alt=\"attached image\">",
            escape_html(path)
        ),
        _ => String::new(),
    };
    let comments = item
        .pointer("/comments")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let comment_block = if with_comments {
        let rendered: String = comments.iter().map(comment_entry).collect();
        format!("<section class=\"comments\">{rendered}</section>")
    } else {
        String::new()
    };

    format!(
        "<article class=\"post\" id=\"post-{post_id}\">\
<header><a href=\"/{username}/\">{display}</a> on {when}{group_line}</header>\
{image}<p>{text}</p>\
<footer><a href=\"/{username}/{post_id}/\">{count} comment(s)</a></footer>\
{comment_block}\
</article>",
        count = comments.len(),
    )
}

fn comment_entry(comment: &Value) -> String {
    format!(
        "<div class=\"comment\"><a href=\"/{username}/\">{display}</a> on {when}: {text}</div>",
        username = escape_html(str_at(comment, "/author/username")),
        display = escape_html(str_at(comment, "/author/display_name")),
        when = format_timestamp(str_at(comment, "/comment/created_at")),
        text = escape_html(str_at(comment, "/comment/text")),
    )
}

fn page_block(context: &Value, with_comments: bool) -> String {
    let page = context.get("page").cloned().unwrap_or(Value::Null);
    let items = page
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let articles: String = items.iter().map(|item| article(item, with_comments)).collect();
    let body = if items.is_empty() {
        "<p class=\"empty\">No posts yet.</p>".to_string()
    } else {
        articles
    };

    let base = str_at(context, "/base_path");
    let number = num_at(&page, "/number");
    let num_pages = num_at(&page, "/num_pages");
    let mut nav = String::new();
    if bool_at(&page, "/has_previous") {
        nav.push_str(&format!(
            "<a href=\"{base}?page={}\">newer</a> ",
            number - 1
        ));
    }
    nav.push_str(&format!("page {number} of {num_pages}"));
    if bool_at(&page, "/has_next") {
        nav.push_str(&format!(
            " <a href=\"{base}?page={}\">older</a>",
            number + 1
        ));
    }
    format!("{body}<nav class=\"pages\">{nav}</nav>")
}

fn field_error(context: &Value, field: &str) -> String {
    match context.pointer(&format!("/errors/{field}")).and_then(Value::as_str) {
        Some(message) => format!("<p class=\"error\">{}</p>", escape_html(message)),
        None => String::new(),
    }
}

fn post_form(context: &Value) -> String {
    let action = escape_html(str_at(context, "/action"));
    let text = escape_html(str_at(context, "/values/text"));
    let selected_group = context.pointer("/values/group").and_then(Value::as_i64);
    let groups = context
        .get("groups")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut options = String::from("<option value=\"\">— no group —</option>");
    for group in &groups {
        let id = group.get("id").and_then(Value::as_i64).unwrap_or(0);
        let selected = if Some(id) == selected_group { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{id}\"{selected}>{}</option>",
            escape_html(group.get("title").and_then(Value::as_str).unwrap_or(""))
        ));
    }

    let heading = if bool_at(context, "/is_edit") {
        "Edit post"
    } else {
        "New post"
    };
    format!(
        "<h1>{heading}</h1>\
<form method=\"post\" action=\"{action}\" enctype=\"multipart/form-data\">\
{text_error}<textarea name=\"text\" required>{text}</textarea>\
{group_error}<select name=\"group\">{options}</select>\
{image_error}<input type=\"file\" name=\"image\">\
<button type=\"submit\">Publish</button>\
</form>",
        text_error = field_error(context, "text"),
        group_error = field_error(context, "group"),
        image_error = field_error(context, "image"),
    )
}

impl Renderer for PageRenderer {
    fn render(&self, template: &str, context: &Value) -> String {
        let viewer = context.get("viewer").filter(|v| !v.is_null());
        match template {
            "index" => layout("Latest posts", None, &page_block(context, false)),
            "group" => {
                let title = str_at(context, "/group/title").to_string();
                let body = format!(
                    "<h1>{}</h1><p>{}</p>{}",
                    escape_html(&title),
                    escape_html(str_at(context, "/group/description")),
                    page_block(context, false)
                );
                layout(&title, viewer, &body)
            }
            "profile" => {
                let username = str_at(context, "/author/username").to_string();
                let follow_controls = if bool_at(context, "/following") {
                    format!(
                        "<a href=\"/{}/unfollow/\" class=\"unfollow\">Unfollow</a>",
                        escape_html(&username)
                    )
                } else {
                    format!(
                        "<a href=\"/{}/follow/\" class=\"follow\">Follow</a>",
                        escape_html(&username)
                    )
                };
                let body = format!(
                    "<h1>{display} (@{username})</h1>\
<p>{posts} posts · {followers} followers · {following} following</p>\
{follow_controls}{page}",
                    display = escape_html(str_at(context, "/author/display_name")),
                    username = escape_html(&username),
                    posts = num_at(context, "/page/total_count"),
                    followers = num_at(context, "/follower_count"),
                    following = num_at(context, "/following_count"),
                    page = page_block(context, false),
                );
                layout(&username, viewer, &body)
            }
            "follow" => {
                let body = format!("<h1>Posts you follow</h1>{}", page_block(context, false));
                layout("Following", viewer, &body)
            }
            "post" => {
                let item = context.get("view").cloned().unwrap_or(Value::Null);
                let username = str_at(&item, "/author/username").to_string();
                let post_id = num_at(&item, "/post/id");
                let comment_form = format!(
                    "<form method=\"post\" action=\"/{username}/{post_id}/comment/\">\
<textarea name=\"text\" required></textarea>\
<button type=\"submit\">Comment</button></form>",
                    username = escape_html(&username),
                );
                let edit_link = match viewer
                    .and_then(|v| v.get("username"))
                    .and_then(Value::as_str)
                {
                    Some(name) if name == username => format!(
                        "<a href=\"/{username}/{post_id}/edit/\">edit</a>",
                        username = escape_html(&username),
                    ),
                    _ => String::new(),
                };
                let body = format!("{}{edit_link}{comment_form}", article(&item, true));
                layout("Post", viewer, &body)
            }
            "post_form" => layout("Post", viewer, &post_form(context)),
            "login" => {
                let next = escape_html(str_at(context, "/next"));
                let error = match context.get("error").and_then(Value::as_str) {
                    Some(message) => format!("<p class=\"error\">{}</p>", escape_html(message)),
                    None => String::new(),
                };
                let body = format!(
                    "<h1>Log in</h1>{error}\
<form method=\"post\" action=\"/auth/login/\">\
<input name=\"username\" placeholder=\"username\" required>\
<input name=\"display_name\" placeholder=\"display name\">\
<input type=\"hidden\" name=\"next\" value=\"{next}\">\
<button type=\"submit\">Log in</button></form>"
                );
                layout("Log in", None, &body)
            }
            _ => self.server_error(),
        }
    }

    fn not_found(&self, path: &str) -> String {
        layout(
            "Page not found",
            None,
            &format!(
                "<h1>404</h1><p>No page at <code>{}</code>.</p>",
                escape_html(path)
            ),
        )
    }

    fn server_error(&self) -> String {
        layout(
            "Server error",
            None,
            "<h1>500</h1><p>Something went wrong on our side.</p>",
        )
    }
}
