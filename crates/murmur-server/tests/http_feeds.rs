mod support;

use murmur_model::{GroupSlug, Username};
use murmur_store::PostFilter;
use support::{get, get_bytes, header_value, login, post_multipart, spawn_app};

const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x01];

#[tokio::test]
async fn anonymous_post_redirects_to_login_and_creates_nothing() {
    let (addr, state) = spawn_app().await;

    let (status, head, _) = post_multipart(addr, "/new/", None, "DRIVE BY", None, None).await;
    assert_eq!(status, 303);
    assert_eq!(
        header_value(&head, "location").as_deref(),
        Some("/auth/login/?next=/new/")
    );

    let store = state.store.lock().await;
    assert_eq!(store.count_posts(&PostFilter::default()).unwrap(), 0);
}

#[tokio::test]
async fn authenticated_post_lands_on_every_uncached_feed() {
    let (addr, state) = spawn_app().await;
    let group_id = {
        let store = state.store.lock().await;
        store
            .create_group("Rust", &GroupSlug::parse("rust").unwrap(), "rustaceans")
            .unwrap()
            .id
    };

    let cookie = login(addr, "alice").await;
    let (status, head, _) = post_multipart(
        addr,
        "/new/",
        Some(&cookie),
        "TEST_TEXT_AUTHORIZED",
        Some(group_id.get()),
        None,
    )
    .await;
    assert_eq!(status, 303);
    assert_eq!(header_value(&head, "location").as_deref(), Some("/"));

    {
        let store = state.store.lock().await;
        assert_eq!(store.count_posts(&PostFilter::default()).unwrap(), 1);
        let record = &store.posts_page(&PostFilter::default(), 10, 0).unwrap()[0];
        assert_eq!(record.author.username, "alice");
        assert_eq!(record.group.as_ref().unwrap().slug, "rust");
    }

    for path in ["/group/rust/", "/alice/"] {
        let (status, _, body) = get(addr, path, None).await;
        assert_eq!(status, 200, "{path}");
        assert!(body.contains("TEST_TEXT_AUTHORIZED"), "{path}");
    }

    // The cached index sees it too once the cache is flushed.
    state.flush_index_cache().await;
    let (status, _, body) = get(addr, "/", None).await;
    assert_eq!(status, 200);
    assert!(body.contains("TEST_TEXT_AUTHORIZED"));
}

#[tokio::test]
async fn global_index_serves_stale_bytes_until_flushed() {
    let (addr, state) = spawn_app().await;
    let cookie = login(addr, "alice").await;

    post_multipart(addr, "/new/", Some(&cookie), "TEST_TEXT_1", None, None).await;
    let (_, _, first) = get(addr, "/", None).await;
    assert!(first.contains("TEST_TEXT_1"));

    post_multipart(addr, "/new/", Some(&cookie), "TEST_TEXT_2", None, None).await;
    let (_, _, second) = get(addr, "/", None).await;
    // Byte-identical within the TTL window; the new post is invisible.
    assert_eq!(first, second);
    assert!(!second.contains("TEST_TEXT_2"));

    state.flush_index_cache().await;
    let (_, _, third) = get(addr, "/", None).await;
    assert!(third.contains("TEST_TEXT_1"));
    assert!(third.contains("TEST_TEXT_2"));
}

#[tokio::test]
async fn cached_index_replays_etag() {
    let (addr, _state) = spawn_app().await;

    let (_, head_a, _) = get(addr, "/", None).await;
    let (_, head_b, _) = get(addr, "/", None).await;
    let etag_a = header_value(&head_a, "etag").expect("etag on index");
    let etag_b = header_value(&head_b, "etag").expect("etag on cached index");
    assert_eq!(etag_a, etag_b);
}

#[tokio::test]
async fn profile_pagination_clamps_to_valid_pages() {
    let (addr, state) = spawn_app().await;
    {
        let store = state.store.lock().await;
        let alice = store
            .create_user(&Username::parse("alice").unwrap(), "Alice")
            .unwrap();
        for i in 0..11 {
            let at = chrono::Utc::now() + chrono::Duration::seconds(i);
            store
                .create_post(alice.id, &format!("post number {i}"), None, None, at)
                .unwrap();
        }
    }

    let (status, _, body) = get(addr, "/alice/?page=0", None).await;
    assert_eq!(status, 200);
    assert!(body.contains("page 1 of 2"));

    let (status, _, body) = get(addr, "/alice/?page=99", None).await;
    assert_eq!(status, 200);
    assert!(body.contains("page 2 of 2"));

    let (status, _, body) = get(addr, "/alice/?page=abc", None).await;
    assert_eq!(status, 200);
    assert!(body.contains("page 1 of 2"));
}

#[tokio::test]
async fn unresolved_slugs_usernames_and_ids_are_404() {
    let (addr, state) = spawn_app().await;
    {
        let store = state.store.lock().await;
        store
            .create_user(&Username::parse("alice").unwrap(), "Alice")
            .unwrap();
    }

    for path in [
        "/group/ghost-group/",
        "/ghost/",
        "/alice/999/",
        "/alice/not-a-number/",
        "/no/such/route/here/",
    ] {
        let (status, _, body) = get(addr, path, None).await;
        assert_eq!(status, 404, "{path}");
        assert!(body.contains("404"), "{path}");
    }
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let (addr, _state) = spawn_app().await;
    let (_, head, _) = get(addr, "/", None).await;
    assert!(header_value(&head, "x-request-id").is_some());

    let (_, head, _) = get(addr, "/no/such/route/", None).await;
    assert!(header_value(&head, "x-request-id").is_some());
}

#[tokio::test]
async fn non_author_edit_is_silently_redirected_and_changes_nothing() {
    let (addr, state) = spawn_app().await;
    let alice_cookie = login(addr, "alice").await;
    post_multipart(addr, "/new/", Some(&alice_cookie), "ORIGINAL_TEXT", None, None).await;
    let post_id = {
        let store = state.store.lock().await;
        store.posts_page(&PostFilter::default(), 10, 0).unwrap()[0]
            .post
            .id
    };

    let bob_cookie = login(addr, "bob").await;
    let edit_path = format!("/alice/{post_id}/edit/");
    let detail_path = format!("/alice/{post_id}/");

    // GET of the edit form and POST of an edit both bounce to the detail view.
    let (status, head, _) = get(addr, &edit_path, Some(&bob_cookie)).await;
    assert_eq!(status, 303);
    assert_eq!(header_value(&head, "location").as_deref(), Some(detail_path.as_str()));

    let (status, head, _) = post_multipart(
        addr,
        &edit_path,
        Some(&bob_cookie),
        "HIJACKED_TEXT",
        None,
        None,
    )
    .await;
    assert_eq!(status, 303);
    assert_eq!(header_value(&head, "location").as_deref(), Some(detail_path.as_str()));

    // Anonymous editors get the same treatment.
    let (status, _, _) = get(addr, &edit_path, None).await;
    assert_eq!(status, 303);

    let (_, _, body) = get(addr, &detail_path, None).await;
    assert!(body.contains("ORIGINAL_TEXT"));
    assert!(!body.contains("HIJACKED_TEXT"));
}

#[tokio::test]
async fn author_edit_persists_and_shows_everywhere() {
    let (addr, state) = spawn_app().await;
    let cookie = login(addr, "alice").await;
    post_multipart(addr, "/new/", Some(&cookie), "BEFORE_EDIT", None, None).await;
    let post_id = {
        let store = state.store.lock().await;
        store.posts_page(&PostFilter::default(), 10, 0).unwrap()[0]
            .post
            .id
    };

    let edit_path = format!("/alice/{post_id}/edit/");
    let (status, head, _) =
        post_multipart(addr, &edit_path, Some(&cookie), "AFTER_EDIT", None, None).await;
    assert_eq!(status, 303);
    assert_eq!(
        header_value(&head, "location").as_deref(),
        Some(format!("/alice/{post_id}/").as_str())
    );

    for path in [format!("/alice/{post_id}/"), "/alice/".to_string()] {
        let (_, _, body) = get(addr, &path, None).await;
        assert!(body.contains("AFTER_EDIT"), "{path}");
        assert!(!body.contains("BEFORE_EDIT"), "{path}");
    }
}

#[tokio::test]
async fn non_image_upload_is_rejected_with_a_field_error() {
    let (addr, state) = spawn_app().await;
    let cookie = login(addr, "alice").await;

    let (status, _, body) = post_multipart(
        addr,
        "/new/",
        Some(&cookie),
        "TEST_TEXT",
        None,
        Some(("non_picture.xlsx", b"PK\x03\x04 not an image")),
    )
    .await;
    assert_eq!(status, 200);
    assert!(body.contains("Upload a valid image."));
    // The entered text is redisplayed, nothing is persisted.
    assert!(body.contains("TEST_TEXT"));
    let store = state.store.lock().await;
    assert_eq!(store.count_posts(&PostFilter::default()).unwrap(), 0);
}

#[tokio::test]
async fn image_upload_is_stored_and_served() {
    let (addr, state) = spawn_app().await;
    let cookie = login(addr, "alice").await;

    let (status, _, _) = post_multipart(
        addr,
        "/new/",
        Some(&cookie),
        "with picture",
        None,
        Some(("test_image.png", PNG_BYTES)),
    )
    .await;
    assert_eq!(status, 303);

    let image_path = {
        let store = state.store.lock().await;
        store.posts_page(&PostFilter::default(), 10, 0).unwrap()[0]
            .post
            .image
            .clone()
            .expect("image stored on post")
    };
    assert_eq!(image_path, "posts/test_image.png");

    let (status, head, body) = get_bytes(addr, &format!("/media/{image_path}"), None).await;
    assert_eq!(status, 200);
    assert_eq!(header_value(&head, "content-type").as_deref(), Some("image/png"));
    assert_eq!(body, PNG_BYTES);

    let (_, _, detail) = get(addr, "/alice/", None).await;
    assert!(detail.contains("/media/posts/test_image.png"));
}

#[tokio::test]
async fn blank_text_redisplays_the_form_without_persisting() {
    let (addr, state) = spawn_app().await;
    let cookie = login(addr, "alice").await;

    let (status, _, body) = post_multipart(addr, "/new/", Some(&cookie), "   ", None, None).await;
    assert_eq!(status, 200);
    assert!(body.contains("This field is required."));
    let store = state.store.lock().await;
    assert_eq!(store.count_posts(&PostFilter::default()).unwrap(), 0);
}

#[tokio::test]
async fn detail_view_shows_comments() {
    let (addr, state) = spawn_app().await;
    let post_id = {
        let store = state.store.lock().await;
        let alice = store
            .create_user(&Username::parse("alice").unwrap(), "Alice")
            .unwrap();
        let bob = store
            .create_user(&Username::parse("bob").unwrap(), "Bob")
            .unwrap();
        let post = store
            .create_post(alice.id, "look at this", None, None, chrono::Utc::now())
            .unwrap();
        store
            .create_comment(post.id, bob.id, "COMMENT_TEXT", chrono::Utc::now())
            .unwrap();
        post.id
    };

    let (status, _, body) = get(addr, &format!("/alice/{post_id}/"), None).await;
    assert_eq!(status, 200);
    assert!(body.contains("look at this"));
    assert!(body.contains("COMMENT_TEXT"));
}
