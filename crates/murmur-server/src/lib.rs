#![forbid(unsafe_code)]

//! HTTP front for the platform: route table, application state, and the
//! list-page cache wrapping the global index.

mod cache;
mod config;
mod extract;
mod http;
mod media;
mod middleware;
mod render;
mod sessions;

pub use cache::{sha256_hex, CachedPage, ListPageCache};
pub use config::ServerConfig;
pub use extract::LOGIN_PATH;
pub use media::FsMediaStore;
pub use render::{escape_html, PageRenderer};
pub use sessions::{SignedSessions, SESSION_COOKIE};

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use chrono::Duration as ChronoDuration;
use murmur_core::{Clock, IdentityService, MediaStore, Renderer, SystemClock};
use murmur_store::EntityStore;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const CRATE_NAME: &str = "murmur-server";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<EntityStore>>,
    pub index_cache: Arc<Mutex<ListPageCache>>,
    pub sessions: Arc<dyn IdentityService>,
    pub renderer: Arc<dyn Renderer>,
    pub media: Arc<dyn MediaStore>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<ServerConfig>,
    pub request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(store: EntityStore, config: ServerConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Same as [`AppState::new`] but with an explicit clock so tests can
    /// advance time instead of sleeping through the cache TTL.
    #[must_use]
    pub fn with_clock(store: EntityStore, config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
        let ttl = ChronoDuration::milliseconds(config.index_cache_ttl.as_millis() as i64);
        Self {
            store: Arc::new(Mutex::new(store)),
            index_cache: Arc::new(Mutex::new(ListPageCache::new(ttl))),
            sessions: Arc::new(SignedSessions::new(&config.session_secret)),
            renderer: Arc::new(PageRenderer),
            media: Arc::new(FsMediaStore::new(config.media_root.clone())),
            clock,
            config: Arc::new(config),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn flush_index_cache(&self) {
        self.index_cache.lock().await.flush();
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::feeds::index_handler))
        .route("/group/:slug/", get(http::feeds::group_handler))
        .route(
            "/new/",
            get(http::posts::new_post_form_handler).post(http::posts::new_post_submit_handler),
        )
        .route("/follow/", get(http::feeds::follow_index_handler))
        .route(
            "/auth/login/",
            get(http::auth::login_form_handler).post(http::auth::login_submit_handler),
        )
        .route("/auth/logout/", get(http::auth::logout_handler))
        .route("/media/*path", get(http::media_files::media_handler))
        .route("/:username/", get(http::feeds::profile_handler))
        .route("/:username/follow/", get(http::social::follow_handler))
        .route("/:username/unfollow/", get(http::social::unfollow_handler))
        .route("/:username/:post_id/", get(http::posts::post_detail_handler))
        .route(
            "/:username/:post_id/edit/",
            get(http::posts::post_edit_form_handler).post(http::posts::post_edit_submit_handler),
        )
        .route(
            "/:username/:post_id/comment/",
            post(http::posts::add_comment_handler),
        )
        .fallback(http::not_found_handler)
        .layer(from_fn_with_state(state.clone(), middleware::identity_middleware))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::request_tracing_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}
