#![forbid(unsafe_code)]

use murmur_server::{build_router, AppState, ServerConfig};
use murmur_store::EntityStore;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_string(name: &str, default: &str) -> String {
    env::var(name).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_secs(name: &str, default_secs: u64) -> Duration {
    let secs = env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

fn config_from_env() -> ServerConfig {
    let defaults = ServerConfig::default();
    ServerConfig {
        bind_addr: env_string("MURMUR_BIND_ADDR", &defaults.bind_addr),
        database_path: env::var("MURMUR_DATABASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from),
        media_root: PathBuf::from(env_string(
            "MURMUR_MEDIA_ROOT",
            &defaults.media_root.to_string_lossy(),
        )),
        page_size: env_usize("MURMUR_PAGE_SIZE", defaults.page_size),
        index_cache_ttl: env_duration_secs(
            "MURMUR_INDEX_CACHE_TTL_SECS",
            defaults.index_cache_ttl.as_secs(),
        ),
        session_secret: env_string("MURMUR_SESSION_SECRET", &defaults.session_secret),
        max_body_bytes: env_usize("MURMUR_MAX_BODY_BYTES", defaults.max_body_bytes),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config_from_env();
    let store = match &config.database_path {
        Some(path) => EntityStore::open(path),
        None => EntityStore::open_in_memory(),
    };
    let store = match store {
        Ok(store) => store,
        Err(err) => {
            error!(error = %err, "failed to open entity store");
            std::process::exit(1);
        }
    };

    info!(
        bind_addr = %config.bind_addr,
        database = ?config.database_path,
        ttl_secs = config.index_cache_ttl.as_secs(),
        "starting murmur"
    );

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(store, config);
    let app = build_router(state);

    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, addr = %bind_addr, "failed to bind");
            std::process::exit(1);
        }
    };
    if let Err(err) = axum::serve(listener, app).await {
        error!(error = %err, "server exited");
        std::process::exit(1);
    }
}
