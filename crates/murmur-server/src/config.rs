use std::path::PathBuf;
use std::time::Duration;

/// Tuning knobs for the HTTP front. Defaults suit local development; `main`
/// overrides them from `MURMUR_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// `None` keeps the whole store in memory.
    pub database_path: Option<PathBuf>,
    pub media_root: PathBuf,
    pub page_size: usize,
    /// Staleness window for the cached global index.
    pub index_cache_ttl: Duration,
    /// Signs session cookies. The default is for development only.
    pub session_secret: String,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            database_path: None,
            media_root: PathBuf::from("media"),
            page_size: 10,
            index_cache_ttl: Duration::from_secs(20),
            session_secret: "murmur-dev-secret".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}
