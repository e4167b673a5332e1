use crate::{
    config::Config,
    error::Result,
    upstream::UpstreamClient,
    youtube::{MediaResolver, YtDlpResolver},
};
use std::sync::Arc;
use tokio_util::task::TaskTracker;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Shared HTTP client for connection pooling
    pub upstream: UpstreamClient,
    /// Media-resolution backend for the details and live endpoints
    pub resolver: Arc<dyn MediaResolver>,
    /// In-flight passthrough relays, awaited on shutdown
    pub relays: TaskTracker,
}

impl AppState {
    /// Create state with the yt-dlp resolver from `config`
    pub fn new(config: Config) -> Result<Self> {
        let resolver = YtDlpResolver::new(config.ytdlp_path.clone(), config.resolver_timeout());
        Self::with_resolver(config, Arc::new(resolver))
    }

    /// Create state with a caller-provided resolver
    pub fn with_resolver(config: Config, resolver: Arc<dyn MediaResolver>) -> Result<Self> {
        let upstream = UpstreamClient::new(&config)?;

        Ok(Self {
            config: Arc::new(config),
            upstream,
            resolver,
            relays: TaskTracker::new(),
        })
    }
}
