use std::env;
use std::time::Duration;

/// Default listen port when `PORT` is unset
pub const DEFAULT_PORT: u16 = 3000;
/// Default base for channel feeds and watch URLs
pub const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.youtube.com";
/// Default location of the media-resolution tool
pub const DEFAULT_YTDLP_PATH: &str = "/usr/local/bin/yt-dlp";
/// Default upper bound on a buffered playlist body (8 MiB)
pub const DEFAULT_MAX_PLAYLIST_BYTES: usize = 8 * 1024 * 1024;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Base URL for `/feeds/videos.xml` and `/watch` lookups
    pub youtube_base_url: String,
    /// Path to the yt-dlp binary
    pub ytdlp_path: String,
    /// Upstream TCP/TLS connect timeout in seconds
    pub upstream_connect_timeout_secs: u64,
    /// Upstream idle-read timeout in seconds (applies between body chunks)
    pub upstream_read_timeout_secs: u64,
    /// Wall-clock limit for one resolver invocation in seconds
    pub resolver_timeout_secs: u64,
    /// Largest playlist body the proxy will buffer for rewriting
    pub max_playlist_bytes: usize,
    /// Chunks held between the upstream reader and the client writer
    pub relay_buffer_chunks: usize,
    /// Prometheus exporter port; exporter is disabled when `None`
    pub metrics_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every variable has a default. Values that are present but unparsable
    /// are rejected rather than silently replaced.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let port = match env::var("PORT") {
            Ok(value) => value
                .parse()
                .map_err(|e| format!("PORT must be a valid port number: {e}"))?,
            Err(_) => DEFAULT_PORT,
        };

        let youtube_base_url = env::var("YOUTUBE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_YOUTUBE_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let ytdlp_path = env::var("YTDLP_PATH").unwrap_or_else(|_| DEFAULT_YTDLP_PATH.to_string());

        let upstream_connect_timeout_secs = parse_var("UPSTREAM_CONNECT_TIMEOUT_SECS", 10)?;
        let upstream_read_timeout_secs = parse_var("UPSTREAM_READ_TIMEOUT_SECS", 30)?;
        let resolver_timeout_secs = parse_var("RESOLVER_TIMEOUT_SECS", 60)?;
        let max_playlist_bytes = parse_var("MAX_PLAYLIST_BYTES", DEFAULT_MAX_PLAYLIST_BYTES)?;
        let relay_buffer_chunks = parse_var("RELAY_BUFFER_CHUNKS", 8usize)?.max(1);

        let metrics_port = match env::var("METRICS_PORT") {
            Ok(value) => Some(
                value
                    .parse()
                    .map_err(|e| format!("METRICS_PORT must be a valid port number: {e}"))?,
            ),
            Err(_) => None,
        };

        Ok(Config {
            port,
            youtube_base_url,
            ytdlp_path,
            upstream_connect_timeout_secs,
            upstream_read_timeout_secs,
            resolver_timeout_secs,
            max_playlist_bytes,
            relay_buffer_chunks,
            metrics_port,
        })
    }

    pub fn upstream_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_connect_timeout_secs)
    }

    pub fn upstream_read_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_read_timeout_secs)
    }

    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_secs(self.resolver_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            youtube_base_url: DEFAULT_YOUTUBE_BASE_URL.to_string(),
            ytdlp_path: DEFAULT_YTDLP_PATH.to_string(),
            upstream_connect_timeout_secs: 10,
            upstream_read_timeout_secs: 30,
            resolver_timeout_secs: 60,
            max_playlist_bytes: DEFAULT_MAX_PLAYLIST_BYTES,
            relay_buffer_chunks: 8,
            metrics_port: None,
        }
    }
}

/// Parse an optional numeric env var, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| format!("{name} is invalid: {e}").into()),
        Err(_) => Ok(default),
    }
}
