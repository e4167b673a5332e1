//! Outbound fetches for the proxy.
//!
//! Every call is a single attempt. Proxied playlist and segment URLs are
//! usually signed and short-lived, so a failed request is reported instead
//! of being retried.

use crate::{
    config::Config,
    error::{Result, TubeError},
    relay,
};
use axum::body::Body;
use reqwest::{
    Client, StatusCode,
    header::{self, HeaderMap, HeaderValue},
};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};
use url::Url;

/// Upstream response headers relayed to the client on passthrough responses
pub const RELAYED_HEADERS: [header::HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
];

/// Shared HTTP client for upstream media, playlists and feeds.
#[derive(Clone, Debug)]
pub struct UpstreamClient {
    http: Client,
}

impl UpstreamClient {
    /// Build the pooled client with the configured connect and idle-read
    /// timeouts. No overall request timeout is set: long segments and
    /// slow players must not be cut off mid-body.
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.upstream_connect_timeout())
            .read_timeout(config.upstream_read_timeout())
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .pool_max_idle_per_host(16)
            .user_agent(concat!("tubeproxy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http })
    }

    /// The underlying client, for collaborators that need plain GETs.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// GET `target`, forwarding `range` verbatim when the player sent one.
    ///
    /// Any status the upstream answers with is returned as-is; only
    /// transport failures become errors.
    pub async fn fetch(&self, target: &Url, range: Option<&HeaderValue>) -> Result<UpstreamResponse> {
        let mut request = self.http.get(target.as_str());
        if let Some(range) = range {
            request = request.header(header::RANGE, range.clone());
        }

        let response = request.send().await.map_err(|e| {
            warn!("Upstream fetch failed for {}: {}", target, e);
            e
        })?;

        debug!("Upstream {} answered {}", target, response.status());
        Ok(UpstreamResponse { response })
    }
}

/// Upstream response whose body has not been consumed yet.
#[derive(Debug)]
pub struct UpstreamResponse {
    response: reqwest::Response,
}

impl UpstreamResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// `content-type` of the response, or `""` when absent or not ASCII.
    pub fn content_type(&self) -> &str {
        self.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    /// Copy of the allow-listed headers for a passthrough response.
    pub fn relayed_headers(&self) -> HeaderMap {
        let mut relayed = HeaderMap::new();
        for name in RELAYED_HEADERS {
            if let Some(value) = self.headers().get(&name) {
                relayed.insert(name, value.clone());
            }
        }
        relayed
    }

    /// Read the whole body as text, refusing bodies larger than `limit` bytes.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; the rewriter leaves
    /// lines it does not understand alone anyway.
    pub async fn into_text(mut self, limit: usize) -> Result<String> {
        if let Some(length) = self.response.content_length()
            && length > limit as u64
        {
            return Err(TubeError::PlaylistTooLarge { limit });
        }

        let mut buf = Vec::new();
        while let Some(chunk) = self.response.chunk().await? {
            if buf.len() + chunk.len() > limit {
                return Err(TubeError::PlaylistTooLarge { limit });
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Hand the body to a relay task and return the client-side stream.
    pub fn into_body(self, buffer_chunks: usize, tracker: &TaskTracker) -> Body {
        relay::relay_body(self.response, buffer_chunks, tracker)
    }
}
