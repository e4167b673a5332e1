use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::error;

use crate::metrics;

/// Errors raised while serving a request
#[derive(Debug, Error)]
pub enum TubeError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("invalid target url: {0}")]
    InvalidTarget(String),

    #[error("playlist body exceeds {limit} bytes")]
    PlaylistTooLarge { limit: usize },

    #[error("feed request returned {0}")]
    FeedStatus(reqwest::StatusCode),

    #[error("failed to parse feed: {0}")]
    FeedParse(String),

    #[error("channel feed has no entries")]
    EmptyFeed,

    #[error("media resolver failed: {0}")]
    Resolver(String),

    #[error("media resolver timed out after {0:?}")]
    ResolverTimeout(Duration),

    #[error("failed to decode resolver output: {0}")]
    ResolverOutput(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TubeError>;

/// The HTTP endpoint a failure is reported against.
///
/// Each endpoint answers every failure with one fixed message; the
/// underlying cause only goes to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ChannelVideos,
    VideoDetails,
    LiveStream,
    Proxy,
}

impl Endpoint {
    /// Metric label
    pub fn label(self) -> &'static str {
        match self {
            Endpoint::ChannelVideos => "channel_videos",
            Endpoint::VideoDetails => "video_details",
            Endpoint::LiveStream => "live_stream",
            Endpoint::Proxy => "proxy",
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            Endpoint::ChannelVideos => "Unable to fetch channel videos",
            Endpoint::VideoDetails => "Unable to extract video details",
            Endpoint::LiveStream => "Unable to fetch live stream",
            Endpoint::Proxy => "Proxy failed",
        }
    }
}

/// A [`TubeError`] bound to the endpoint that produced it
#[derive(Debug)]
pub struct ApiError {
    pub endpoint: Endpoint,
    pub source: TubeError,
    /// When the failed request started, for the latency histogram
    pub started: Instant,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.endpoint.label(), self.source)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("{} request failed: {}", self.endpoint.label(), self.source);
        metrics::record_request(self.endpoint.label(), 500);
        metrics::record_duration(self.endpoint.label(), self.started);

        match self.endpoint {
            Endpoint::Proxy => {
                let mut response = (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    self.endpoint.failure_message(),
                )
                    .into_response();
                apply_cors(response.headers_mut());
                response
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": self.endpoint.failure_message() })),
            )
                .into_response(),
        }
    }
}

/// Attach an endpoint and the request's start time to a fallible result
pub trait ResultExt<T> {
    fn for_endpoint(self, endpoint: Endpoint, started: Instant) -> std::result::Result<T, ApiError>;
}

impl<T, E: Into<TubeError>> ResultExt<T> for std::result::Result<T, E> {
    fn for_endpoint(self, endpoint: Endpoint, started: Instant) -> std::result::Result<T, ApiError> {
        self.map_err(|e| ApiError {
            endpoint,
            source: e.into(),
            started,
        })
    }
}

/// Permissive CORS headers every proxy response carries.
pub fn apply_cors(headers: &mut axum::http::HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
}
