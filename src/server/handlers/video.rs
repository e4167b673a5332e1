use crate::{
    error::{ApiError, Endpoint, ResultExt},
    metrics,
    server::state::AppState,
    youtube::{AudioQuality, Listing, VideoQuality, audio_qualities, video_qualities, watch_url},
};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Body of `GET /video/{id}/details`
#[derive(Debug, Serialize)]
pub struct VideoDetails {
    pub title: Option<String>,
    pub upload_date: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(rename = "videoQualities")]
    pub video_qualities: Vec<VideoQuality>,
    #[serde(rename = "audioQualities")]
    pub audio_qualities: Vec<AudioQuality>,
}

/// Resolve a video's metadata and direct stream URLs
pub async fn video_details(
    Path(video_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<VideoDetails>, ApiError> {
    let start = Instant::now();
    info!("Extracting details for video: {}", video_id);

    let info = state
        .resolver
        .resolve(&watch_url(&state.config.youtube_base_url, &video_id))
        .await
        .for_endpoint(Endpoint::VideoDetails, start)?;

    let details = VideoDetails {
        video_qualities: video_qualities(&info.formats, Listing::OnDemand),
        audio_qualities: audio_qualities(&info.formats, Listing::OnDemand),
        title: info.title,
        upload_date: info.upload_date,
        thumbnail: info.thumbnail,
    };

    info!(
        "Video {}: {} video / {} audio qualities",
        video_id,
        details.video_qualities.len(),
        details.audio_qualities.len()
    );

    metrics::record_request("video_details", 200);
    metrics::record_duration("video_details", start);

    Ok(Json(details))
}
