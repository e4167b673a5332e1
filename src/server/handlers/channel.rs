use crate::{
    error::{ApiError, Endpoint, ResultExt, TubeError},
    metrics,
    server::state::AppState,
    youtube::{
        AudioQuality, ChannelVideo, Listing, VideoQuality, audio_qualities, fetch_channel_feed,
        video_qualities, watch_url,
    },
};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Serialize, Serializer};
use std::time::Instant;
use tracing::info;

/// List the videos in a channel's feed
pub async fn channel_videos(
    Path(channel_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ChannelVideo>>, ApiError> {
    let start = Instant::now();
    info!("Listing videos for channel: {}", channel_id);

    let entries = fetch_channel_feed(
        state.upstream.http(),
        &state.config.youtube_base_url,
        &channel_id,
    )
    .await
    .for_endpoint(Endpoint::ChannelVideos, start)?;

    let videos: Vec<ChannelVideo> = entries.into_iter().map(|e| e.into_video()).collect();

    metrics::record_request("channel_videos", 200);
    metrics::record_duration("channel_videos", start);

    Ok(Json(videos))
}

/// The `live` field of a [`LiveStatus`], fixed by the variant it sits in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveFlag<const LIVE: bool>;

impl<const LIVE: bool> Serialize for LiveFlag<LIVE> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(LIVE)
    }
}

/// Body of `GET /channel/{id}/live`
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LiveStatus {
    Offline {
        live: LiveFlag<false>,
        message: &'static str,
    },
    Live {
        live: LiveFlag<true>,
        title: Option<String>,
        #[serde(rename = "videoId")]
        video_id: String,
        thumbnail: Option<String>,
        #[serde(rename = "videoQualities")]
        video_qualities: Vec<VideoQuality>,
        #[serde(rename = "audioQualities")]
        audio_qualities: Vec<AudioQuality>,
    },
}

/// Check whether the channel's most recent upload is a live broadcast
pub async fn channel_live(
    Path(channel_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LiveStatus>, ApiError> {
    let start = Instant::now();
    info!("Checking live status for channel: {}", channel_id);

    let latest = fetch_channel_feed(
        state.upstream.http(),
        &state.config.youtube_base_url,
        &channel_id,
    )
    .await
    .for_endpoint(Endpoint::LiveStream, start)?
    .into_iter()
    .next()
    .ok_or(TubeError::EmptyFeed)
    .for_endpoint(Endpoint::LiveStream, start)?;

    let video_id = latest
        .video_id()
        .ok_or_else(|| TubeError::FeedParse("latest entry has no video id".to_string()))
        .for_endpoint(Endpoint::LiveStream, start)?;

    let info = state
        .resolver
        .resolve(&watch_url(&state.config.youtube_base_url, &video_id))
        .await
        .for_endpoint(Endpoint::LiveStream, start)?;

    metrics::record_request("live_stream", 200);
    metrics::record_duration("live_stream", start);

    if info.is_live != Some(true) {
        info!("Channel {} is not live (latest: {})", channel_id, video_id);
        return Ok(Json(LiveStatus::Offline {
            live: LiveFlag,
            message: "Channel is not live right now.",
        }));
    }

    info!("Channel {} is live with {}", channel_id, video_id);
    Ok(Json(LiveStatus::Live {
        live: LiveFlag,
        title: info.title,
        video_id,
        thumbnail: info.thumbnail,
        video_qualities: video_qualities(&info.formats, Listing::Live),
        audio_qualities: audio_qualities(&info.formats, Listing::Live),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn offline_status_serializes_live_false() {
        let status = LiveStatus::Offline {
            live: LiveFlag,
            message: "Channel is not live right now.",
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({ "live": false, "message": "Channel is not live right now." })
        );
    }

    #[test]
    fn live_status_serializes_live_true() {
        let status = LiveStatus::Live {
            live: LiveFlag,
            title: Some("Now".to_string()),
            video_id: "abc".to_string(),
            thumbnail: None,
            video_qualities: Vec::new(),
            audio_qualities: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "live": true,
                "title": "Now",
                "videoId": "abc",
                "thumbnail": null,
                "videoQualities": [],
                "audioQualities": []
            })
        );
    }
}
