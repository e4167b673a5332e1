//! Resolver output model and the video/audio quality partition.

use serde::{Deserialize, Serialize};

/// The subset of `yt-dlp --dump-single-json` the API reads.
///
/// Every field is optional: extractors omit whatever they do not know.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MediaInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub is_live: Option<bool>,
    #[serde(default)]
    pub formats: Vec<Format>,
}

/// One entry of the resolver's `formats` list
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Format {
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub abr: Option<f64>,
}

impl Format {
    /// Carries a video track. A missing `vcodec` is not `"none"`, so it counts.
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some("none")
    }

    /// Audio track and explicitly no video.
    pub fn is_audio_only(&self) -> bool {
        self.acodec.as_deref() != Some("none") && self.vcodec.as_deref() == Some("none")
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VideoQuality {
    pub quality: Option<String>,
    pub resolution: Option<String>,
    pub fps: Option<f64>,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AudioQuality {
    pub bitrate: Option<f64>,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
}

/// Which listing the qualities are built for.
///
/// On-demand listings label a quality by `format_note`, falling back to the
/// resolution, and include the container; live listings use `format_note`
/// alone and leave the container out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    OnDemand,
    Live,
}

pub fn video_qualities(formats: &[Format], listing: Listing) -> Vec<VideoQuality> {
    formats
        .iter()
        .filter(|f| f.has_video())
        .map(|f| VideoQuality {
            quality: match listing {
                Listing::OnDemand => f.format_note.clone().or_else(|| f.resolution.clone()),
                Listing::Live => f.format_note.clone(),
            },
            resolution: f.resolution.clone(),
            fps: f.fps,
            url: f.url.clone(),
            ext: match listing {
                Listing::OnDemand => f.ext.clone(),
                Listing::Live => None,
            },
        })
        .collect()
}

pub fn audio_qualities(formats: &[Format], listing: Listing) -> Vec<AudioQuality> {
    formats
        .iter()
        .filter(|f| f.is_audio_only())
        .map(|f| AudioQuality {
            bitrate: f.abr,
            url: f.url.clone(),
            ext: match listing {
                Listing::OnDemand => f.ext.clone(),
                Listing::Live => None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MediaInfo {
        serde_json::from_str(
            r#"{
                "title": "Talk",
                "upload_date": "20240501",
                "thumbnail": "https://i.ytimg.com/vi/abc/maxres.jpg",
                "is_live": false,
                "extractor": "youtube",
                "formats": [
                    {"format_id": "sb0", "vcodec": "none", "acodec": "none", "url": "https://sb"},
                    {"format_id": "140", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.5, "ext": "m4a", "url": "https://a/140"},
                    {"format_id": "18", "vcodec": "avc1", "acodec": "mp4a", "format_note": "360p", "resolution": "640x360", "fps": 25, "ext": "mp4", "url": "https://v/18"},
                    {"format_id": "137", "vcodec": "avc1", "acodec": "none", "resolution": "1920x1080", "fps": 30.0, "ext": "mp4", "url": "https://v/137"},
                    {"format_id": "x", "url": "https://v/unknown"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn video_formats_exclude_only_explicit_none() {
        let info = sample();
        let video = video_qualities(&info.formats, Listing::OnDemand);
        let urls: Vec<_> = video.iter().map(|q| q.url.as_deref().unwrap()).collect();
        assert_eq!(urls, ["https://v/18", "https://v/137", "https://v/unknown"]);
    }

    #[test]
    fn on_demand_quality_falls_back_to_resolution() {
        let info = sample();
        let video = video_qualities(&info.formats, Listing::OnDemand);
        assert_eq!(video[0].quality.as_deref(), Some("360p"));
        assert_eq!(video[1].quality.as_deref(), Some("1920x1080"));
        assert_eq!(video[1].ext.as_deref(), Some("mp4"));
        assert_eq!(video[0].fps, Some(25.0));
    }

    #[test]
    fn live_quality_uses_format_note_only_and_drops_ext() {
        let info = sample();
        let video = video_qualities(&info.formats, Listing::Live);
        assert_eq!(video[1].quality, None);
        assert!(video.iter().all(|q| q.ext.is_none()));

        let json = serde_json::to_value(&video[0]).unwrap();
        assert!(json.get("ext").is_none());
    }

    #[test]
    fn audio_only_requires_explicit_no_video() {
        let info = sample();
        let audio = audio_qualities(&info.formats, Listing::OnDemand);
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].bitrate, Some(129.5));
        assert_eq!(audio[0].url.as_deref(), Some("https://a/140"));
        assert_eq!(audio[0].ext.as_deref(), Some("m4a"));
    }

    #[test]
    fn missing_formats_list_is_empty() {
        let info: MediaInfo = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert!(info.formats.is_empty());
        assert!(video_qualities(&info.formats, Listing::OnDemand).is_empty());
    }

    #[test]
    fn null_fields_are_tolerated() {
        let info: MediaInfo =
            serde_json::from_str(r#"{"title": null, "formats": [{"fps": null, "vcodec": null}]}"#)
                .unwrap();
        assert_eq!(info.title, None);
        assert!(info.formats[0].has_video());
    }
}
