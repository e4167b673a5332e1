//! Playlist-vs-media and cacheable-vs-volatile decisions for proxied responses.

/// MIME type of every rewritten playlist
pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Cache directive for segment-like responses. Segment URLs are
/// content-addressed upstream and never change.
pub const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

/// Cache directive for everything else (live playlists slide).
pub const NO_CACHE: &str = "no-cache";

/// Content-type fragments that identify an HLS playlist (lowercase).
const PLAYLIST_MIME_MARKERS: [&str; 2] = ["application/vnd.apple.mpegurl", "application/x-mpegurl"];

/// How a proxied upstream response should be treated.
///
/// The two flags are computed independently. A response may in principle be
/// both a playlist and cacheable (e.g. a `.m3u8` served as `video/...`); the
/// cache directive is decided from `is_cacheable` alone, and the body is
/// still rewritten because `is_playlist` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_playlist: bool,
    pub is_cacheable: bool,
}

impl Classification {
    /// Classify from the upstream `content-type` (empty when absent) and the
    /// caller-supplied target URL.
    ///
    /// Content-type is consulted first; the URL suffix covers upstreams that
    /// omit or mis-set it. The suffix check runs on the raw target string, so
    /// `index.m3u8?token=…` only matches through its content-type.
    pub fn of(content_type: &str, target_url: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();

        let is_cacheable = content_type.contains("video") || target_url.ends_with(".ts");

        let is_playlist = PLAYLIST_MIME_MARKERS
            .iter()
            .any(|marker| content_type.contains(marker))
            || target_url.ends_with(".m3u8");

        Self {
            is_playlist,
            is_cacheable,
        }
    }

    pub fn cache_control(&self) -> &'static str {
        if self.is_cacheable {
            IMMUTABLE_CACHE
        } else {
            NO_CACHE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apple_mpegurl_is_playlist() {
        let c = Classification::of(
            "application/vnd.apple.mpegurl",
            "https://cdn.example/live/index",
        );
        assert!(c.is_playlist);
        assert!(!c.is_cacheable);
        assert_eq!(c.cache_control(), NO_CACHE);
    }

    #[test]
    fn x_mpegurl_matches_case_insensitively() {
        let c = Classification::of(
            "application/x-mpegURL; charset=utf-8",
            "https://cdn.example/hls/playlist",
        );
        assert!(c.is_playlist);
        let c = Classification::of("APPLICATION/X-MPEGURL", "https://cdn.example/p");
        assert!(c.is_playlist);
    }

    #[test]
    fn m3u8_suffix_is_fallback_for_missing_content_type() {
        let c = Classification::of("", "https://cdn.example/a/b/index.m3u8");
        assert!(c.is_playlist);
        assert_eq!(c.cache_control(), NO_CACHE);

        let c = Classification::of("text/plain", "https://cdn.example/a/b/index.m3u8");
        assert!(c.is_playlist);
    }

    #[test]
    fn suffix_is_checked_on_the_raw_target() {
        let c = Classification::of("", "https://cdn.example/index.m3u8?token=abc");
        assert!(!c.is_playlist);
    }

    #[test]
    fn video_content_type_is_cacheable_media() {
        let c = Classification::of("video/mp2t", "https://cdn.example/seg/17");
        assert!(c.is_cacheable);
        assert!(!c.is_playlist);
        assert_eq!(c.cache_control(), IMMUTABLE_CACHE);
    }

    #[test]
    fn ts_suffix_is_cacheable_without_content_type() {
        let c = Classification::of("application/octet-stream", "https://cdn.example/seg001.ts");
        assert!(c.is_cacheable);
        assert!(!c.is_playlist);
    }

    #[test]
    fn unknown_binary_is_volatile_passthrough() {
        let c = Classification::of("application/octet-stream", "https://cdn.example/key1");
        assert_eq!(
            c,
            Classification {
                is_playlist: false,
                is_cacheable: false
            }
        );
        assert_eq!(c.cache_control(), NO_CACHE);
    }

    #[test]
    fn cacheability_is_independent_of_playlist_check() {
        let c = Classification::of("video/x-mpegurl", "https://cdn.example/odd.m3u8");
        assert!(c.is_playlist);
        assert!(c.is_cacheable);
        assert_eq!(c.cache_control(), IMMUTABLE_CACHE);
    }
}
