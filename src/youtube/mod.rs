//! Collaborators behind the metadata endpoints: the channel Atom feed and
//! the external media-resolution tool.

pub mod feed;
pub mod formats;
pub mod resolver;

pub use feed::{ChannelVideo, FeedEntry, fetch_channel_feed};
pub use formats::{AudioQuality, Listing, MediaInfo, VideoQuality, audio_qualities, video_qualities};
pub use resolver::{MediaResolver, YtDlpResolver, watch_url};
