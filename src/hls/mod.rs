//! HLS playlist handling for the proxy: response classification and
//! URI rewriting.

pub mod classify;
pub mod rewrite;

pub use classify::{Classification, PLAYLIST_CONTENT_TYPE};
pub use rewrite::{PROXY_PATH, proxy_url, rewrite_playlist, target_from_proxy_url};
