//! Channel video listing from the public Atom feed.
//!
//! The feed is parsed event-by-event with quick-xml; only the handful of
//! entry fields the API exposes are collected, and every one of them is
//! optional in the source document.

use chrono::DateTime;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, TubeError};

/// Prefix the feed puts in front of video ids in `<id>`
const VIDEO_ID_PREFIX: &str = "yt:video:";

/// Thumbnail used when the feed carries none for an entry
pub fn default_thumbnail(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)
}

/// Feed URL for a channel.
///
/// The channel id goes through the query serializer, so ids with `&` or `#`
/// cannot break out of the `channel_id` parameter.
pub fn feed_url(youtube_base_url: &str, channel_id: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/feeds/videos.xml", youtube_base_url))
        .map_err(|e| TubeError::FeedParse(format!("bad feed base url: {e}")))?;
    url.query_pairs_mut().append_pair("channel_id", channel_id);
    Ok(url)
}

/// One `<entry>` as found in the feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    /// `<id>`, e.g. `yt:video:dQw4w9WgXcQ`
    pub id: Option<String>,
    /// `<yt:videoId>`
    pub yt_video_id: Option<String>,
    pub title: Option<String>,
    /// `href` of the alternate `<link>`
    pub link: Option<String>,
    pub published: Option<String>,
    /// `<media:group><media:description>`
    pub description: Option<String>,
    /// `<media:thumbnail>` directly under the entry
    pub media_thumbnail: Option<String>,
    /// `<media:thumbnail>` elements inside `<media:group>`, in document order
    pub group_thumbnails: Vec<String>,
}

impl FeedEntry {
    /// Video id from `<id>` with its prefix stripped, else `<yt:videoId>`.
    pub fn video_id(&self) -> Option<String> {
        self.id
            .as_deref()
            .map(|id| id.strip_prefix(VIDEO_ID_PREFIX).unwrap_or(id).to_string())
            .filter(|id| !id.is_empty())
            .or_else(|| self.yt_video_id.clone())
    }

    /// Thumbnail by priority: the entry's own media thumbnail, then the
    /// first group thumbnail, then the conventional default for the id.
    pub fn thumbnail(&self, video_id: &str) -> String {
        self.media_thumbnail
            .clone()
            .or_else(|| self.group_thumbnails.first().cloned())
            .unwrap_or_else(|| default_thumbnail(video_id))
    }

    /// `<published>` as epoch milliseconds, when it is RFC 3339.
    pub fn published_millis(&self) -> Option<i64> {
        let published = self.published.as_deref()?;
        DateTime::parse_from_rfc3339(published.trim())
            .ok()
            .map(|dt| dt.timestamp_millis())
    }

    pub fn into_video(self) -> ChannelVideo {
        let video_id = self.video_id().unwrap_or_default();
        ChannelVideo {
            thumbnail: self.thumbnail(&video_id),
            published: self.published_millis(),
            title: self.title,
            link: self.link,
            description: self.description.unwrap_or_default(),
            video_id,
        }
    }
}

/// A video as returned by `GET /channel/{id}/videos`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChannelVideo {
    pub title: Option<String>,
    #[serde(rename = "videoId")]
    pub video_id: String,
    pub link: Option<String>,
    pub thumbnail: String,
    pub description: String,
    pub published: Option<i64>,
}

/// Fetch and parse a channel feed. Any non-2xx answer is an error.
pub async fn fetch_channel_feed(http: &Client, youtube_base_url: &str, channel_id: &str) -> Result<Vec<FeedEntry>> {
    let url = feed_url(youtube_base_url, channel_id)?;
    info!("Fetching channel feed: {}", url);

    let response = http.get(url.as_str()).send().await?;
    if !response.status().is_success() {
        return Err(TubeError::FeedStatus(response.status()));
    }

    let xml = response.text().await?;
    let entries = parse_feed(&xml)?;
    debug!("Channel {} feed has {} entries", channel_id, entries.len());
    Ok(entries)
}

/// Parse the entries of an Atom channel feed.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    // Element names from the root down to the current element
    let mut path: Vec<String> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| TubeError::FeedParse(format!("at byte {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(start) => {
                let name = element_name(&start);
                if name == "entry" {
                    current = Some(FeedEntry::default());
                }
                if let Some(entry) = current.as_mut() {
                    collect_attributes(entry, &path, &name, &start)?;
                }
                path.push(name);
            }
            Event::Empty(start) => {
                let name = element_name(&start);
                if let Some(entry) = current.as_mut() {
                    collect_attributes(entry, &path, &name, &start)?;
                }
            }
            Event::Text(text) => {
                if let Some(entry) = current.as_mut() {
                    let value = text
                        .unescape()
                        .map_err(|e| TubeError::FeedParse(e.to_string()))?;
                    collect_text(entry, &path, &value);
                }
            }
            Event::CData(data) => {
                if let Some(entry) = current.as_mut() {
                    let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    collect_text(entry, &path, &value);
                }
            }
            Event::End(_) => {
                if path.pop().as_deref() == Some("entry")
                    && let Some(entry) = current.take()
                {
                    entries.push(entry);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn attribute(start: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| TubeError::FeedParse(e.to_string()))?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| TubeError::FeedParse(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Name of the element enclosing the one being opened
fn parent(path: &[String]) -> Option<&str> {
    path.last().map(String::as_str)
}

fn collect_attributes(entry: &mut FeedEntry, path: &[String], name: &str, start: &BytesStart<'_>) -> Result<()> {
    match (parent(path), name) {
        (Some("entry"), "link") => {
            let rel = attribute(start, "rel")?;
            if entry.link.is_none() && matches!(rel.as_deref(), None | Some("alternate")) {
                entry.link = attribute(start, "href")?;
            }
        }
        (Some("entry"), "media:thumbnail") => {
            if entry.media_thumbnail.is_none() {
                entry.media_thumbnail = attribute(start, "url")?;
            }
        }
        (Some("media:group"), "media:thumbnail") => {
            if let Some(url) = attribute(start, "url")? {
                entry.group_thumbnails.push(url);
            }
        }
        _ => {}
    }
    Ok(())
}

fn collect_text(entry: &mut FeedEntry, path: &[String], value: &str) {
    let n = path.len();
    if n < 2 {
        return;
    }

    let slot = match (path[n - 2].as_str(), path[n - 1].as_str()) {
        ("entry", "id") => &mut entry.id,
        ("entry", "yt:videoId") => &mut entry.yt_video_id,
        ("entry", "title") => &mut entry.title,
        ("entry", "published") => &mut entry.published,
        ("media:group", "media:description") => &mut entry.description,
        _ => return,
    };

    slot.get_or_insert_with(String::new).push_str(value);
}
