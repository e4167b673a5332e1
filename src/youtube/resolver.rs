use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::formats::MediaInfo;
use crate::error::{Result, TubeError};

/// Watch-page URL for a video id
pub fn watch_url(youtube_base_url: &str, video_id: &str) -> String {
    format!(
        "{}/watch?v={}",
        youtube_base_url,
        urlencoding::encode(video_id)
    )
}

/// Resolves a page URL into its title, live flag and playable formats.
///
/// The HTTP handlers only depend on this trait, so the external tool can be
/// swapped or stubbed out in tests.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<MediaInfo>;
}

/// [`MediaResolver`] backed by the `yt-dlp` binary.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    binary: String,
    timeout: Duration,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn command(&self, url: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--dump-single-json")
            .arg("--no-warnings")
            .arg("--no-check-certificates")
            .arg("--")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future (client gone, timeout) must not leave yt-dlp running
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    async fn resolve(&self, url: &str) -> Result<MediaInfo> {
        info!("Resolving media for {}", url);

        let output = tokio::time::timeout(self.timeout, self.command(url).output())
            .await
            .map_err(|_| {
                warn!("yt-dlp timed out after {:?} for {}", self.timeout, url);
                TubeError::ResolverTimeout(self.timeout)
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TubeError::Resolver(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let info: MediaInfo = serde_json::from_slice(&output.stdout)?;
        debug!(
            "Resolved {}: {} formats, live={:?}",
            url,
            info.formats.len(),
            info.is_live
        );
        Ok(info)
    }
}
