//! YT-DLP resolver - direct stream URLs for YouTube and Facebook links
//!
//! yt-dlp is run as a child process in metadata-only mode. Only the single
//! best pre-muxed stream is requested, and playlists are never expanded.

use super::{MediaResolver, Resolution, ResolveError};
use crate::media::MediaItem;
use crate::platform::Platform;
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Arguments passed before the URL on every invocation
const YTDLP_ARGS: &[&str] = &[
    "--dump-single-json",
    "--no-playlist",
    "--format",
    "best",
    "--quiet",
    "--no-warnings",
    "--no-progress",
];

/// Patterns indicating the media itself cannot be fetched
const FATAL_ERROR_PATTERNS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video is not available",
    "Sign in to confirm your age",
    "age-restricted",
    "members-only",
    "This video is private",
    "removed by the uploader",
    "no longer available",
    "blocked it in your country",
    "geo-restricted",
    "copyright claim",
    "This video has been removed",
    "ERROR: Unsupported URL",
    "is not a valid URL",
    "Unable to extract video data",
    "Requested format is not available",
    "HTTP Error 403",
    "HTTP Error 404",
    "Sign in to view this video",
];

fn is_fatal_ytdlp_error(error_msg: &str) -> bool {
    FATAL_ERROR_PATTERNS
        .iter()
        .any(|pattern| error_msg.contains(pattern))
}

/// Errors from the extraction backend
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The executable could not be started
    #[error("failed to run {binary}: {source}")]
    Spawn {
        /// Executable that was invoked
        binary: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// The media is private, removed, region-locked or the URL is unsupported
    #[error("media unavailable: {0}")]
    Unavailable(String),
    /// Any other non-zero exit
    #[error("yt-dlp exited with {status}: {message}")]
    Failed {
        /// Exit status as reported by the OS
        status: String,
        /// stderr (or stdout when stderr is empty)
        message: String,
    },
    /// stdout was not the expected JSON document
    #[error("invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl ExtractError {
    /// Classify a failed run by its error output.
    #[must_use]
    pub fn from_output(status: String, message: &str) -> Self {
        let message = message.trim().to_string();
        if is_fatal_ytdlp_error(&message) {
            Self::Unavailable(message)
        } else {
            Self::Failed { status, message }
        }
    }
}

/// The subset of yt-dlp's info dictionary we read
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractedInfo {
    /// Extractor-specific media id
    pub id: Option<String>,
    /// Media title
    pub title: Option<String>,
    /// Name of the yt-dlp extractor that handled the URL
    pub extractor: Option<String>,
    /// File extension of the selected format
    pub ext: Option<String>,
    /// Direct URL of the selected format
    pub url: Option<String>,
}

impl ExtractedInfo {
    /// The directly playable URL, if the selected format has one.
    #[must_use]
    pub fn playable_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Generic media extraction capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Fetch metadata for `url` without downloading any media.
    async fn extract_info(&self, url: &str) -> Result<ExtractedInfo, ExtractError>;
}

/// [`MediaExtractor`] backed by the yt-dlp command line tool
#[derive(Debug, Clone)]
pub struct YtDlpCli {
    binary: String,
}

impl YtDlpCli {
    /// Use the given executable (a bare name is looked up in `PATH`).
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Executable this extractor runs
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }
}

#[async_trait]
impl MediaExtractor for YtDlpCli {
    async fn extract_info(&self, url: &str) -> Result<ExtractedInfo, ExtractError> {
        debug!(binary = %self.binary, url = %url, "Executing yt-dlp");

        let output = Command::new(&self.binary)
            .args(YTDLP_ARGS)
            .arg("--")
            .arg(url)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExtractError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout).into_owned()
            } else {
                stderr.into_owned()
            };
            return Err(ExtractError::from_output(
                output.status.to_string(),
                &message,
            ));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

/// Resolver that hands the link to a [`MediaExtractor`] and relays the one
/// direct URL it selects. Serves YouTube and Facebook.
pub struct ExtractorResolver {
    platform: Platform,
    extractor: Arc<dyn MediaExtractor>,
}

impl ExtractorResolver {
    /// Create a resolver for `platform`
    #[must_use]
    pub fn new(platform: Platform, extractor: Arc<dyn MediaExtractor>) -> Self {
        Self {
            platform,
            extractor,
        }
    }

    async fn try_resolve(&self, link: &str) -> Result<Vec<MediaItem>, ResolveError> {
        let info = self.extractor.extract_info(link).await?;
        let url = info.playable_url().ok_or(ResolveError::NoMedia)?;
        Ok(vec![MediaItem::new(url)])
    }
}

#[async_trait]
impl MediaResolver for ExtractorResolver {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn resolve(&self, link: &str) -> Resolution {
        Resolution::from_result(self.platform, link, self.try_resolve(link).await)
    }
}
