//! Instagram resolver
//!
//! Posts are looked up by shortcode through an authenticated session. The
//! session is established on first use and shared by every lookup until
//! Instagram rejects it, after which the next link logs in again.

/// Web API client.
pub mod web;

use super::{MediaResolver, Resolution, ResolveError};
use crate::config::InstagramCredentials;
use crate::media::MediaItem;
use crate::platform::Platform;
use async_trait::async_trait;
use lazy_regex::lazy_regex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub use web::InstagramWebClient;

static RE_SHORTCODE: lazy_regex::Lazy<lazy_regex::Regex> =
    lazy_regex!(r"/(?:p|reel|tv)/([\w-]+)");

/// Errors from the Instagram web API
#[derive(Debug, Error)]
pub enum InstagramError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The login page did not set a CSRF cookie
    #[error("missing CSRF token")]
    MissingCsrfToken,
    /// Credentials were rejected
    #[error("login rejected: {0}")]
    LoginRejected(String),
    /// The account needs a second factor
    #[error("two-factor authentication required")]
    TwoFactorRequired,
    /// The account is held at a security checkpoint
    #[error("checkpoint required: {0}")]
    CheckpointRequired(String),
    /// No post with this shortcode is visible to the session
    #[error("post {0} not found")]
    PostNotFound(String),
    /// The post has no URL for its media type
    #[error("post {0} has no media URL")]
    MissingMedia(String),
    /// The session cookies are no longer accepted
    #[error("session expired: {0}")]
    SessionExpired(String),
    /// The response did not have the expected shape
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl InstagramError {
    /// Whether the session must be re-established before the next lookup.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}

/// A post as far as relaying is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstagramPost {
    /// Post shortcode
    pub shortcode: String,
    /// Whether the post is a video
    pub is_video: bool,
    /// Video URL, present for videos
    pub video_url: Option<String>,
    /// Image URL (the cover frame for videos)
    pub display_url: Option<String>,
}

impl InstagramPost {
    /// Video URL for videos, image URL otherwise.
    #[must_use]
    pub fn media_url(&self) -> Option<&str> {
        if self.is_video {
            self.video_url.as_deref()
        } else {
            self.display_url.as_deref()
        }
    }
}

/// Session-based access to Instagram posts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InstagramApi: Send + Sync {
    /// Authenticate the session.
    async fn login(&self, credentials: &InstagramCredentials) -> Result<(), InstagramError>;

    /// Look up a post by shortcode.
    async fn post_by_shortcode(&self, shortcode: &str) -> Result<InstagramPost, InstagramError>;
}

/// Extract the post shortcode from a `/p/`, `/reel/` or `/tv/` link.
///
/// # Examples
///
/// ```
/// use linkrelay_core::resolver::instagram::extract_shortcode;
///
/// assert_eq!(
///     extract_shortcode("https://www.instagram.com/reel/C1a-B_2/?igsh=x"),
///     Some("C1a-B_2")
/// );
/// assert_eq!(extract_shortcode("https://www.instagram.com/someone/"), None);
/// ```
#[must_use]
pub fn extract_shortcode(link: &str) -> Option<&str> {
    RE_SHORTCODE
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Resolver for Instagram posts, reels and TV links
pub struct InstagramResolver {
    api: Arc<dyn InstagramApi>,
    credentials: InstagramCredentials,
    logged_in: Mutex<bool>,
}

impl InstagramResolver {
    /// Create a resolver; no request is made until the first lookup.
    #[must_use]
    pub fn new(api: Arc<dyn InstagramApi>, credentials: InstagramCredentials) -> Self {
        Self {
            api,
            credentials,
            logged_in: Mutex::new(false),
        }
    }

    /// Log in unless a session is already up. A failed login is not
    /// remembered, so the next link tries again.
    async fn ensure_session(&self) -> Result<(), InstagramError> {
        let mut logged_in = self.logged_in.lock().await;
        if !*logged_in {
            info!(username = %self.credentials.username, "Logging in to Instagram");
            self.api.login(&self.credentials).await?;
            *logged_in = true;
        }
        Ok(())
    }

    async fn drop_session(&self) {
        *self.logged_in.lock().await = false;
    }

    async fn try_resolve(&self, link: &str) -> Result<Vec<MediaItem>, ResolveError> {
        let shortcode = extract_shortcode(link).ok_or(ResolveError::MissingShortcode)?;
        self.ensure_session().await?;

        let post = match self.api.post_by_shortcode(shortcode).await {
            Ok(post) => post,
            Err(e) => {
                if e.is_session_expired() {
                    warn!(
                        shortcode = %shortcode,
                        error = %e,
                        "Instagram session rejected, will log in again"
                    );
                    self.drop_session().await;
                }
                return Err(e.into());
            }
        };
        let url = post
            .media_url()
            .ok_or_else(|| InstagramError::MissingMedia(post.shortcode.clone()))?;
        Ok(vec![MediaItem::new(url)])
    }
}

#[async_trait]
impl MediaResolver for InstagramResolver {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn resolve(&self, link: &str) -> Resolution {
        Resolution::from_result(Platform::Instagram, link, self.try_resolve(link).await)
    }
}
