//! Media resolvers
//!
//! Every platform resolver shares one contract: a link goes in and a
//! [`Resolution`] comes out. Failures are values, never errors or panics, so
//! the dispatch loop needs no platform-specific error handling.

/// Instagram post resolver.
pub mod instagram;
/// yt-dlp backed resolver for YouTube and Facebook.
pub mod ytdlp;

use crate::media::MediaItem;
use crate::platform::Platform;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub use instagram::{InstagramApi, InstagramError, InstagramPost, InstagramResolver};
pub use ytdlp::{ExtractError, ExtractedInfo, ExtractorResolver, MediaExtractor, YtDlpCli};

/// Why a link produced no media
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No resolver handles this platform
    #[error("no resolver for platform {0}")]
    Unsupported(Platform),
    /// The extraction backend failed
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
    /// Login or post lookup failed
    #[error("Instagram: {0}")]
    Instagram(#[from] InstagramError),
    /// The link carries no post/reel/tv shortcode
    #[error("no post shortcode in link")]
    MissingShortcode,
    /// The backend answered but returned nothing playable
    #[error("no playable media URL")]
    NoMedia,
}

/// Outcome of resolving one link.
#[derive(Debug)]
pub enum Resolution {
    /// At least one media item was found
    Resolved(Vec<MediaItem>),
    /// Nothing usable; carries the reason for logging
    Unresolved(ResolveError),
}

impl Resolution {
    /// Convert a fallible resolution into a `Resolution`, logging failures
    /// with the platform and link. An empty success counts as a failure.
    #[must_use]
    pub fn from_result(
        platform: Platform,
        link: &str,
        result: Result<Vec<MediaItem>, ResolveError>,
    ) -> Self {
        match result {
            Ok(items) if !items.is_empty() => {
                debug!(%platform, url = %link, count = items.len(), "Link resolved");
                Self::Resolved(items)
            }
            Ok(_) => {
                warn!(%platform, url = %link, "Resolver returned no media");
                Self::Unresolved(ResolveError::NoMedia)
            }
            Err(e) => {
                warn!(%platform, url = %link, error = %e, "Failed to resolve link");
                Self::Unresolved(e)
            }
        }
    }

    /// Resolved items; empty when unresolved.
    #[must_use]
    pub fn items(&self) -> &[MediaItem] {
        match self {
            Self::Resolved(items) => items,
            Self::Unresolved(_) => &[],
        }
    }

    /// Whether any media was found.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.items().is_empty()
    }
}

/// Turns a link of one platform into media items.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Platform this resolver serves
    fn platform(&self) -> Platform;

    /// Resolve `link`. Must not panic; failures become
    /// [`Resolution::Unresolved`].
    async fn resolve(&self, link: &str) -> Resolution;
}

/// Resolvers keyed by platform.
#[derive(Default, Clone)]
pub struct ResolverRegistry {
    resolvers: HashMap<Platform, Arc<dyn MediaResolver>>,
}

impl ResolverRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver under its own platform, replacing any previous one.
    pub fn register(&mut self, resolver: Arc<dyn MediaResolver>) {
        let platform = resolver.platform();
        if self.resolvers.insert(platform, resolver).is_some() {
            debug!(%platform, "Replaced registered resolver");
        }
    }

    /// Builder form of [`Self::register`].
    #[must_use]
    pub fn with(mut self, resolver: Arc<dyn MediaResolver>) -> Self {
        self.register(resolver);
        self
    }

    /// Resolver for `platform`, if any.
    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<&Arc<dyn MediaResolver>> {
        self.resolvers.get(&platform)
    }

    /// Number of registered resolvers
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Whether no resolver is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}
