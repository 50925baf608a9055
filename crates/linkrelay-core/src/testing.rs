//! Test doubles for the dispatch pipeline.
//!
//! Hand-written stand-ins for resolvers and the chat transport, usable from
//! integration tests and downstream crates.

use crate::dispatch::{ChatGateway, GatewayError, Outbound};
use crate::media::MediaItem;
use crate::platform::Platform;
use crate::resolver::{MediaResolver, Resolution, ResolveError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Resolver that always answers the same way and counts its calls.
pub struct StaticResolver {
    platform: Platform,
    urls: Option<Vec<String>>,
    calls: AtomicUsize,
}

impl StaticResolver {
    /// Always resolve to `urls`.
    #[must_use]
    pub fn resolving(platform: Platform, urls: &[&str]) -> Self {
        Self {
            platform,
            urls: Some(urls.iter().map(ToString::to_string).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fail with [`ResolveError::NoMedia`].
    #[must_use]
    pub const fn failing(platform: Platform) -> Self {
        Self {
            platform,
            urls: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `resolve` calls so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaResolver for StaticResolver {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn resolve(&self, link: &str) -> Resolution {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self.urls.as_ref().map_or(Err(ResolveError::NoMedia), |urls| {
            Ok(urls.iter().map(MediaItem::new).collect())
        });
        Resolution::from_result(self.platform, link, result)
    }
}

/// Gateway that records every delivery and can be told to fail media sends.
#[derive(Default)]
pub struct RecordingGateway {
    delivered: Mutex<Vec<Outbound>>,
    fail_media: bool,
}

impl RecordingGateway {
    /// Gateway where every delivery succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway where every video/photo send fails
    #[must_use]
    pub fn failing_media() -> Self {
        Self {
            fail_media: true,
            ..Self::default()
        }
    }

    /// Everything delivered (or attempted) so far, in order
    #[must_use]
    pub fn delivered(&self) -> Vec<Outbound> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Text of every text notification, in order
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.delivered().iter().filter_map(Outbound::text).collect()
    }
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    async fn deliver(&self, outbound: &Outbound) -> Result<(), GatewayError> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outbound.clone());
        if self.fail_media && outbound.is_media() {
            return Err(GatewayError::Transport(
                "Bad Request: wrong file identifier/HTTP URL specified".to_string(),
            ));
        }
        Ok(())
    }
}
