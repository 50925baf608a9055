//! Dispatch pipeline
//!
//! One inbound message runs the whole sequence independently:
//! extract links, then for each link in order classify, notify, resolve and
//! deliver. Nothing is kept between messages.

use crate::links::extract_links;
use crate::media::{MediaItem, MediaKind};
use crate::platform::Platform;
use crate::resolver::{Resolution, ResolveError, ResolverRegistry};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Static reply to the greeting/help command.
pub const GREETING: &str = "Send a YouTube, Instagram, or Facebook link.";

/// One instruction for the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Resolution of a link has started
    Progress {
        /// Detected platform
        platform: Platform,
    },
    /// Send a media URL as a video
    Video {
        /// Direct media URL
        url: String,
    },
    /// Send a media URL as a photo
    Photo {
        /// Direct media URL
        url: String,
    },
    /// Nothing could be resolved; the user gets the original link back
    ResolveFailed {
        /// Detected platform
        platform: Platform,
        /// Original link
        link: String,
    },
    /// A media send failed; the user gets the media URL as text
    SendFailed {
        /// Direct media URL
        media_url: String,
    },
}

impl Outbound {
    /// Video or photo send for a resolved item.
    #[must_use]
    pub fn for_media(item: &MediaItem) -> Self {
        match item.kind {
            MediaKind::Video => Self::Video {
                url: item.url.clone(),
            },
            MediaKind::Photo => Self::Photo {
                url: item.url.clone(),
            },
        }
    }

    /// Message text for text notifications; `None` for media sends.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Progress { platform } => Some(format!("🔍 Fetching media from {platform}...")),
            Self::ResolveFailed { platform, link } => Some(format!(
                "❌ Could not fetch media from {}.\nTry manually: {link}",
                platform.title()
            )),
            Self::SendFailed { media_url } => Some(format!(
                "⚠️ Failed to send media. Try manually:\n{media_url}"
            )),
            Self::Video { .. } | Self::Photo { .. } => None,
        }
    }

    /// Whether this is a video or photo send
    #[must_use]
    pub const fn is_media(&self) -> bool {
        matches!(self, Self::Video { .. } | Self::Photo { .. })
    }
}

/// Errors at the transport boundary
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The media URL could not be handed to the transport
    #[error("invalid media URL {url}: {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Parser message
        reason: String,
    },
    /// The transport rejected or failed the request
    #[error("transport error: {0}")]
    Transport(String),
}

/// Chat transport the pipeline replies through
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Deliver one instruction to the originating chat.
    async fn deliver(&self, outbound: &Outbound) -> Result<(), GatewayError>;
}

/// Link dispatch and media resolution pipeline
pub struct DispatchPipeline {
    resolvers: ResolverRegistry,
}

impl DispatchPipeline {
    /// Create a pipeline over the given resolvers
    #[must_use]
    pub const fn new(resolvers: ResolverRegistry) -> Self {
        Self { resolvers }
    }

    /// Registered resolvers
    #[must_use]
    pub const fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    /// Resolve one link. Unknown links never reach a resolver.
    pub async fn resolve(&self, platform: Platform, link: &str) -> Resolution {
        if platform == Platform::Unknown {
            debug!(url = %link, "Skipping resolution for unknown platform");
            return Resolution::Unresolved(ResolveError::Unsupported(platform));
        }
        match self.resolvers.get(platform) {
            Some(resolver) => resolver.resolve(link).await,
            None => {
                warn!(%platform, url = %link, "No resolver registered");
                Resolution::Unresolved(ResolveError::Unsupported(platform))
            }
        }
    }

    /// Process one inbound message and reply through `gateway`.
    ///
    /// Returns every instruction handed to the gateway, in order, including
    /// fallbacks for failed media sends. Failures never abort the remaining
    /// items or links.
    pub async fn handle_message(&self, text: &str, gateway: &dyn ChatGateway) -> Vec<Outbound> {
        let links = extract_links(text);
        let mut emitted = Vec::new();
        if links.is_empty() {
            debug!("Message contains no links");
            return emitted;
        }

        info!(count = links.len(), "Dispatching links");
        for link in links {
            self.dispatch_link(link, gateway, &mut emitted).await;
        }
        emitted
    }

    async fn dispatch_link(
        &self,
        link: &str,
        gateway: &dyn ChatGateway,
        emitted: &mut Vec<Outbound>,
    ) {
        let platform = Platform::classify(link);
        info!(%platform, url = %link, "Fetching media");
        notify(gateway, Outbound::Progress { platform }, emitted).await;

        let resolution = self.resolve(platform, link).await;
        if !resolution.is_resolved() {
            notify(
                gateway,
                Outbound::ResolveFailed {
                    platform,
                    link: link.to_string(),
                },
                emitted,
            )
            .await;
            return;
        }

        for item in resolution.items() {
            let outbound = Outbound::for_media(item);
            let result = gateway.deliver(&outbound).await;
            emitted.push(outbound);

            if let Err(e) = result {
                warn!(%platform, url = %item.url, error = %e, "Failed to send media");
                notify(
                    gateway,
                    Outbound::SendFailed {
                        media_url: item.url.clone(),
                    },
                    emitted,
                )
                .await;
            }
        }
    }
}

/// Deliver a text notification; failures are logged and otherwise ignored.
async fn notify(gateway: &dyn ChatGateway, outbound: Outbound, emitted: &mut Vec<Outbound>) {
    if let Err(e) = gateway.deliver(&outbound).await {
        warn!(error = %e, ?outbound, "Failed to send notification");
    }
    emitted.push(outbound);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MockMediaResolver;
    use std::sync::Arc;

    fn resolver_returning(platform: Platform, urls: &'static [&'static str]) -> MockMediaResolver {
        let mut resolver = MockMediaResolver::new();
        resolver.expect_platform().return_const(platform);
        resolver.expect_resolve().returning(move |_| {
            Resolution::Resolved(urls.iter().map(|u| MediaItem::new(*u)).collect())
        });
        resolver
    }

    #[test]
    fn test_notification_texts() {
        insta::assert_snapshot!(
            Outbound::Progress { platform: Platform::YouTube }.text().unwrap_or_default(),
            @"🔍 Fetching media from youtube..."
        );
        insta::assert_snapshot!(
            Outbound::ResolveFailed {
                platform: Platform::YouTube,
                link: "https://youtu.be/abc123".to_string(),
            }
            .text()
            .unwrap_or_default(),
            @r"
        ❌ Could not fetch media from Youtube.
        Try manually: https://youtu.be/abc123
        "
        );
        insta::assert_snapshot!(
            Outbound::SendFailed { media_url: "https://cdn.example.com/a.jpg".to_string() }
                .text()
                .unwrap_or_default(),
            @r"
        ⚠️ Failed to send media. Try manually:
        https://cdn.example.com/a.jpg
        "
        );
        assert_eq!(Outbound::Video { url: "u".into() }.text(), None);
    }

    #[tokio::test]
    async fn test_no_links_sends_nothing() {
        let mut gateway = MockChatGateway::new();
        gateway.expect_deliver().times(0);

        let pipeline = DispatchPipeline::new(ResolverRegistry::new());
        let emitted = pipeline.handle_message("hello there", &gateway).await;
        assert!(emitted.is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_platform_falls_back() {
        let mut gateway = MockChatGateway::new();
        gateway.expect_deliver().times(2).returning(|_| Ok(()));

        let pipeline = DispatchPipeline::new(ResolverRegistry::new());
        let emitted = pipeline
            .handle_message("https://facebook.com/watch/?v=1", &gateway)
            .await;
        assert_eq!(
            emitted,
            vec![
                Outbound::Progress {
                    platform: Platform::Facebook
                },
                Outbound::ResolveFailed {
                    platform: Platform::Facebook,
                    link: "https://facebook.com/watch/?v=1".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_media_kind_decides_send() {
        let mut gateway = MockChatGateway::new();
        gateway.expect_deliver().returning(|_| Ok(()));

        let registry = ResolverRegistry::new().with(Arc::new(resolver_returning(
            Platform::Instagram,
            &["https://scontent.cdninstagram.com/v/photo.jpg"],
        )));
        let pipeline = DispatchPipeline::new(registry);
        let emitted = pipeline
            .handle_message("https://instagram.com/p/XYZ/", &gateway)
            .await;
        assert_eq!(
            emitted[1],
            Outbound::Photo {
                url: "https://scontent.cdninstagram.com/v/photo.jpg".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_send_failure_does_not_abort() {
        let mut gateway = MockChatGateway::new();
        gateway.expect_deliver().returning(|outbound| match outbound {
            Outbound::Video { url } if url.contains("first") => {
                Err(GatewayError::Transport("Bad Request: failed to get HTTP URL content".into()))
            }
            _ => Ok(()),
        });

        let registry = ResolverRegistry::new().with(Arc::new(resolver_returning(
            Platform::YouTube,
            &["https://a.example/first.mp4", "https://a.example/second.mp4"],
        )));
        let pipeline = DispatchPipeline::new(registry);
        let emitted = pipeline
            .handle_message("https://youtu.be/abc https://youtu.be/abc", &gateway)
            .await;

        let fallbacks = emitted
            .iter()
            .filter(|o| matches!(o, Outbound::SendFailed { .. }))
            .count();
        let media = emitted.iter().filter(|o| o.is_media()).count();
        assert_eq!(fallbacks, 2);
        assert_eq!(media, 4);
        assert_eq!(
            emitted[2],
            Outbound::SendFailed {
                media_url: "https://a.example/first.mp4".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_notification_failure_is_ignored() {
        let mut gateway = MockChatGateway::new();
        gateway
            .expect_deliver()
            .returning(|_| Err(GatewayError::Transport("chat not found".into())));

        let pipeline = DispatchPipeline::new(ResolverRegistry::new());
        let emitted = pipeline
            .handle_message("https://example.com/a https://example.com/b", &gateway)
            .await;
        assert_eq!(emitted.len(), 4);
    }
}
