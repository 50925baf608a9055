//! Resolved media items.
//!
//! The video/photo decision is a heuristic on the URL text alone: no request
//! is made to learn the real content type.

use serde::{Deserialize, Serialize};

/// URL suffix treated as video.
const VIDEO_SUFFIX: &str = ".mp4";

/// Hosts that only serve video streams.
const VIDEO_HOST_HINTS: &[&str] = &["googlevideo.com"];

/// How a media URL should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Send as a video
    Video,
    /// Send as a photo
    Photo,
}

impl MediaKind {
    /// Infer the kind from the URL: a literal `.mp4` suffix or a streaming CDN
    /// host means video, anything else is a photo.
    #[must_use]
    pub fn infer(url: &str) -> Self {
        if url.ends_with(VIDEO_SUFFIX) || VIDEO_HOST_HINTS.iter().any(|host| url.contains(host)) {
            Self::Video
        } else {
            Self::Photo
        }
    }
}

/// A direct media URL with its inferred delivery kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Direct media URL
    pub url: String,
    /// Inferred kind
    pub kind: MediaKind,
}

impl MediaItem {
    /// Wrap a resolved URL, inferring its kind.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let kind = MediaKind::infer(&url);
        Self { url, kind }
    }

    /// Whether the item will be sent as a video.
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mp4_suffix_is_video() {
        assert_eq!(
            MediaKind::infer("https://cdn.example.com/clip.mp4"),
            MediaKind::Video
        );
    }

    #[test]
    fn test_streaming_host_is_video() {
        let url = "https://rr3---sn-abc.googlevideo.com/videoplayback?expire=1&itag=18";
        assert!(MediaItem::new(url).is_video());
    }

    #[test]
    fn test_everything_else_is_photo() {
        assert_eq!(
            MediaKind::infer("https://scontent.cdninstagram.com/v/t51/abc.jpg"),
            MediaKind::Photo
        );
        // Query strings defeat the suffix check; the heuristic is kept as-is.
        assert_eq!(
            MediaKind::infer("https://video.xx.fbcdn.net/v/abc.mp4?efg=1"),
            MediaKind::Photo
        );
    }
}
