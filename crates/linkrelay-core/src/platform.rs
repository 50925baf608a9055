//! Platform detection by substring match.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Media source a link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// youtube.com / youtu.be
    YouTube,
    /// instagram.com
    Instagram,
    /// facebook.com
    Facebook,
    /// Anything else
    Unknown,
}

impl Platform {
    /// Classify a link. First match wins, in this order:
    /// YouTube, Instagram, Facebook.
    ///
    /// # Examples
    ///
    /// ```
    /// use linkrelay_core::platform::Platform;
    ///
    /// assert_eq!(Platform::classify("https://youtu.be/abc"), Platform::YouTube);
    /// assert_eq!(Platform::classify("https://example.com"), Platform::Unknown);
    /// ```
    #[must_use]
    pub fn classify(link: &str) -> Self {
        if link.contains("youtube.com") || link.contains("youtu.be") {
            Self::YouTube
        } else if link.contains("instagram.com") {
            Self::Instagram
        } else if link.contains("facebook.com") {
            Self::Facebook
        } else {
            Self::Unknown
        }
    }

    /// Lowercase tag used in progress notifications and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::Unknown => "unknown",
        }
    }

    /// Title-cased tag used in failure notifications.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::YouTube => "Youtube",
            Self::Instagram => "Instagram",
            Self::Facebook => "Facebook",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
