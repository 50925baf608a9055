//! Configuration and settings management
//!
//! Settings are read once at startup from layered config files and the
//! process environment, then shared read-only.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default yt-dlp executable, resolved through `PATH`.
pub const DEFAULT_YTDLP_PATH: &str = "yt-dlp";

/// Build the layered configuration source shared by every settings struct.
///
/// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
/// `config/local`, `APP__*` environment variables, then plain environment
/// variables (empty values are ignored).
///
/// # Errors
///
/// Returns a `ConfigError` if a present source cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // UPPER_SNAKE_CASE is mapped to snake_case keys
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// Login credentials for the Instagram session.
#[derive(Clone, PartialEq, Eq)]
pub struct InstagramCredentials {
    /// Account username
    pub username: String,
    /// Account password
    pub password: String,
}

impl fmt::Debug for InstagramCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstagramCredentials")
            .field("username", &self.username)
            .field("password", &"[MASKED]")
            .finish()
    }
}

/// Resolver settings loaded from environment variables
#[derive(Deserialize, Serialize, Clone)]
pub struct RelaySettings {
    /// Instagram account username (`IG_USERNAME`)
    pub ig_username: Option<String>,
    /// Instagram account password (`IG_PASSWORD`)
    pub ig_password: Option<String>,
    /// Path to the yt-dlp executable (`YTDLP_PATH`)
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,
}

fn default_ytdlp_path() -> String {
    DEFAULT_YTDLP_PATH.to_string()
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            ig_username: None,
            ig_password: None,
            ytdlp_path: default_ytdlp_path(),
        }
    }
}

impl fmt::Debug for RelaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaySettings")
            .field("ig_username", &self.ig_username)
            .field("ig_password", &self.ig_password.as_ref().map(|_| "[MASKED]"))
            .field("ytdlp_path", &self.ytdlp_path)
            .finish()
    }
}

impl RelaySettings {
    /// Load settings and check that the Instagram credentials are present.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use linkrelay_core::config::RelaySettings;
    ///
    /// let settings = RelaySettings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required value is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = build_config()?.try_deserialize()?;
        settings.instagram_credentials()?;
        Ok(settings)
    }

    /// Instagram credentials, validated as non-empty.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` naming the missing variable.
    pub fn instagram_credentials(&self) -> Result<InstagramCredentials, ConfigError> {
        Ok(InstagramCredentials {
            username: require(self.ig_username.as_deref(), "IG_USERNAME")?,
            password: require(self.ig_password.as_deref(), "IG_PASSWORD")?,
        })
    }
}

/// Return the value as given, or a `NotFound` error naming `key` when it is
/// absent or whitespace only. Secrets are not trimmed.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` when the value is absent or blank.
pub fn require(value: Option<&str>, key: &str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| ConfigError::NotFound(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Single test touching the environment to avoid races between tests
    #[test]
    fn test_config_env_loading() -> Result<(), Box<dyn std::error::Error>> {
        env::set_var("IG_USERNAME", "relay_user");
        env::set_var("IG_PASSWORD", "hunter2");
        env::remove_var("YTDLP_PATH");

        let settings = RelaySettings::new()?;
        assert_eq!(settings.ig_username.as_deref(), Some("relay_user"));
        assert_eq!(settings.ytdlp_path, DEFAULT_YTDLP_PATH);

        // Empty values count as unset
        env::set_var("IG_PASSWORD", "");
        assert!(RelaySettings::new().is_err());

        env::set_var("IG_PASSWORD", "hunter2");
        env::set_var("YTDLP_PATH", "/opt/bin/yt-dlp");
        let settings = RelaySettings::new()?;
        assert_eq!(settings.ytdlp_path, "/opt/bin/yt-dlp");

        env::remove_var("IG_USERNAME");
        env::remove_var("IG_PASSWORD");
        env::remove_var("YTDLP_PATH");
        Ok(())
    }

    #[test]
    fn test_missing_credentials() {
        let settings = RelaySettings {
            ig_username: Some("user".to_string()),
            ig_password: Some("   ".to_string()),
            ..RelaySettings::default()
        };
        match settings.instagram_credentials() {
            Err(ConfigError::NotFound(key)) => assert_eq!(key, "IG_PASSWORD"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_password_is_not_trimmed() -> Result<(), ConfigError> {
        let settings = RelaySettings {
            ig_username: Some("user".to_string()),
            ig_password: Some(" pass ".to_string()),
            ..RelaySettings::default()
        };
        let creds = settings.instagram_credentials()?;
        assert_eq!(creds.password, " pass ");
        assert_eq!(require(Some("tok"), "BOT_TOKEN")?, "tok");
        Ok(())
    }

    #[test]
    fn test_debug_masks_password() {
        let settings = RelaySettings {
            ig_username: Some("user".to_string()),
            ig_password: Some("hunter2".to_string()),
            ..RelaySettings::default()
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[MASKED]"));

        let creds = settings
            .instagram_credentials()
            .expect("credentials are present");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
