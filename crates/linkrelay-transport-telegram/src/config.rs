//! Telegram transport settings.

use config::ConfigError;
use linkrelay_core::config::{build_config, require, RelaySettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Telegram transport settings loaded from environment variables.
#[derive(Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token (`BOT_TOKEN`).
    pub bot_token: Option<String>,
}

impl fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[TELEGRAM_TOKEN]"))
            .finish()
    }
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the token is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = build_config()?.try_deserialize()?;
        settings.token()?;
        Ok(settings)
    }

    /// The bot token, validated as non-empty.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if `BOT_TOKEN` is unset or blank.
    pub fn token(&self) -> Result<String, ConfigError> {
        require(self.bot_token.as_deref(), "BOT_TOKEN")
    }
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone, Debug)]
pub struct BotSettings {
    /// Resolver settings shared across handlers.
    pub relay: Arc<RelaySettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(relay: RelaySettings, telegram: TelegramSettings) -> Self {
        Self {
            relay: Arc::new(relay),
            telegram: Arc::new(telegram),
        }
    }
}
