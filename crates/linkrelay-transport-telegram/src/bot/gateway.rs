//! Delivery of pipeline instructions into a Telegram chat.

use async_trait::async_trait;
use linkrelay_core::dispatch::{ChatGateway, GatewayError, Outbound};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile};
use tracing::debug;
use url::Url;

/// Replies into the chat a message came from.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramGateway {
    /// Gateway for one chat
    #[must_use]
    pub const fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }

    async fn send_text(&self, text: String) -> Result<(), GatewayError> {
        self.bot
            .send_message(self.chat_id, text)
            .await
            .map(|_| ())
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }
}

/// Telegram fetches the media itself from a URL input file.
///
/// # Errors
///
/// Returns `GatewayError::InvalidUrl` if `url` does not parse.
pub fn media_input(url: &str) -> Result<InputFile, GatewayError> {
    Url::parse(url)
        .map(InputFile::url)
        .map_err(|e| GatewayError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn deliver(&self, outbound: &Outbound) -> Result<(), GatewayError> {
        match outbound {
            Outbound::Video { url } => {
                debug!(chat_id = %self.chat_id, url = %url, "Sending video");
                self.bot
                    .send_video(self.chat_id, media_input(url)?)
                    .await
                    .map(|_| ())
                    .map_err(|e| GatewayError::Transport(e.to_string()))
            }
            Outbound::Photo { url } => {
                debug!(chat_id = %self.chat_id, url = %url, "Sending photo");
                self.bot
                    .send_photo(self.chat_id, media_input(url)?)
                    .await
                    .map(|_| ())
                    .map_err(|e| GatewayError::Transport(e.to_string()))
            }
            Outbound::Progress { .. }
            | Outbound::ResolveFailed { .. }
            | Outbound::SendFailed { .. } => match outbound.text() {
                Some(text) => self.send_text(text).await,
                None => Ok(()),
            },
        }
    }
}
