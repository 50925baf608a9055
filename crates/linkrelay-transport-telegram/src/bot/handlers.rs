use crate::bot::TelegramGateway;
use anyhow::Result;
use linkrelay_core::dispatch::{DispatchPipeline, GREETING};
use std::sync::Arc;
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::{debug, info};

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the greeting
    #[command(description = "Start the bot.")]
    Start,
    /// Show the greeting
    #[command(description = "Show what the bot accepts.")]
    Help,
}

/// Whether a message should go through the link pipeline.
#[must_use]
pub fn is_link_message(msg: &Message) -> bool {
    msg.text().is_some_and(|text| !text.starts_with('/'))
}

/// Start/help handler
///
/// # Errors
///
/// Returns an error if the greeting cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    info!(
        "User {} requested the greeting in chat {}.",
        get_user_id_safe(&msg),
        msg.chat.id
    );
    bot.send_message(msg.chat.id, GREETING).await?;
    Ok(())
}

/// Text handler: runs every link in the message through the pipeline.
///
/// Failures are reported to the user by the pipeline itself, so this never
/// fails.
pub async fn handle_text(bot: Bot, msg: Message, pipeline: Arc<DispatchPipeline>) {
    let Some(text) = msg.text() else {
        return;
    };

    let gateway = TelegramGateway::new(bot, msg.chat.id);
    let emitted = pipeline.handle_message(text, &gateway).await;
    debug!(
        user_id = get_user_id_safe(&msg),
        chat_id = %msg.chat.id,
        instructions = emitted.len(),
        "Message processed"
    );
}
