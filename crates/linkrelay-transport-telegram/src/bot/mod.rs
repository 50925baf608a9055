/// Outbound delivery into a Telegram chat
pub mod gateway;
/// Command and message handlers
pub mod handlers;

pub use gateway::TelegramGateway;
