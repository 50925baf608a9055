use crate::bot::handlers::{self, is_link_message, Command};
use crate::config::BotSettings;
use anyhow::Result;
use linkrelay_core::dispatch::DispatchPipeline;
use linkrelay_core::platform::Platform;
use linkrelay_core::resolver::instagram::InstagramWebClient;
use linkrelay_core::resolver::{
    ExtractorResolver, InstagramResolver, MediaExtractor, ResolverRegistry, YtDlpCli,
};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{error, info};

/// Run the Telegram transport runtime.
///
/// # Errors
///
/// Returns an error if the token is missing or the resolvers cannot be built.
pub async fn run_bot(settings: Arc<BotSettings>) -> Result<()> {
    let pipeline = Arc::new(build_pipeline(&settings)?);
    info!(
        resolvers = pipeline.resolvers().len(),
        ytdlp = %settings.relay.ytdlp_path,
        "Dispatch pipeline initialized."
    );

    let bot = Bot::new(settings.telegram.token()?);
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![pipeline, settings])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Wire the production resolvers: yt-dlp for YouTube and Facebook, the web
/// client for Instagram.
///
/// # Errors
///
/// Returns an error if Instagram credentials are missing or the HTTP client
/// cannot be built.
pub fn build_pipeline(settings: &BotSettings) -> Result<DispatchPipeline> {
    let credentials = settings.relay.instagram_credentials()?;
    let extractor: Arc<dyn MediaExtractor> =
        Arc::new(YtDlpCli::new(settings.relay.ytdlp_path.clone()));
    let instagram = Arc::new(InstagramWebClient::new()?);

    let registry = ResolverRegistry::new()
        .with(Arc::new(ExtractorResolver::new(
            Platform::YouTube,
            extractor.clone(),
        )))
        .with(Arc::new(ExtractorResolver::new(
            Platform::Facebook,
            extractor,
        )))
        .with(Arc::new(InstagramResolver::new(instagram, credentials)));

    Ok(DispatchPipeline::new(registry))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::filter(|msg: Message| is_link_message(&msg)).endpoint(handle_text))
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start | Command::Help => handlers::start(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    pipeline: Arc<DispatchPipeline>,
) -> Result<(), teloxide::RequestError> {
    Box::pin(handlers::handle_text(bot, msg, pipeline)).await;
    respond(())
}
