use std::sync::Arc;

use order_bot::bot::Bot;
use order_bot::channels::{Channel, CliChannel, TelegramChannel};
use order_bot::config::BotConfig;
use order_bot::engine::FormEngine;
use order_bot::export::FileSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut config = BotConfig::from_env()?;
    let engine = Arc::new(FormEngine::with_builtin_forms()?);

    eprintln!("🤖 Order Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Orders: {}", config.orders_dir.display());
    eprintln!("   Images: {}", config.images_dir.display());
    match config.session_idle_timeout {
        Some(idle) => eprintln!("   Session idle timeout: {} min", idle.as_secs() / 60),
        None => eprintln!("   Session idle timeout: off"),
    }

    let file_sink = Arc::new(FileSink::new(config.orders_dir.clone()));

    let bot = match config.telegram_token.take() {
        Some(token) => {
            let telegram = Arc::new(TelegramChannel::new(token, config.allowed_users.clone()));
            telegram.health_check().await?;
            eprintln!("   Channel: Telegram");

            let bot = Bot::new(Arc::clone(&engine), telegram.clone(), &config).with_sink(file_sink);
            match &config.operator_chat_id {
                Some(operator) => {
                    eprintln!("   Operator chat: {operator}");
                    bot.with_sink(telegram)
                }
                None => {
                    tracing::warn!(
                        "ORDER_BOT_OPERATOR_CHAT_ID not set, orders are only written to files"
                    );
                    bot
                }
            }
        }
        None => {
            eprintln!("   Channel: CLI (set TELEGRAM_BOT_TOKEN for Telegram)");
            eprintln!("   Commands: /start /calculate /order /links /cancel");
            eprintln!("   Press an inline button with /toggle <id>.\n");
            Bot::new(engine, Arc::new(CliChannel::new()), &config).with_sink(file_sink)
        }
    };

    Arc::new(bot).run().await?;
    Ok(())
}
