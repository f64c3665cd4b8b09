use std::sync::Arc;

use {
    clap::Parser,
    tracing::info,
    tracing_subscriber::EnvFilter,
};

use {
    opsdesk_replies::ReplyIndex,
    opsdesk_routing::{Delivery, RoutingEngine},
    opsdesk_sessions::SessionStore,
    opsdesk_telegram::{BotContext, TelegramDelivery, bot},
};

#[derive(Parser)]
#[command(name = "opsdesk", about = "opsdesk support-desk relay bot")]
struct Cli {
    /// Config file path (overrides discovery of opsdesk.{toml,yaml,yml,json}).
    #[arg(long, env = "OPSDESK_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = match &cli.config {
        Some(path) => opsdesk_config::load_config(path)?,
        None => opsdesk_config::discover_and_load()?,
    };
    // Missing required configuration is fatal: never connect half-set-up.
    config.validate()?;
    let config = Arc::new(config);

    let telegram_bot = bot::build_bot(&config)?;
    let delivery = Arc::new(TelegramDelivery::new(telegram_bot.clone(), Arc::clone(&config)));
    let engine = Arc::new(RoutingEngine::new(
        Arc::clone(&config),
        Arc::new(SessionStore::new()),
        Arc::new(ReplyIndex::new()),
        Arc::clone(&delivery) as Arc<dyn Delivery>,
    ));

    let ctx = BotContext {
        config: Arc::clone(&config),
        engine,
        delivery,
    };
    let cancel = bot::start_polling(telegram_bot, ctx).await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            cancel.cancel();
        },
        _ = cancel.cancelled() => {
            // Polling loop gave up on its own (e.g. token conflict).
        },
    }

    info!("opsdesk stopped");
    Ok(())
}
