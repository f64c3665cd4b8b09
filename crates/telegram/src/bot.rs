use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use opsdesk_config::OpsdeskConfig;

use crate::{handlers, state::BotContext};

/// Build the bot with a client timeout longer than the long-polling timeout
/// (30s) so the HTTP client doesn't abort the request before Telegram
/// responds.
pub fn build_bot(config: &OpsdeskConfig) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(std::time::Duration::from_secs(45))
        .build()?;
    Ok(Bot::with_client(
        config.telegram.token.expose_secret(),
        client,
    ))
}

/// Start polling for updates.
///
/// Spawns a background task that processes updates until the returned
/// `CancellationToken` is cancelled.
pub async fn start_polling(bot: Bot, ctx: BotContext) -> anyhow::Result<CancellationToken> {
    // Verify credentials and get the bot username.
    let me = bot.get_me().await?;

    // Delete any existing webhook so long polling works.
    bot.delete_webhook().send().await?;

    // Register slash commands for autocomplete in Telegram clients.
    let commands = vec![
        BotCommand::new("start", "Show the category menu"),
        BotCommand::new("help", "Show help"),
        BotCommand::new("dialogs", "List active dialogs (operators)"),
        BotCommand::new("cancel", "Cancel the current request"),
        BotCommand::new("end", "End a dialog"),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(
        username = ?me.username,
        operators = ctx.config.operators.len(),
        "telegram bot connected (webhook cleared)"
    );

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            if cancel_clone.is_cancelled() {
                info!("telegram polling stopped");
                break;
            }

            let result = bot
                .get_updates()
                .offset(offset)
                .timeout(30)
                .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery])
                .await;

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        match update.kind {
                            UpdateKind::Message(msg) => {
                                if let Err(e) = handlers::handle_message(msg, &ctx).await {
                                    error!(error = %e, "error handling telegram message");
                                }
                            },
                            UpdateKind::CallbackQuery(query) => {
                                if let Err(e) =
                                    handlers::handle_callback_query(query, &bot, &ctx).await
                                {
                                    error!(error = %e, "error handling telegram callback query");
                                }
                            },
                            other => {
                                debug!("ignoring non-message update: {other:?}");
                            },
                        }
                    }
                },
                Err(e) => {
                    // Another instance running with the same token means this
                    // one can never receive updates.
                    let is_conflict =
                        matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates));
                    if is_conflict {
                        error!(
                            "telegram polling stopped: another instance is already running with this token"
                        );
                        cancel_clone.cancel();
                        break;
                    }

                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                },
            }
        }
    });

    Ok(cancel)
}
