use {
    teloxide::{
        prelude::*,
        types::{ChatKind, Message, User},
    },
    tracing::debug,
};

use {
    opsdesk_common::{DeliveredMessageId, OperatorId, UserId, UserProfile},
    opsdesk_routing::{InboundEvent, Initiator, render},
};

use crate::state::BotContext;

const USER_HELP: &str = "🤖 How to use this bot\n\n\
    Commands:\n\
    /start - show the category menu\n\
    /help - show this help\n\n\
    1. Pick a category\n\
    2. Write your message\n\
    3. It goes to the operators; the first one to reply takes your dialog";

const OPERATOR_HELP: &str = "🤖 Operator help\n\n\
    Commands:\n\
    /start - show the category menu\n\
    /help - show this help\n\
    /dialogs - list active dialogs\n\
    /end - end a dialog (send as a reply to a forwarded message)\n\n\
    Reply to a forwarded message to claim its dialog; only the first\n\
    operator to reply holds it, the rest are notified.";

const END_USAGE: &str = "Send /end as a reply to one of the user's forwarded messages.";

/// Slash commands recognized in private chats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    Dialogs,
    Cancel,
    End,
}

/// Parse a leading slash command, tolerating the `@botname` suffix Telegram
/// appends in some clients.
fn parse_command(text: &str) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?.split('@').next()?;
    match name {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        "dialogs" => Some(Command::Dialogs),
        "cancel" => Some(Command::Cancel),
        "end" => Some(Command::End),
        _ => None,
    }
}

fn sender_profile(user: &User) -> UserProfile {
    let last = user.last_name.as_deref().unwrap_or("");
    let name = format!("{} {last}", user.first_name).trim().to_string();
    UserProfile::new(name, user.username.clone())
}

/// Handle a single inbound Telegram message.
pub async fn handle_message(msg: Message, ctx: &BotContext) -> anyhow::Result<()> {
    // Group chats get no automated handling at all.
    if !matches!(msg.chat.kind, ChatKind::Private(_)) {
        debug!(chat_id = msg.chat.id.0, "ignoring non-private message");
        return Ok(());
    }
    let Some(from) = msg.from.clone() else {
        return Ok(());
    };
    let Some(text) = msg.text().map(str::to_owned) else {
        debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    let sender_id = from.id.0 as i64;
    let is_operator = ctx.config.is_operator(sender_id);

    if let Some(command) = parse_command(&text) {
        return handle_command(command, &msg, &from, ctx).await;
    }

    if is_operator {
        // An operator's plain text routes only when it answers a forwarded
        // copy; anything else is small talk between colleagues.
        let Some(replied) = msg.reply_to_message() else {
            debug!(operator = sender_id, "ignoring operator message without reply target");
            return Ok(());
        };
        let event = InboundEvent::OperatorReply {
            operator: OperatorId(sender_id),
            replied_to: DeliveredMessageId(i64::from(replied.id.0)),
            text,
        };
        ctx.engine.handle(event).await?;
        return Ok(());
    }

    ctx.engine
        .handle(InboundEvent::TextSubmitted {
            user: UserId(sender_id),
            message_id: i64::from(msg.id.0),
            text,
            profile: sender_profile(&from),
        })
        .await?;
    Ok(())
}

async fn handle_command(
    command: Command,
    msg: &Message,
    from: &User,
    ctx: &BotContext,
) -> anyhow::Result<()> {
    use opsdesk_routing::Delivery;

    let sender_id = from.id.0 as i64;
    let recipient = opsdesk_common::RecipientId(sender_id);

    match command {
        Command::Start => {
            ctx.delivery.render_menu(recipient).await?;
        },
        Command::Help => {
            let help = if ctx.config.is_operator(sender_id) {
                OPERATOR_HELP
            } else {
                USER_HELP
            };
            ctx.delivery.deliver(recipient, help, None).await?;
        },
        Command::Dialogs => {
            // Operator-only; silently ignored for everyone else.
            if !ctx.config.is_operator(sender_id) {
                return Ok(());
            }
            let listing = render::dialogs_list(
                &ctx.engine.active_conversations(),
                OperatorId(sender_id),
                |id| ctx.config.category_label(id).to_string(),
            );
            ctx.delivery.deliver(recipient, &listing, None).await?;
        },
        Command::Cancel => {
            ctx.engine
                .handle(InboundEvent::Cancel {
                    user: UserId(sender_id),
                })
                .await?;
        },
        Command::End => {
            if ctx.config.is_operator(sender_id) {
                // Operators end a specific dialog by replying /end to one of
                // its forwarded copies.
                let target = msg
                    .reply_to_message()
                    .and_then(|r| ctx.engine.reply_target(DeliveredMessageId(i64::from(r.id.0))));
                let Some(user) = target else {
                    ctx.delivery.deliver(recipient, END_USAGE, None).await?;
                    return Ok(());
                };
                ctx.engine
                    .handle(InboundEvent::EndDialogRequested {
                        user,
                        initiator: Initiator::Operator(OperatorId(sender_id)),
                    })
                    .await?;
            } else {
                ctx.engine
                    .handle(InboundEvent::EndDialogRequested {
                        user: UserId(sender_id),
                        initiator: Initiator::User,
                    })
                    .await?;
            }
        },
    }
    Ok(())
}

/// Handle an inline-keyboard callback: category picks and dialog controls.
pub async fn handle_callback_query(
    query: CallbackQuery,
    bot: &Bot,
    ctx: &BotContext,
) -> anyhow::Result<()> {
    // Answer first to dismiss the client's loading spinner.
    let _ = bot.answer_callback_query(&query.id).await;

    let Some(data) = query.data else {
        return Ok(());
    };
    let user = UserId(query.from.id.0 as i64);

    let event = match data.as_str() {
        "back_to_menu" => InboundEvent::BackToMenuRequested { user },
        "end_dialog" => InboundEvent::EndDialogRequested {
            user,
            initiator: Initiator::User,
        },
        category => InboundEvent::CategorySelected {
            user,
            category: category.to_string(),
        },
    };
    ctx.engine.handle(event).await?;
    Ok(())
}
