use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    teloxide::{
        payloads::SendMessageSetters,
        prelude::*,
        types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup},
    },
    tracing::debug,
};

use {
    opsdesk_common::{DeliveredMessageId, RecipientId},
    opsdesk_config::OpsdeskConfig,
    opsdesk_routing::{Controls, Delivery},
};

const MENU_TEXT: &str = "🤖 Welcome!\n\nPick the category of your request from the menu below:";

/// Outbound adapter: implements the engine's delivery seam on top of the
/// Telegram Bot API.
pub struct TelegramDelivery {
    bot: Bot,
    config: Arc<OpsdeskConfig>,
}

impl TelegramDelivery {
    #[must_use]
    pub fn new(bot: Bot, config: Arc<OpsdeskConfig>) -> Self {
        Self { bot, config }
    }
}

#[async_trait]
impl Delivery for TelegramDelivery {
    async fn deliver(
        &self,
        to: RecipientId,
        text: &str,
        controls: Option<Controls>,
    ) -> Result<DeliveredMessageId> {
        let mut request = self.bot.send_message(ChatId(to.0), text);
        if let Some(controls) = controls {
            request = request.reply_markup(controls_keyboard(controls));
        }
        let sent = request.await?;
        debug!(recipient = %to, message_id = sent.id.0, "delivered message");
        Ok(DeliveredMessageId(i64::from(sent.id.0)))
    }

    async fn render_menu(&self, to: RecipientId) -> Result<()> {
        self.bot
            .send_message(ChatId(to.0), MENU_TEXT)
            .reply_markup(menu_keyboard(&self.config))
            .await?;
        Ok(())
    }
}

/// One button per row, exactly as the menu is configured.
fn menu_keyboard(config: &OpsdeskConfig) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        config
            .categories
            .iter()
            .map(|c| vec![InlineKeyboardButton::callback(c.label.clone(), c.id.clone())]),
    )
}

fn controls_keyboard(controls: Controls) -> InlineKeyboardMarkup {
    let back = InlineKeyboardButton::callback("🔙 Back to menu", "back_to_menu");
    match controls {
        Controls::DialogActions => InlineKeyboardMarkup::new([
            vec![InlineKeyboardButton::callback("✅ End dialog", "end_dialog")],
            vec![back],
        ]),
        Controls::BackToMenu => InlineKeyboardMarkup::new([vec![back]]),
    }
}
