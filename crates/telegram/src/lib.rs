//! Telegram transport: long-polling loop, update handlers mapping Telegram
//! updates to routing-engine events, and the outbound delivery adapter.

pub mod bot;
pub mod handlers;
pub mod outbound;
pub mod state;

pub use {bot::start_polling, outbound::TelegramDelivery, state::BotContext};
