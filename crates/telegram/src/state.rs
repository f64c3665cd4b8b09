use std::sync::Arc;

use {opsdesk_config::OpsdeskConfig, opsdesk_routing::RoutingEngine};

use crate::outbound::TelegramDelivery;

/// Shared handler context for one bot connection.
#[derive(Clone)]
pub struct BotContext {
    pub config: Arc<OpsdeskConfig>,
    pub engine: Arc<RoutingEngine>,
    pub delivery: Arc<TelegramDelivery>,
}
