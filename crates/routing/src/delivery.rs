use {anyhow::Result, async_trait::async_trait};

use opsdesk_common::{DeliveredMessageId, RecipientId};

/// The small fixed set of action controls attached to a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Controls {
    /// "End dialog" + "back to menu".
    DialogActions,
    /// "Back to menu" only.
    BackToMenu,
}

/// Collaborator capability: deliver messages and present the category menu.
/// The transport crate provides the concrete implementation.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Send `text` (optionally with action controls) to a recipient.
    ///
    /// Returns an identifier for this specific delivery; the engine records
    /// it in the reply index so operator replies can be threaded back.
    async fn deliver(
        &self,
        to: RecipientId,
        text: &str,
        controls: Option<Controls>,
    ) -> Result<DeliveredMessageId>;

    /// Present the category list as selectable options. Selections come
    /// back into the engine as `CategorySelected` events.
    async fn render_menu(&self, to: RecipientId) -> Result<()>;
}
