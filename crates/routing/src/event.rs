use opsdesk_common::{DeliveredMessageId, OperatorId, UserId, UserProfile};

/// Who asked for a dialog to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initiator {
    User,
    Operator(OperatorId),
}

/// Inbound events consumed by the routing engine. The transport maps
/// platform updates to these shapes.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// User picked a category from the menu.
    CategorySelected { user: UserId, category: String },

    /// User sent free text. `message_id` is the platform id of the inbound
    /// message, used only to build locally unique reference strings.
    TextSubmitted {
        user: UserId,
        message_id: i64,
        text: String,
        profile: UserProfile,
    },

    /// Operator replied to a previously forwarded message. `replied_to` is
    /// the correlation id the delivery call returned when the copy was
    /// forwarded.
    OperatorReply {
        operator: OperatorId,
        replied_to: DeliveredMessageId,
        text: String,
    },

    /// User or operator asked to end the user's dialog. The transport
    /// resolves operator-side requests to the target user before emitting
    /// this event.
    EndDialogRequested { user: UserId, initiator: Initiator },

    /// User asked to go back to the menu, dropping any dialog.
    BackToMenuRequested { user: UserId },

    /// User cancelled the pending category selection.
    Cancel { user: UserId },
}
