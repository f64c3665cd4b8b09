//! Message texts produced by the engine. The transport delivers them
//! verbatim; controls (buttons) are attached separately.

use opsdesk_common::{OperatorId, UserId, UserProfile};
use opsdesk_sessions::Conversation;

pub const SUBMISSION_CONFIRMED: &str =
    "✅ Thank you! Your message has been sent to the operators. Please wait for a reply.";

pub const DIALOG_TURN_CONFIRMED: &str = "✅ Message sent to the operator.";

pub const CANCELLED: &str = "❌ Operation cancelled.";

pub const NO_ACTIVE_DIALOG: &str = "❌ No active dialog found.";

pub const UNKNOWN_REPLY_TARGET: &str = "❌ Could not find the original message for this reply.";

pub const REPLY_SENT_CONFIRMED: &str =
    "✅ Reply delivered. The dialog is yours; the other operators were notified.";

pub const REPLY_DELIVERY_FAILED: &str = "❌ Failed to deliver the reply to the user.";

pub const DIALOG_ENDED_USER_CONFIRM: &str =
    "✅ Dialog ended. Thank you for reaching out. Use /start for a new request.";

pub const DIALOG_ENDED_BY_OPERATOR: &str =
    "💬 The operator has ended the dialog. Use /start for a new request.";

pub const DIALOG_ENDED_OPERATOR_CONFIRM: &str = "✅ Dialog ended. The user was notified.";

pub const IDLE_PROMPT: &str = "Hi! To reach the operators, use /start.";

pub const NO_DIALOGS: &str = "📭 No active dialogs.";

/// Instruction screen shown after a category is selected.
#[must_use]
pub fn category_instructions(label: &str, instructions: &str) -> String {
    format!("📝 Category: {label}\n\n{instructions}\n\nSend your message:")
}

fn sender_line(profile: &UserProfile, user: UserId) -> String {
    let handle = profile.username.as_deref().unwrap_or("not set");
    format!(
        "👤 From: {}\n🆔 ID: {user}\n👤 Username: @{handle}",
        profile.display_name
    )
}

/// Payload forwarded to every operator for a fresh submission.
#[must_use]
pub fn new_request(
    reference: &str,
    profile: &UserProfile,
    user: UserId,
    category_label: &str,
    text: &str,
) -> String {
    format!(
        "📨 New request #{reference}\n\n{}\n📂 Category: {category_label}\n\n💬 Message:\n{text}\n\n📋 Reply to this message to answer the user",
        sender_line(profile, user)
    )
}

/// Payload forwarded to the claiming operator for a dialog turn.
#[must_use]
pub fn dialog_turn(profile: &UserProfile, user: UserId, text: &str) -> String {
    format!(
        "💬 Dialog continued\n\n{}\n\n💬 Message:\n{text}\n\n📋 Reply to this message to continue the dialog",
        sender_line(profile, user)
    )
}

/// Reply delivered to the user when an operator claims the dialog.
#[must_use]
pub fn operator_reply(text: &str) -> String {
    format!("📬 Reply from the operator:\n\n{text}\n\n💬 Dialog started, you can keep writing.")
}

#[must_use]
pub fn dialog_started_notice(operator: OperatorId, user: UserId) -> String {
    format!("💬 Operator {operator} started a dialog with user {user}.")
}

#[must_use]
pub fn dialog_ended_notice(user: UserId) -> String {
    format!("✅ The dialog with user {user} has ended. The user is available for new requests.")
}

#[must_use]
pub fn user_ended_dialog(user: UserId) -> String {
    format!("💬 User {user} ended the dialog.")
}

#[must_use]
pub fn user_left_to_menu(user: UserId) -> String {
    format!("💬 User {user} returned to the menu; the dialog has ended.")
}

/// Shown to an operator who tried to end a dialog they do not hold.
#[must_use]
pub fn end_dialog_held_by_other(held_by: OperatorId) -> String {
    format!(
        "⚠️ This dialog is held by operator {held_by}.\nOnly the claiming operator or the user can end it."
    )
}

#[must_use]
pub fn conversation_conflict(held_by: OperatorId) -> String {
    format!(
        "⚠️ This user is already in a dialog with operator {held_by}.\nWait for it to end or coordinate with your colleague."
    )
}

/// Operator-facing listing of active conversations.
#[must_use]
pub fn dialogs_list<'a>(
    conversations: impl IntoIterator<Item = &'a Conversation>,
    viewer: OperatorId,
    label_for: impl Fn(&str) -> String,
) -> String {
    let mut out = String::from("💬 Active dialogs:\n");
    let mut any = false;
    for conv in conversations {
        any = true;
        let marker = if conv.operator == viewer {
            "🟢 yours"
        } else {
            "🔴 a colleague's"
        };
        out.push_str(&format!(
            "\n👤 User: {}\n👨‍💼 Operator: {}\n📂 Category: {}\n{marker}\n",
            conv.user,
            conv.operator,
            label_for(&conv.category)
        ));
    }
    if !any {
        return NO_DIALOGS.to_string();
    }
    out
}
