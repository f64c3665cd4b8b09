use serde::{Deserialize, Serialize};

/// Stable numeric id of an end user (the Telegram peer id in the default
/// transport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Member of the configured operator pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(pub i64);

/// Delivery target: either side of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(pub i64);

/// Correlation id for a single delivered message, returned by the
/// collaborator's `deliver` call and threaded back in operator replies.
///
/// Platform-independent generalization of a sent-message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveredMessageId(pub i64);

impl From<UserId> for RecipientId {
    fn from(id: UserId) -> Self {
        Self(id.0)
    }
}

impl From<OperatorId> for RecipientId {
    fn from(id: OperatorId) -> Self {
        Self(id.0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for OperatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for DeliveredMessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Ephemeral sender attributes carried on inbound text events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name as reported by the platform.
    pub display_name: String,
    /// Optional platform handle (without the `@`).
    pub username: Option<String>,
}

impl UserProfile {
    #[must_use]
    pub fn new(display_name: impl Into<String>, username: Option<String>) -> Self {
        Self {
            display_name: display_name.into(),
            username,
        }
    }
}
