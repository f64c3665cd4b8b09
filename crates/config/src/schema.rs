use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use opsdesk_common::OperatorId;

use crate::error::ConfigurationError;

/// Callback ids used by menu controls; category ids must not collide with
/// them.
pub const RESERVED_CALLBACK_IDS: &[&str] = &["back_to_menu", "end_dialog"];

/// Top-level configuration. Supplied at startup, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsdeskConfig {
    pub telegram: TelegramConfig,

    /// Fixed operator pool: numeric ids permitted to claim and respond to
    /// conversations. Not created or destroyed at runtime.
    pub operators: Vec<i64>,

    /// Ordered category list shown in the menu.
    pub categories: Vec<CategoryConfig>,

    pub replies: RepliesConfig,
}

/// Configuration for the Telegram transport.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// A single selectable topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Stable id used in callback data and stored on conversations.
    pub id: String,
    /// Display label shown on the menu button.
    pub label: String,
    /// Instruction text shown after the category is selected.
    pub instructions: String,
}

/// Reply index policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepliesConfig {
    /// Prune a user's pending-reply records when their conversation is
    /// released. Off by default: records accumulate for the process
    /// lifetime.
    pub prune_on_release: bool,
}

impl Default for OpsdeskConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            operators: Vec::new(),
            categories: default_categories(),
            replies: RepliesConfig::default(),
        }
    }
}

impl OpsdeskConfig {
    /// Check that everything required to start is present and consistent.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.telegram.token.expose_secret().is_empty() {
            return Err(ConfigurationError::MissingToken);
        }
        if self.operators.is_empty() {
            return Err(ConfigurationError::EmptyOperatorPool);
        }
        if self.categories.is_empty() {
            return Err(ConfigurationError::NoCategories);
        }
        let mut seen = std::collections::HashSet::new();
        for cat in &self.categories {
            if RESERVED_CALLBACK_IDS.contains(&cat.id.as_str()) {
                return Err(ConfigurationError::ReservedCategoryId {
                    id: cat.id.clone(),
                });
            }
            if !seen.insert(cat.id.as_str()) {
                return Err(ConfigurationError::DuplicateCategory {
                    id: cat.id.clone(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn operator_pool(&self) -> Vec<OperatorId> {
        self.operators.iter().copied().map(OperatorId).collect()
    }

    #[must_use]
    pub fn is_operator(&self, id: i64) -> bool {
        self.operators.contains(&id)
    }

    #[must_use]
    pub fn category(&self, id: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Display label for a category id, falling back to the id itself for
    /// records whose category is no longer configured.
    #[must_use]
    pub fn category_label<'a>(&'a self, id: &'a str) -> &'a str {
        self.category(id).map_or(id, |c| c.label.as_str())
    }
}

/// Built-in category set, used when the config file does not override
/// `categories`.
fn default_categories() -> Vec<CategoryConfig> {
    [
        ("questions", "Questions", "Write your question and we will do our best to answer it."),
        ("complaints", "Complaints", "Describe your complaint. We will look into it."),
        ("suggestions", "Suggestions", "Tell us about your suggestions for improving our work."),
        ("criticism", "Criticism", "Share your criticism or remarks. We value the feedback."),
        ("other", "Other", "Write your message on any other topic."),
    ]
    .into_iter()
    .map(|(id, label, instructions)| CategoryConfig {
        id: id.to_string(),
        label: label.to_string(),
        instructions: instructions.to_string(),
    })
    .collect()
}
