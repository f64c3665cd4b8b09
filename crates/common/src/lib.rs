//! Shared identifier and value types used across all opsdesk crates.

pub mod types;

pub use types::{DeliveredMessageId, OperatorId, RecipientId, UserId, UserProfile};
