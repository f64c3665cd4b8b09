//! Session store: active user↔operator claims plus per-user pending
//! category selection.

mod store;

pub use store::{ClaimOutcome, Conversation, ReleaseOutcome, SessionStore};
