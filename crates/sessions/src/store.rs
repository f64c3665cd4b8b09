use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use tracing::debug;

use opsdesk_common::{OperatorId, UserId};

/// An active, exclusive user↔operator pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub user: UserId,
    /// Operator who claimed the conversation; the only one allowed to send
    /// routed replies into it.
    pub operator: OperatorId,
    /// Topic at the time of claim.
    pub category: String,
}

/// Outcome of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The conversation was created, or the same operator already held it.
    Started,
    /// A different operator already holds the conversation. No mutation
    /// was made.
    AlreadyClaimedByOther(OperatorId),
}

/// Outcome of an owner-checked release attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The conversation existed, was held by the caller, and is now gone.
    Released(Conversation),
    /// A different operator holds the conversation. No mutation was made.
    HeldByOther(OperatorId),
    /// The user has no active conversation.
    NotFound,
}

#[derive(Debug, Default)]
struct Tables {
    claims: HashMap<UserId, Conversation>,
    pending: HashMap<UserId, String>,
}

/// In-memory session store.
///
/// A single mutex guards both tables so that `claim`'s check-and-insert is
/// one indivisible step. The lock is only held for map operations, never
/// across an await.
#[derive(Debug, Default)]
pub struct SessionStore {
    tables: Mutex<Tables>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the pending category for a user, overwriting any prior choice.
    pub fn set_category(&self, user: UserId, category: impl Into<String>) {
        self.lock().pending.insert(user, category.into());
    }

    /// Pending category, if the user is mid-selection.
    #[must_use]
    pub fn pending_category(&self, user: UserId) -> Option<String> {
        self.lock().pending.get(&user).cloned()
    }

    /// Read and clear the pending category in one step.
    pub fn take_category(&self, user: UserId) -> Option<String> {
        self.lock().pending.remove(&user)
    }

    /// Clear any pending category without reading it.
    pub fn clear_category(&self, user: UserId) {
        self.lock().pending.remove(&user);
    }

    /// Attempt to claim `user` for `operator`.
    ///
    /// Creates the conversation if none exists. A repeat claim by the same
    /// operator is a no-op success; a claim while a different operator
    /// holds the conversation makes no mutation.
    pub fn claim(&self, user: UserId, operator: OperatorId, category: impl Into<String>) -> ClaimOutcome {
        let mut tables = self.lock();
        match tables.claims.get(&user) {
            Some(existing) if existing.operator != operator => {
                ClaimOutcome::AlreadyClaimedByOther(existing.operator)
            },
            Some(_) => ClaimOutcome::Started,
            None => {
                tables.claims.insert(
                    user,
                    Conversation {
                        user,
                        operator,
                        category: category.into(),
                    },
                );
                debug!(%user, %operator, "conversation claimed");
                ClaimOutcome::Started
            },
        }
    }

    /// Remove and return the conversation for `user`, if any.
    pub fn release(&self, user: UserId) -> Option<Conversation> {
        let released = self.lock().claims.remove(&user);
        if released.is_some() {
            debug!(%user, "conversation released");
        }
        released
    }

    /// Remove the conversation for `user` only if `operator` holds it.
    ///
    /// The check and the removal happen under one lock, so a rival release
    /// cannot slip between them.
    pub fn release_if_held_by(&self, user: UserId, operator: OperatorId) -> ReleaseOutcome {
        let mut tables = self.lock();
        match tables.claims.get(&user).map(|c| c.operator) {
            None => ReleaseOutcome::NotFound,
            Some(held_by) if held_by != operator => ReleaseOutcome::HeldByOther(held_by),
            Some(_) => match tables.claims.remove(&user) {
                Some(conv) => {
                    debug!(%user, %operator, "conversation released by holder");
                    ReleaseOutcome::Released(conv)
                },
                None => ReleaseOutcome::NotFound,
            },
        }
    }

    /// Current conversation for `user`, if any.
    #[must_use]
    pub fn get(&self, user: UserId) -> Option<Conversation> {
        self.lock().claims.get(&user).cloned()
    }

    /// Snapshot of all active conversations, sorted by user id for stable
    /// listings (order is not semantically significant).
    #[must_use]
    pub fn list_all(&self) -> Vec<Conversation> {
        let mut all: Vec<Conversation> = self.lock().claims.values().cloned().collect();
        all.sort_by_key(|c| c.user);
        all
    }
}
