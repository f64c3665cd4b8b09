//! Reply index: maps a delivered outbound message back to the inbound
//! context it answers, enabling reply-to threading.
//!
//! Every forwarded copy gets its own entry (one per operator who received
//! it, plus one per dialog turn), so multiple entries may point at the same
//! user. Entries are never removed on lookup; pruning happens only through
//! [`ReplyIndex::prune_user`] when the prune-on-release policy is enabled.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use opsdesk_common::{DeliveredMessageId, UserId};

/// A record linking a previously delivered message to the user it
/// originated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub user: UserId,
    /// Locally unique reference string shown in the forwarded payload,
    /// e.g. `msg_42_7` or `dialog_42_9`.
    pub reference: String,
    /// Category at the time the message was forwarded.
    pub category: String,
}

/// In-memory reply index.
///
/// The mutex is only held for map operations, never across an await.
#[derive(Debug, Default)]
pub struct ReplyIndex {
    entries: Mutex<HashMap<DeliveredMessageId, PendingReply>>,
}

impl ReplyIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DeliveredMessageId, PendingReply>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record that `outbound` was delivered on behalf of `user`.
    pub fn record(
        &self,
        outbound: DeliveredMessageId,
        user: UserId,
        reference: impl Into<String>,
        category: impl Into<String>,
    ) {
        self.lock().insert(
            outbound,
            PendingReply {
                user,
                reference: reference.into(),
                category: category.into(),
            },
        );
    }

    /// Look up the inbound context a delivered message answers.
    ///
    /// Reads never mutate the index.
    #[must_use]
    pub fn lookup(&self, outbound: DeliveredMessageId) -> Option<PendingReply> {
        self.lock().get(&outbound).cloned()
    }

    /// Drop every record pointing at `user`. Returns the number removed.
    pub fn prune_user(&self, user: UserId) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, r| r.user != user);
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
