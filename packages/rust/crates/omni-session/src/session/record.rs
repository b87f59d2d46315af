//! One logical session: pending notifications, exactly-once nonce/memento and queue bound.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::NotificationArgs;

/// Persisted state of a logical session.
///
/// Pending polls are not part of the record; they live in the backchannel side table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Pending notifications, oldest first.
    #[serde(default)]
    messages: VecDeque<NotificationArgs>,
    /// Current persistent session instance, set by `begin` and cleared by `end`.
    #[serde(default)]
    nonce: Option<String>,
    /// Client checkpointed state.
    #[serde(default)]
    memento: Option<Value>,
    /// Queue bound; `<= 0` means unbounded.
    limit: i64,
}

impl SessionRecord {
    #[must_use]
    pub fn new(limit: i64) -> Self {
        Self {
            messages: VecDeque::new(),
            nonce: None,
            memento: None,
            limit,
        }
    }

    #[must_use]
    pub fn messages(&self) -> &VecDeque<NotificationArgs> {
        &self.messages
    }

    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    #[must_use]
    pub fn memento(&self) -> Option<&Value> {
        self.memento.as_ref()
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Snapshot of the pending queue.
    #[must_use]
    pub fn outq(&self) -> Vec<NotificationArgs> {
        self.messages.iter().cloned().collect()
    }

    /// Append a notification and trim to the limit. Returns how many were dropped.
    pub(crate) fn enqueue(&mut self, args: NotificationArgs) -> usize {
        self.messages.push_back(args);
        self.trim()
    }

    /// Set the queue bound and trim immediately. Returns how many were dropped.
    pub(crate) fn set_limit(&mut self, limit: i64) -> usize {
        self.limit = limit;
        self.trim()
    }

    pub(crate) fn pop_front(&mut self) -> Option<NotificationArgs> {
        self.messages.pop_front()
    }

    pub(crate) fn set_nonce(&mut self, nonce: String) {
        self.nonce = Some(nonce);
    }

    pub(crate) fn set_memento(&mut self, memento: Value) {
        self.memento = (!memento.is_null()).then_some(memento);
    }

    /// Close the persistent session: nonce and memento both go away.
    pub(crate) fn clear_persistent(&mut self) {
        self.nonce = None;
        self.memento = None;
    }

    fn trim(&mut self) -> usize {
        let Ok(limit) = usize::try_from(self.limit) else {
            return 0;
        };
        if limit == 0 || self.messages.len() <= limit {
            return 0;
        }
        let dropped = self.messages.len() - limit;
        self.messages.drain(..dropped);
        dropped
    }
}
