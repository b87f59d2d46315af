//! In-memory session store: session_id → record, in creation order, with a soft size cap.

use std::collections::HashMap;

use crate::observability::SessionEvent;

use super::record::SessionRecord;
use super::snapshot::SessionSnapshot;

/// All logical sessions of one entity.
#[derive(Debug, Clone)]
pub struct SessionStore {
    records: HashMap<String, SessionRecord>,
    order: Vec<String>,
    default_limit: i64,
    max_sessions: usize,
}

impl SessionStore {
    /// Create an empty store; new records get `default_limit`.
    #[must_use]
    pub fn new(default_limit: i64, max_sessions: usize) -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
            default_limit,
            max_sessions: max_sessions.max(1),
        }
    }

    #[must_use]
    pub fn default_limit(&self) -> i64 {
        self.default_limit
    }

    #[must_use]
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.records.contains_key(session_id)
    }

    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<&SessionRecord> {
        self.records.get(session_id)
    }

    /// Every known session id, oldest first.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Existing record, or a fresh one after making room for it.
    pub fn get_or_create(&mut self, session_id: &str) -> &mut SessionRecord {
        if !self.records.contains_key(session_id) {
            self.evict_for_insert();
            self.order.push(session_id.to_string());
            tracing::debug!(
                event = SessionEvent::SessionCreated.as_str(),
                session_id,
                sessions = self.order.len(),
                limit = self.default_limit,
                "session record created"
            );
        }
        let default_limit = self.default_limit;
        self.records
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRecord::new(default_limit))
    }

    /// Copy of every record, in creation order.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let entries = self
            .order
            .iter()
            .filter_map(|id| self.records.get(id).map(|record| (id.clone(), record.clone())))
            .collect();
        SessionSnapshot::from_entries(entries)
    }

    /// Replace all records with the ones in `snapshot`.
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.records.clear();
        self.order.clear();
        for (id, record) in snapshot.into_entries() {
            if self.records.insert(id.clone(), record).is_none() {
                self.order.push(id);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }

    fn evict_for_insert(&mut self) {
        let excess = (self.order.len() + 1).saturating_sub(self.max_sessions);
        if excess == 0 {
            return;
        }
        let victims = eviction_victims(
            self.order
                .iter()
                .filter_map(|id| self.records.get(id).map(|record| (id.as_str(), record))),
            self.default_limit,
            excess,
        );
        if victims.is_empty() {
            tracing::debug!(
                event = SessionEvent::SessionEvicted.as_str(),
                sessions = self.order.len(),
                max_sessions = self.max_sessions,
                evicted = 0,
                "session cap exceeded; no eviction candidates"
            );
            return;
        }
        for id in &victims {
            let dropped = self.records.remove(id).map_or(0, |record| record.messages().len());
            tracing::info!(
                event = SessionEvent::SessionEvicted.as_str(),
                session_id = %id,
                dropped_messages = dropped,
                max_sessions = self.max_sessions,
                "session evicted"
            );
        }
        self.order.retain(|id| self.records.contains_key(id));
    }
}

/// Pick up to `count` sessions to drop.
///
/// Only sessions with pending messages and the default limit qualify; the largest
/// queues go first, oldest first among equals.
fn eviction_victims<'a>(
    records: impl Iterator<Item = (&'a str, &'a SessionRecord)>,
    default_limit: i64,
    count: usize,
) -> Vec<String> {
    let mut candidates: Vec<(&str, usize)> = records
        .filter(|(_, record)| !record.messages().is_empty() && record.limit() == default_limit)
        .map(|(id, record)| (id, record.messages().len()))
        .collect();
    // Stable sort: equal sizes keep creation order, so the oldest goes first.
    candidates.sort_by(|(_, a), (_, b)| b.cmp(a));
    candidates
        .into_iter()
        .take(count)
        .map(|(id, _)| id.to_string())
        .collect()
}
