//! Business-logic surface of an in-flight transaction.
//!
//! Mutating calls only append intents to the journal. Reads see the committed
//! store with this transaction's own pending intents applied on top.

use std::sync::Mutex;

use serde_json::Value;

use crate::backchannel::{SessionState, lock_state};
use crate::envelope::NotificationArgs;
use crate::error::SessionError;
use crate::journal::{Intent, TransactionJournal};
use crate::observability::SessionEvent;
use crate::protocol::{self, BeginOutcome, EndDecision};
use crate::session::{SessionRecord, SessionSelector};

/// Borrowed from [`SessionPlug::proxy`](crate::SessionPlug::proxy) while a transaction is open.
pub struct SessionProxy<'a> {
    journal: &'a mut TransactionJournal,
    shared: &'a Mutex<SessionState>,
    default_limit: i64,
}

impl<'a> SessionProxy<'a> {
    pub(crate) fn new(
        journal: &'a mut TransactionJournal,
        shared: &'a Mutex<SessionState>,
        default_limit: i64,
    ) -> Self {
        Self {
            journal,
            shared,
            default_limit,
        }
    }

    /// Session of the request being processed.
    #[must_use]
    pub fn session_id(&self) -> &str {
        self.journal
            .context()
            .map_or("", |ctx| ctx.session_id.as_str())
    }

    /// Entity the request was addressed to.
    #[must_use]
    pub fn my_id(&self) -> &str {
        self.journal
            .context()
            .map_or("", |ctx| ctx.entity_id.as_str())
    }

    /// Known session ids in creation order, including ones this transaction introduces.
    #[must_use]
    pub fn all_session_ids(&self) -> Vec<String> {
        let mut ids = lock_state(self.shared).store.ids().to_vec();
        for intent in self.journal.intents() {
            if !ids.iter().any(|id| id == intent.session_id()) {
                ids.push(intent.session_id().to_string());
            }
        }
        ids
    }

    /// Pending notifications of one session (the current one when `session` is `None`).
    pub fn outq(&self, session: Option<&str>) -> Result<Vec<NotificationArgs>, SessionError> {
        let ids = self.targets(session)?;
        let Some(id) = ids.first() else {
            return Ok(Vec::new());
        };
        Ok(self
            .effective_record(id)
            .map(|record| record.outq())
            .unwrap_or_default())
    }

    /// Queue `args` for the selected session(s). Returns how many sessions were targeted.
    pub fn notify(
        &mut self,
        args: NotificationArgs,
        session: Option<&str>,
    ) -> Result<usize, SessionError> {
        let targets = self.targets(session)?;
        for session_id in &targets {
            self.journal.push(Intent::Notify {
                session_id: session_id.clone(),
                args: args.clone(),
            })?;
        }
        Ok(targets.len())
    }

    /// Bound the queue of the selected session(s); `max <= 0` removes the bound.
    pub fn limit_queue(&mut self, max: i64, session: Option<&str>) -> Result<usize, SessionError> {
        let targets = self.targets(session)?;
        for session_id in &targets {
            self.journal.push(Intent::LimitQueue {
                session_id: session_id.clone(),
                max,
            })?;
        }
        Ok(targets.len())
    }

    /// Open a persistent session: fresh nonce plus the memento of the last unfinished one.
    pub fn begin(&mut self) -> Result<BeginOutcome, SessionError> {
        let session_id = self.session_id().to_string();
        let memento = self
            .effective_record(&session_id)
            .and_then(|record| record.memento().cloned());
        let nonce = protocol::generate_nonce();
        self.journal.push(Intent::Begin {
            session_id: session_id.clone(),
            nonce: nonce.clone(),
        })?;
        tracing::debug!(
            event = SessionEvent::ProtocolBegin.as_str(),
            session_id = %session_id,
            has_memento = memento.is_some(),
            "persistent session begun"
        );
        Ok(BeginOutcome { nonce, memento })
    }

    /// Close the persistent session `nonce`. `false` means the caller must abort.
    pub fn end(&mut self, nonce: &str) -> Result<bool, SessionError> {
        let session_id = self.session_id().to_string();
        let record = self.effective_record(&session_id);
        match protocol::decide_end(record.as_ref(), nonce) {
            EndDecision::Close => {
                self.journal.push(Intent::End {
                    session_id: session_id.clone(),
                })?;
                tracing::debug!(
                    event = SessionEvent::ProtocolEnd.as_str(),
                    session_id = %session_id,
                    "persistent session ended"
                );
                Ok(true)
            }
            EndDecision::AlreadyClosed => Ok(true),
            EndDecision::Mismatch => {
                log_mismatch(&session_id, "end");
                Ok(false)
            }
        }
    }

    /// Checkpoint client state under `nonce`. `false` means the caller must abort.
    pub fn remember(&mut self, nonce: &str, memento: Value) -> Result<bool, SessionError> {
        let session_id = self.session_id().to_string();
        let record = self.effective_record(&session_id);
        if !protocol::nonce_matches(record.as_ref(), nonce) {
            log_mismatch(&session_id, "remember");
            return Ok(false);
        }
        self.journal.push(Intent::Remember {
            session_id,
            memento,
        })?;
        Ok(true)
    }

    fn targets(&self, session: Option<&str>) -> Result<Vec<String>, SessionError> {
        let known = self.all_session_ids();
        let selector = SessionSelector::parse_among(session, &known)?;
        Ok(selector.resolve(self.session_id(), known.iter().map(String::as_str)))
    }

    /// Committed record with this transaction's pending intents applied.
    fn effective_record(&self, session_id: &str) -> Option<SessionRecord> {
        let committed = lock_state(self.shared).store.get(session_id).cloned();
        let mut pending = self.journal.pending_for(session_id).peekable();
        if pending.peek().is_none() {
            return committed;
        }
        let mut record = committed.unwrap_or_else(|| SessionRecord::new(self.default_limit));
        for intent in pending {
            intent.apply_to_record(&mut record);
        }
        Some(record)
    }
}

fn log_mismatch(session_id: &str, op: &'static str) {
    tracing::debug!(
        event = SessionEvent::ProtocolNonceMismatch.as_str(),
        session_id,
        op,
        "nonce does not match the open persistent session"
    );
}
