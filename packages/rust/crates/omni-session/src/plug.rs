//! Session plug: the lifecycle hooks a host engine drives around each request.

use std::sync::{Arc, Mutex};

use crate::backchannel::{Backchannel, SessionState, lock_state};
use crate::config::SessionConfig;
use crate::envelope::Envelope;
use crate::error::SessionError;
use crate::journal::{Checkpoint, TransactionJournal, TxContext, TxPhase, replay};
use crate::observability::SessionEvent;
use crate::proxy::SessionProxy;
use crate::session::{SessionSnapshot, SessionStore};

/// Hook contract between a host transaction engine and a stateful plug.
///
/// The host calls `begin` before running business logic for a message, then
/// `prepare` to obtain a checkpoint it persists, then `commit`; or `abort` if
/// anything failed. `resume` rebuilds state from the last persisted checkpoint.
pub trait TransactionalPlug {
    type Checkpoint;

    /// Start from an empty state.
    fn init(&mut self);

    fn begin(&mut self, msg: &Envelope) -> Result<(), SessionError>;

    fn prepare(&mut self) -> Result<Self::Checkpoint, SessionError>;

    fn commit(&mut self) -> Result<(), SessionError>;

    fn abort(&mut self);

    fn resume(&mut self, checkpoint: Self::Checkpoint) -> Result<(), SessionError>;

    fn shutdown(&mut self);
}

/// Logical sessions of one entity.
pub struct SessionPlug {
    config: SessionConfig,
    shared: Arc<Mutex<SessionState>>,
    journal: TransactionJournal,
}

impl SessionPlug {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let store = SessionStore::new(config.max_messages_per_queue, config.max_sessions);
        Self {
            config,
            shared: Arc::new(Mutex::new(SessionState::new(store))),
            journal: TransactionJournal::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> TxPhase {
        self.journal.phase()
    }

    /// Handle for the network layer's `pull`.
    #[must_use]
    pub fn backchannel(&self) -> Backchannel {
        Backchannel::new(Arc::clone(&self.shared), self.config.backchannel_timeout())
    }

    /// Business-logic surface of the transaction in progress.
    pub fn proxy(&mut self) -> Result<SessionProxy<'_>, SessionError> {
        if self.journal.phase() != TxPhase::Began {
            return Err(SessionError::NoActiveTransaction);
        }
        Ok(SessionProxy::new(
            &mut self.journal,
            &self.shared,
            self.config.max_messages_per_queue,
        ))
    }

    /// Committed records, without pending intents.
    #[must_use]
    pub fn committed(&self) -> SessionSnapshot {
        lock_state(&self.shared).store.snapshot()
    }
}

impl TransactionalPlug for SessionPlug {
    type Checkpoint = Checkpoint;

    fn init(&mut self) {
        self.journal.abort();
        let mut state = lock_state(&self.shared);
        state.shutdown();
        state.reopen();
        state.store.clear();
    }

    fn begin(&mut self, msg: &Envelope) -> Result<(), SessionError> {
        let session_id = msg.require_session_id()?.to_string();
        self.journal.begin(TxContext {
            session_id: session_id.clone(),
            entity_id: msg.to.clone(),
        })?;
        // Materialize now so pattern selectors see the caller's own session.
        lock_state(&self.shared).store.get_or_create(&session_id);
        tracing::debug!(
            event = SessionEvent::JournalBegan.as_str(),
            session_id = %session_id,
            method = %msg.method,
            "transaction began"
        );
        Ok(())
    }

    fn prepare(&mut self) -> Result<Checkpoint, SessionError> {
        let journal = self.journal.prepare()?;
        let sessions = lock_state(&self.shared).store.snapshot();
        tracing::debug!(
            event = SessionEvent::JournalPrepared.as_str(),
            sessions = sessions.len(),
            intents = journal.len(),
            "transaction prepared"
        );
        Ok(Checkpoint { sessions, journal })
    }

    fn commit(&mut self) -> Result<(), SessionError> {
        let intents = self.journal.take_for_commit()?;
        let applied = replay::replay(&intents, &mut lock_state(&self.shared));
        tracing::debug!(
            event = SessionEvent::JournalCommitted.as_str(),
            applied,
            "transaction committed"
        );
        Ok(())
    }

    fn abort(&mut self) {
        let session_id = self.journal.context().map(|ctx| ctx.session_id.clone());
        let discarded = self.journal.abort();
        tracing::debug!(
            event = SessionEvent::JournalAborted.as_str(),
            session_id = ?session_id,
            discarded,
            "transaction aborted"
        );
    }

    fn resume(&mut self, checkpoint: Checkpoint) -> Result<(), SessionError> {
        self.journal.expect_phase(TxPhase::Idle, "resume")?;
        let Checkpoint { sessions, journal } = checkpoint;
        let mut state = lock_state(&self.shared);
        state.shutdown();
        state.reopen();
        state.store.restore(sessions);
        let replayed = replay::replay(&journal, &mut state);
        tracing::info!(
            event = SessionEvent::JournalResumed.as_str(),
            sessions = state.store.len(),
            replayed,
            "sessions resumed from checkpoint"
        );
        Ok(())
    }

    fn shutdown(&mut self) {
        self.journal.abort();
        let answered = lock_state(&self.shared).close();
        tracing::info!(
            event = SessionEvent::BackchannelShutdown.as_str(),
            answered,
            "session plug shut down"
        );
    }
}
