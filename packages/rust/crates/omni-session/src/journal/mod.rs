//! Transaction journal: per-request intent log with an explicit phase machine.
//!
//! ```text
//! Idle --begin--> Began --prepare--> Prepared
//!  ^               |  \                 |
//!  |            abort  commit         commit / abort
//!  +---------------+----+---------------+
//! ```

mod checkpoint;
mod intent;
pub(crate) mod replay;

use std::fmt;

pub use checkpoint::Checkpoint;
pub use intent::Intent;

use crate::error::SessionError;

/// Phase of the in-flight transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxPhase {
    #[default]
    Idle,
    Began,
    Prepared,
}

impl fmt::Display for TxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Began => "began",
            Self::Prepared => "prepared",
        })
    }
}

/// Per-transaction context: who is calling, on behalf of which session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxContext {
    /// Session of the request being processed.
    pub session_id: String,
    /// Entity the request was addressed to.
    pub entity_id: String,
}

/// Intents of the request currently being processed.
#[derive(Debug, Default)]
pub struct TransactionJournal {
    phase: TxPhase,
    context: Option<TxContext>,
    intents: Vec<Intent>,
}

impl TransactionJournal {
    #[must_use]
    pub fn phase(&self) -> TxPhase {
        self.phase
    }

    #[must_use]
    pub fn context(&self) -> Option<&TxContext> {
        self.context.as_ref()
    }

    #[must_use]
    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    /// Pending intents touching `session_id`, oldest first.
    pub fn pending_for<'a>(&'a self, session_id: &'a str) -> impl Iterator<Item = &'a Intent> {
        self.intents
            .iter()
            .filter(move |intent| intent.session_id() == session_id)
    }

    pub(crate) fn begin(&mut self, context: TxContext) -> Result<(), SessionError> {
        self.expect_phase(TxPhase::Idle, "begin")?;
        self.context = Some(context);
        self.intents.clear();
        self.phase = TxPhase::Began;
        Ok(())
    }

    pub(crate) fn push(&mut self, intent: Intent) -> Result<(), SessionError> {
        if self.phase != TxPhase::Began {
            return Err(SessionError::NoActiveTransaction);
        }
        self.intents.push(intent);
        Ok(())
    }

    pub(crate) fn prepare(&mut self) -> Result<Vec<Intent>, SessionError> {
        self.expect_phase(TxPhase::Began, "prepare")?;
        self.phase = TxPhase::Prepared;
        Ok(self.intents.clone())
    }

    /// Hand over the intents to apply and return to `Idle`.
    pub(crate) fn take_for_commit(&mut self) -> Result<Vec<Intent>, SessionError> {
        if self.phase == TxPhase::Idle {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                op: "commit",
            });
        }
        self.reset();
        Ok(std::mem::take(&mut self.intents))
    }

    /// Drop pending intents; returns how many were discarded.
    pub(crate) fn abort(&mut self) -> usize {
        let discarded = self.intents.len();
        self.intents.clear();
        self.reset();
        discarded
    }

    pub(crate) fn expect_phase(&self, wanted: TxPhase, op: &'static str) -> Result<(), SessionError> {
        if self.phase == wanted {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: self.phase,
                op,
            })
        }
    }

    fn reset(&mut self) {
        self.phase = TxPhase::Idle;
        self.context = None;
    }
}
