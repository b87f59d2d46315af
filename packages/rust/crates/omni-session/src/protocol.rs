//! Exactly-once nonce protocol: `begin` / `remember` / `end`.
//!
//! A stateless client calls `begin()` to get a nonce tying its next requests
//! together. If a reply is lost, calling `begin()` again returns the memento of the
//! last action that did commit, so the client knows where to resume.

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::SessionRecord;

/// Random bytes per nonce.
pub const NONCE_BYTES: usize = 18;

/// Result of `begin()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeginOutcome {
    /// Identifier of the new persistent session.
    pub nonce: String,
    /// Memento left by a previous persistent session that was not ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memento: Option<Value>,
}

/// Fresh hex-encoded nonce from the OS CSPRNG.
#[must_use]
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// What `end(nonce)` should do given the session's effective state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndDecision {
    /// Nonce matches: log an `end` intent.
    Close,
    /// Nothing open and nothing remembered: succeed without an intent.
    AlreadyClosed,
    /// Another persistent session is in progress.
    Mismatch,
}

pub(crate) fn decide_end(record: Option<&SessionRecord>, nonce: &str) -> EndDecision {
    let Some(record) = record else {
        return EndDecision::AlreadyClosed;
    };
    if record.nonce() == Some(nonce) {
        EndDecision::Close
    } else if record.nonce().is_none() && record.memento().is_none() {
        EndDecision::AlreadyClosed
    } else {
        EndDecision::Mismatch
    }
}

pub(crate) fn nonce_matches(record: Option<&SessionRecord>, nonce: &str) -> bool {
    record.and_then(SessionRecord::nonce) == Some(nonce)
}
