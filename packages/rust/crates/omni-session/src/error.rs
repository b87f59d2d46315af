//! Error types for the session core.
//!
//! Library code uses `thiserror` for explicit error enums. Nonce mismatches and
//! poll timeouts are expected outcomes and never show up here.

use thiserror::Error;

use crate::journal::TxPhase;

/// Failures surfaced by the session core.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Inbound message (or poll request) carries no usable session id.
    #[error("no session id in message `{method}` from `{from}`")]
    MissingSessionId {
        /// Sender of the offending message.
        from: String,
        /// Method of the offending message.
        method: String,
    },

    /// Lifecycle hook called in a phase that does not allow it.
    #[error("cannot {op} while transaction is {from}")]
    InvalidTransition {
        /// Phase the journal was in.
        from: TxPhase,
        /// Hook that was called.
        op: &'static str,
    },

    /// Proxy surface used outside of a begun transaction.
    #[error("no transaction in progress")]
    NoActiveTransaction,

    /// Session selector is not a valid glob.
    #[error("invalid session pattern `{pattern}`: {source}")]
    InvalidSessionPattern {
        /// Raw selector text.
        pattern: String,
        /// Parser failure.
        #[source]
        source: globset::Error,
    },

    /// Checkpoint could not be (de)serialized.
    #[error("checkpoint serialization failed: {0}")]
    Checkpoint(#[from] serde_json::Error),
}

/// Failure of one hosted request. The transaction has been aborted in every case.
#[derive(Error, Debug)]
pub enum InvokeError {
    /// Protocol misuse: missing session id, lifecycle error, bad selector.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Business logic refused the request (includes nonce mismatches).
    #[error("method `{method}` failed: {message}")]
    Application {
        /// Invoked method.
        method: String,
        /// Rendered error chain.
        message: String,
    },

    /// Checkpoint could not be written before commit.
    #[error("checkpoint persistence failed: {0:#}")]
    Persistence(anyhow::Error),
}

impl InvokeError {
    /// Classify an error raised by business logic.
    #[must_use]
    pub fn from_method(method: &str, error: anyhow::Error) -> Self {
        match error.downcast::<SessionError>() {
            Ok(session) => Self::Session(session),
            Err(error) => Self::Application {
                method: method.to_string(),
                message: format!("{error:#}"),
            },
        }
    }
}
