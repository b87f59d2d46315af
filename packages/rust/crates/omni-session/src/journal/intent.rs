//! Deferred session mutations recorded during a transaction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::NotificationArgs;
use crate::session::SessionRecord;

/// One logged mutation. Serialized as `{"op": ..., "sessionId": ..., ...payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Intent {
    Notify {
        session_id: String,
        args: NotificationArgs,
    },
    Begin {
        session_id: String,
        nonce: String,
    },
    End {
        session_id: String,
    },
    Remember {
        session_id: String,
        memento: Value,
    },
    LimitQueue {
        session_id: String,
        max: i64,
    },
}

impl Intent {
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::Notify { session_id, .. }
            | Self::Begin { session_id, .. }
            | Self::End { session_id }
            | Self::Remember { session_id, .. }
            | Self::LimitQueue { session_id, .. } => session_id,
        }
    }

    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Notify { .. } => "notify",
            Self::Begin { .. } => "begin",
            Self::End { .. } => "end",
            Self::Remember { .. } => "remember",
            Self::LimitQueue { .. } => "limitQueue",
        }
    }

    /// Record-only effect of the intent (a notify always queues).
    ///
    /// Used to build read-your-own-writes views; commit goes through `replay::apply`.
    pub(crate) fn apply_to_record(&self, record: &mut SessionRecord) {
        match self {
            Self::Notify { args, .. } => {
                record.enqueue(args.clone());
            }
            Self::Begin { nonce, .. } => record.set_nonce(nonce.clone()),
            Self::End { .. } => record.clear_persistent(),
            Self::Remember { memento, .. } => record.set_memento(memento.clone()),
            Self::LimitQueue { max, .. } => {
                record.set_limit(*max);
            }
        }
    }
}
