//! Message envelope consumed from the host and reply shapes handed to the network layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionError;

/// One notification payload: an ordered list of JSON values.
pub type NotificationArgs = Vec<Value>;

/// Inbound request envelope `{from, to, sessionId, method, args}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Client that sent the request.
    #[serde(default)]
    pub from: String,
    /// Entity the request is addressed to.
    #[serde(default)]
    pub to: String,
    /// Logical session of the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Method name to invoke.
    #[serde(default)]
    pub method: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Envelope {
    /// Build a request envelope.
    pub fn request(
        from: impl Into<String>,
        to: impl Into<String>,
        session_id: impl Into<String>,
        method: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            session_id: Some(session_id.into()),
            method: method.into(),
            args,
        }
    }

    /// Session id, trimmed; fails with `MissingSessionId` when absent or blank.
    pub fn require_session_id(&self) -> Result<&str, SessionError> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SessionError::MissingSessionId {
                from: self.from.clone(),
                method: self.method.clone(),
            })
    }
}

/// A notification tunnelled back through a poll request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub from: String,
    pub to: String,
    pub session_id: String,
    pub method: String,
    pub args: NotificationArgs,
}

impl Notification {
    /// Wrap `args` with the routing fields of the poll `request` it answers.
    pub fn tunnel(request: &Envelope, args: NotificationArgs) -> Self {
        Self {
            from: request.from.clone(),
            to: request.to.clone(),
            session_id: request.session_id.clone().unwrap_or_default(),
            method: request.method.clone(),
            args,
        }
    }

    /// Flat wire form `[from, to, sessionId, method, ...args]`.
    #[must_use]
    pub fn to_wire(&self) -> Vec<Value> {
        let mut wire = Vec::with_capacity(4 + self.args.len());
        wire.push(Value::String(self.from.clone()));
        wire.push(Value::String(self.to.clone()));
        wire.push(Value::String(self.session_id.clone()));
        wire.push(Value::String(self.method.clone()));
        wire.extend(self.args.iter().cloned());
        wire
    }
}

/// Error codes a poll can complete with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollErrorCode {
    /// No notification arrived before the timer fired (or the entity shut down).
    Timeout,
}

impl PollErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
        }
    }
}

/// The single reply every accepted poll receives.
#[derive(Debug, Clone, PartialEq)]
pub enum PollReply {
    /// A notification was delivered.
    Delivered(Notification),
    /// The poll completed without a notification.
    Failed(PollErrorCode),
}

impl PollReply {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Failed(PollErrorCode::Timeout))
    }

    /// Notification payload, if one was delivered.
    #[must_use]
    pub fn notification_args(&self) -> Option<&NotificationArgs> {
        match self {
            Self::Delivered(notification) => Some(&notification.args),
            Self::Failed(_) => None,
        }
    }
}
