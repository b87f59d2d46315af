//! Serializable `{sessions, journal}` snapshot produced by `prepare`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionError;
use crate::session::SessionSnapshot;

use super::intent::Intent;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Committed session records; never includes pending polls.
    #[serde(default)]
    pub sessions: SessionSnapshot,
    /// Intents of the transaction being committed, replayed by `resume`.
    #[serde(default)]
    pub journal: Vec<Intent>,
}

impl Checkpoint {
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_value(&self) -> Result<Value, SessionError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_value(value: Value) -> Result<Self, SessionError> {
        Ok(serde_json::from_value(value)?)
    }
}
