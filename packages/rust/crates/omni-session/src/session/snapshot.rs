//! Ordered `id → record` map used inside checkpoints.
//!
//! Serialized as a JSON object; entry order is the store's creation order and is
//! kept on the way back in.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::record::SessionRecord;

/// Creation-ordered copy of every session record of an entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    entries: Vec<(String, SessionRecord)>,
}

impl SessionSnapshot {
    pub(crate) fn from_entries(entries: Vec<(String, SessionRecord)>) -> Self {
        Self { entries }
    }

    pub(crate) fn into_entries(self) -> Vec<(String, SessionRecord)> {
        self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SessionRecord> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, record)| record)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }
}

impl Serialize for SessionSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, record) in &self.entries {
            map.serialize_entry(id, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SessionSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = SessionSnapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of session id to session record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, SessionRecord)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, record)) = access.next_entry::<String, SessionRecord>()? {
                    if let Some(slot) = entries.iter_mut().find(|(known, _)| *known == id) {
                        slot.1 = record;
                    } else {
                        entries.push((id, record));
                    }
                }
                Ok(SessionSnapshot { entries })
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}
