//! Where entity checkpoints live between restarts.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use super::entity::EntityCheckpoint;

/// Persistence backend for entity checkpoints.
pub trait CheckpointStore: Send + Sync {
    /// Stable backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Last saved checkpoint of `entity_id`, if any.
    fn load(&self, entity_id: &str) -> Result<Option<EntityCheckpoint>>;

    /// Durably replace the checkpoint of `entity_id`.
    fn save(&self, entity_id: &str, checkpoint: &EntityCheckpoint) -> Result<()>;
}

/// Checkpoints kept as JSON text in memory. Survives host restarts within one process.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCheckpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn load(&self, entity_id: &str) -> Result<Option<EntityCheckpoint>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(entity_id)
            .map(|raw| {
                serde_json::from_str(raw)
                    .with_context(|| format!("failed to parse checkpoint of entity `{entity_id}`"))
            })
            .transpose()
    }

    fn save(&self, entity_id: &str, checkpoint: &EntityCheckpoint) -> Result<()> {
        let raw = serde_json::to_string(checkpoint)
            .with_context(|| format!("failed to serialize checkpoint of entity `{entity_id}`"))?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity_id.to_string(), raw);
        Ok(())
    }
}

const ID_DIGEST_HEX_LEN: usize = 12;

fn is_file_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// One JSON file per entity under a directory.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Checkpoint file of `entity_id`.
    ///
    /// Ids made only of `[A-Za-z0-9._-]` are used as is. Other ids have those
    /// characters replaced by `_` and get an `@<digest>` suffix, so distinct ids
    /// never share a file.
    #[must_use]
    pub fn path_for(&self, entity_id: &str) -> PathBuf {
        if !entity_id.is_empty() && entity_id.chars().all(is_file_safe) {
            return self.dir.join(format!("{entity_id}.json"));
        }
        let file_stem: String = entity_id
            .chars()
            .map(|c| if is_file_safe(c) { c } else { '_' })
            .collect();
        let digest = hex::encode(Sha256::digest(entity_id.as_bytes()));
        self.dir
            .join(format!("{file_stem}@{}.json", &digest[..ID_DIGEST_HEX_LEN]))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn load(&self, entity_id: &str) -> Result<Option<EntityCheckpoint>> {
        let path = self.path_for(entity_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read checkpoint file {}", path.display()))?;
        let checkpoint = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse checkpoint file {}", path.display()))?;
        Ok(Some(checkpoint))
    }

    fn save(&self, entity_id: &str, checkpoint: &EntityCheckpoint) -> Result<()> {
        let raw = serde_json::to_string_pretty(checkpoint)
            .with_context(|| format!("failed to serialize checkpoint of entity `{entity_id}`"))?;
        atomic_write_text(&self.path_for(entity_id), &raw)
    }
}

/// Write to a temp file next to `path`, fsync, then rename into place.
fn atomic_write_text(path: &Path, content: &str) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create checkpoint directory {}", parent.display()))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("checkpoint.json");
    let temp_path = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let mut temp_file = std::fs::File::create(&temp_path)
        .with_context(|| format!("failed to create temporary file {}", temp_path.display()))?;
    temp_file
        .write_all(content.as_bytes())
        .with_context(|| format!("failed to write temporary file {}", temp_path.display()))?;
    temp_file
        .sync_all()
        .with_context(|| format!("failed to fsync temporary file {}", temp_path.display()))?;

    std::fs::rename(&temp_path, path).with_context(|| {
        format!(
            "failed to rename temporary file {} to {}",
            temp_path.display(),
            path.display()
        )
    })
}
