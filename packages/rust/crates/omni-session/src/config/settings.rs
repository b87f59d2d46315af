//! Runtime settings loader for omni-session.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/settings.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/omni-session/settings.yaml`
//!
//! Merge precedence is user over system.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/settings.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "omni-session/settings.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub gateway: GatewaySettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSettings {
    pub backchannel_timeout_ms: Option<u64>,
    pub max_messages_per_queue: Option<i64>,
    pub max_sessions: Option<usize>,
    pub checkpoint_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewaySettings {
    pub bind: Option<String>,
    pub entity: Option<String>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            session: self.session.merge(overlay.session),
            gateway: self.gateway.merge(overlay.gateway),
        }
    }
}

impl SessionSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            backchannel_timeout_ms: overlay
                .backchannel_timeout_ms
                .or(self.backchannel_timeout_ms),
            max_messages_per_queue: overlay
                .max_messages_per_queue
                .or(self.max_messages_per_queue),
            max_sessions: overlay.max_sessions.or(self.max_sessions),
            checkpoint_dir: overlay.checkpoint_dir.or(self.checkpoint_dir),
        }
    }
}

impl GatewaySettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            bind: overlay.bind.or(self.bind),
            entity: overlay.entity.or(self.entity),
        }
    }
}

/// Load merged runtime settings (user overrides system).
pub fn load_runtime_settings() -> RuntimeSettings {
    let (system_path, user_path) = runtime_settings_paths();
    load_runtime_settings_from_paths(&system_path, &user_path)
}

/// `(system, user)` settings file locations.
#[doc(hidden)]
pub fn runtime_settings_paths() -> (PathBuf, PathBuf) {
    let root = env_path("PRJ_ROOT")
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let config_home = CONFIG_HOME_OVERRIDE
        .get()
        .cloned()
        .or_else(|| env_path("PRJ_CONFIG_HOME"))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_HOME_RELATIVE_PATH));
    (
        root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH),
        root.join(config_home).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH),
    )
}

/// Missing or unreadable files count as empty.
#[doc(hidden)]
pub fn load_runtime_settings_from_paths(system: &Path, user: &Path) -> RuntimeSettings {
    read_settings_file(system).merge(read_settings_file(user))
}

fn read_settings_file(path: &Path) -> RuntimeSettings {
    if !path.is_file() {
        return RuntimeSettings::default();
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(|error| error.to_string())
        .and_then(|raw| serde_yaml::from_str(&raw).map_err(|error| error.to_string()));
    parsed.unwrap_or_else(|error| {
        tracing::warn!(
            path = %path.display(),
            error = %error,
            "ignoring unusable settings file"
        );
        RuntimeSettings::default()
    })
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Set config-home override (used by CLI `--conf`). Relative paths resolve
/// against `PRJ_ROOT` (or the working directory). First call wins.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if let Err(ignored) = CONFIG_HOME_OVERRIDE.set(path) {
        let current = CONFIG_HOME_OVERRIDE.get().cloned().unwrap_or_default();
        if current != ignored {
            tracing::warn!(
                current = %current.display(),
                ignored = %ignored.display(),
                "config home override already set"
            );
        }
    }
}
