//! Config namespace: YAML settings files and the resolved session configuration.

mod session;
mod settings;

pub use session::{
    DEFAULT_BACKCHANNEL_TIMEOUT_MS, DEFAULT_MAX_MESSAGES_PER_QUEUE, DEFAULT_MAX_SESSIONS,
    SessionConfig,
};
pub use settings::{
    GatewaySettings, RuntimeSettings, SessionSettings, load_runtime_settings,
    load_runtime_settings_from_paths, runtime_settings_paths, set_config_home_override,
};
