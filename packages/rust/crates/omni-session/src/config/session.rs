use std::time::Duration;

use anyhow::{Context, Result, bail};

use super::settings::SessionSettings;

pub const DEFAULT_BACKCHANNEL_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_MESSAGES_PER_QUEUE: i64 = 100;
pub const DEFAULT_MAX_SESSIONS: usize = 1_024;

const ENV_BACKCHANNEL_TIMEOUT_MS: &str = "OMNI_SESSION_BACKCHANNEL_TIMEOUT_MS";
const ENV_MAX_MESSAGES_PER_QUEUE: &str = "OMNI_SESSION_MAX_MESSAGES_PER_QUEUE";
const ENV_MAX_SESSIONS: &str = "OMNI_SESSION_MAX_SESSIONS";

/// Resolved configuration of one entity's session plug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a poll waits before it is answered with a timeout.
    pub backchannel_timeout_ms: u64,
    /// Default queue bound of new sessions; `<= 0` means unbounded.
    pub max_messages_per_queue: i64,
    /// Soft cap on the number of sessions per entity.
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backchannel_timeout_ms: DEFAULT_BACKCHANNEL_TIMEOUT_MS,
            max_messages_per_queue: DEFAULT_MAX_MESSAGES_PER_QUEUE,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl SessionConfig {
    /// Settings file values, overridden by `OMNI_SESSION_*` environment variables.
    pub fn resolve(settings: &SessionSettings) -> Result<Self> {
        Self::resolve_with(settings, |name| std::env::var(name).ok())
    }

    #[doc(hidden)]
    pub fn resolve_with(
        settings: &SessionSettings,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let backchannel_timeout_ms = parse_override(&env, ENV_BACKCHANNEL_TIMEOUT_MS)?
            .or(settings.backchannel_timeout_ms)
            .unwrap_or(DEFAULT_BACKCHANNEL_TIMEOUT_MS);
        let max_messages_per_queue = parse_override(&env, ENV_MAX_MESSAGES_PER_QUEUE)?
            .or(settings.max_messages_per_queue)
            .unwrap_or(DEFAULT_MAX_MESSAGES_PER_QUEUE);
        let max_sessions = parse_override(&env, ENV_MAX_SESSIONS)?
            .or(settings.max_sessions)
            .unwrap_or(DEFAULT_MAX_SESSIONS);

        let config = Self {
            backchannel_timeout_ms,
            max_messages_per_queue,
            max_sessions,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backchannel_timeout_ms == 0 {
            bail!("backchannel timeout must be greater than 0 ms");
        }
        if self.max_sessions == 0 {
            bail!("max sessions must be greater than 0");
        }
        Ok(())
    }

    #[must_use]
    pub fn backchannel_timeout(&self) -> Duration {
        Duration::from_millis(self.backchannel_timeout_ms)
    }
}

fn parse_override<T>(env: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(raw) = env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .with_context(|| format!("invalid value for {name}: `{raw}`"))
}
