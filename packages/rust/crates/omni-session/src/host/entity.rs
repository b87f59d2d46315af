use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::backchannel::{Backchannel, PendingReply};
use crate::config::SessionConfig;
use crate::envelope::Envelope;
use crate::error::{InvokeError, SessionError};
use crate::journal::Checkpoint;
use crate::observability::SessionEvent;
use crate::plug::{SessionPlug, TransactionalPlug};
use crate::proxy::SessionProxy;
use crate::session::SessionSnapshot;

use super::checkpoint_store::CheckpointStore;

/// Everything persisted for one entity: its own state plus the session plug checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityCheckpoint {
    #[serde(default)]
    pub state: Value,
    #[serde(default)]
    pub session: Checkpoint,
}

/// What a method sees while it runs: a scratch copy of the entity state and the session surface.
pub struct MethodContext<'a> {
    pub state: &'a mut Value,
    pub session: SessionProxy<'a>,
}

/// Business logic of an entity.
pub trait EntityMethods: Send + Sync {
    /// State of a freshly created entity.
    fn initial_state(&self) -> Value {
        Value::Null
    }

    /// Run `method`. An error aborts the transaction; a [`SessionError`] inside
    /// the chain is reported as a protocol error.
    fn invoke(&self, ctx: &mut MethodContext<'_>, method: &str, args: &[Value]) -> Result<Value>;
}

struct EntityCore {
    plug: SessionPlug,
    state: Value,
}

/// One stateful entity with a single writer and a non-transactional `pull` path.
pub struct EntityHost {
    id: String,
    core: Mutex<EntityCore>,
    backchannel: Backchannel,
    methods: Arc<dyn EntityMethods>,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl EntityHost {
    /// Resume `id` from its last checkpoint, or start it fresh.
    pub fn open(
        id: impl Into<String>,
        config: SessionConfig,
        methods: Arc<dyn EntityMethods>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Result<Self> {
        let id = id.into();
        let mut plug = SessionPlug::new(config);
        let loaded = checkpoints
            .load(&id)
            .with_context(|| format!("failed to load checkpoint of entity `{id}`"))?;
        let resumed = loaded.is_some();
        let state = match loaded {
            Some(EntityCheckpoint { state, session }) => {
                plug.resume(session)
                    .with_context(|| format!("failed to resume entity `{id}`"))?;
                state
            }
            None => {
                plug.init();
                methods.initial_state()
            }
        };
        tracing::info!(
            event = SessionEvent::HostOpened.as_str(),
            entity = %id,
            backend = checkpoints.backend_name(),
            resumed,
            "entity opened"
        );
        let backchannel = plug.backchannel();
        Ok(Self {
            id,
            core: Mutex::new(EntityCore { plug, state }),
            backchannel,
            methods,
            checkpoints,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn backchannel(&self) -> &Backchannel {
        &self.backchannel
    }

    /// Process one request as a transaction.
    pub async fn invoke(&self, msg: &Envelope) -> Result<Value, InvokeError> {
        let mut guard = self.core.lock().await;
        let core = &mut *guard;
        core.plug.begin(msg)?;

        let mut state = core.state.clone();
        let outcome = match core.plug.proxy() {
            Ok(session) => {
                let mut ctx = MethodContext {
                    state: &mut state,
                    session,
                };
                self.methods
                    .invoke(&mut ctx, &msg.method, &msg.args)
                    .map_err(|error| InvokeError::from_method(&msg.method, error))
            }
            Err(error) => Err(error.into()),
        };
        let result = match outcome {
            Ok(result) => result,
            Err(error) => {
                core.plug.abort();
                tracing::warn!(
                    event = SessionEvent::HostInvokeFailed.as_str(),
                    entity = %self.id,
                    method = %msg.method,
                    error = %error,
                    "request aborted"
                );
                return Err(error);
            }
        };

        let session = match core.plug.prepare() {
            Ok(session) => session,
            Err(error) => {
                core.plug.abort();
                return Err(error.into());
            }
        };
        let intents = session.journal.len();
        let checkpoint = EntityCheckpoint {
            state: state.clone(),
            session,
        };
        if let Err(error) = self.save_checkpoint(checkpoint).await {
            core.plug.abort();
            let rendered = format!("{error:#}");
            tracing::error!(
                event = SessionEvent::HostCheckpointFailed.as_str(),
                entity = %self.id,
                backend = self.checkpoints.backend_name(),
                error = %rendered,
                "checkpoint save failed; request aborted"
            );
            return Err(InvokeError::Persistence(error));
        }
        tracing::debug!(
            event = SessionEvent::HostCheckpointSaved.as_str(),
            entity = %self.id,
            intents,
            "checkpoint saved"
        );

        core.plug.commit()?;
        core.state = state;
        Ok(result)
    }

    /// Backends may block on disk I/O, so the save runs on the blocking pool.
    async fn save_checkpoint(&self, checkpoint: EntityCheckpoint) -> Result<()> {
        let store = Arc::clone(&self.checkpoints);
        let id = self.id.clone();
        tokio::task::spawn_blocking(move || store.save(&id, &checkpoint))
            .await
            .context("checkpoint save task failed")?
    }

    /// Long-poll for the caller's next notification. Does not wait for the entity lock.
    pub fn pull(&self, msg: &Envelope) -> Result<PendingReply, SessionError> {
        self.backchannel.pull(msg)
    }

    /// Committed entity state.
    pub async fn state(&self) -> Value {
        self.core.lock().await.state.clone()
    }

    /// Committed session records.
    pub async fn sessions(&self) -> SessionSnapshot {
        self.core.lock().await.plug.committed()
    }

    /// Abort anything in flight and answer every waiting poll.
    pub async fn shutdown(&self) {
        self.core.lock().await.plug.shutdown();
    }
}
