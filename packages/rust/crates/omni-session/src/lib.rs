//! Transactional logical sessions for stateful entities.
//!
//! - **Sessions**: per-client notification queues with bounds, an exactly-once
//!   nonce/memento protocol, and eviction under a soft session cap.
//! - **Journal**: every mutation made while handling a request is an intent,
//!   applied on commit, dropped on abort, replayed on resume.
//! - **Backchannel**: long polls answered by the next notification or a timeout.
//! - **Host/Gateway**: an in-process entity engine with checkpoint persistence,
//!   served over HTTP.

#![allow(missing_docs)]

mod backchannel;
mod config;
mod envelope;
mod error;
mod gateway;
mod host;
mod journal;
mod observability;
mod plug;
mod protocol;
mod proxy;
mod session;

pub use backchannel::{Backchannel, PendingReply};
pub use config::{
    DEFAULT_BACKCHANNEL_TIMEOUT_MS, DEFAULT_MAX_MESSAGES_PER_QUEUE, DEFAULT_MAX_SESSIONS,
    GatewaySettings, RuntimeSettings, SessionConfig, SessionSettings, load_runtime_settings,
    load_runtime_settings_from_paths, runtime_settings_paths, set_config_home_override,
};
pub use envelope::{Envelope, Notification, NotificationArgs, PollErrorCode, PollReply};
pub use error::{InvokeError, SessionError};
pub use gateway::{
    ErrorBody, GatewayHealthResponse, GatewayState, InvokeResponse, PullResponse, router,
    run_http,
};
pub use host::{
    CheckpointStore, EntityCheckpoint, EntityHost, EntityMethods, FileCheckpointStore,
    HelloMethods, MemoryCheckpointStore, MethodContext,
};
pub use journal::{Checkpoint, Intent, TransactionJournal, TxContext, TxPhase};
pub use observability::SessionEvent;
pub use plug::{SessionPlug, TransactionalPlug};
pub use protocol::{BeginOutcome, NONCE_BYTES, generate_nonce};
pub use proxy::SessionProxy;
pub use session::{SessionRecord, SessionSelector, SessionSnapshot, SessionStore};
