//! Long-polling backchannel: pending polls, timers, and notification delivery.
//!
//! Pending polls live in a side table next to the session store, so the
//! persisted records never carry them. `pull` is not transactional and shares
//! only [`SessionState`] with the committing transaction.

mod handle;
mod poll;
mod state;

pub use handle::Backchannel;
pub use poll::PendingReply;
pub(crate) use state::{SessionState, lock_state};
