use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::envelope::{Envelope, NotificationArgs};
use crate::error::SessionError;

use super::poll::PendingReply;
use super::state::{SessionState, lock_state};

/// Network-facing side of the session plug. Cheap to clone.
///
/// `pull` bypasses the transaction journal and may run while a transaction of the
/// same entity is in flight.
#[derive(Clone)]
pub struct Backchannel {
    shared: Arc<Mutex<SessionState>>,
    timeout: Duration,
}

impl Backchannel {
    pub(crate) fn new(shared: Arc<Mutex<SessionState>>, timeout: Duration) -> Self {
        Self { shared, timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll for the next notification of the request's session with the configured timeout.
    ///
    /// Must be called from within a tokio runtime.
    pub fn pull(&self, request: &Envelope) -> Result<PendingReply, SessionError> {
        self.pull_with_timeout(request, self.timeout)
    }

    pub fn pull_with_timeout(
        &self,
        request: &Envelope,
        timeout: Duration,
    ) -> Result<PendingReply, SessionError> {
        let session_id = request.require_session_id()?;
        let weak = Arc::downgrade(&self.shared);
        let mut state = lock_state(&self.shared);
        Ok(state.pull(request, session_id, timeout, weak))
    }

    /// Number of sessions with a poll waiting.
    #[must_use]
    pub fn attached_polls(&self) -> usize {
        lock_state(&self.shared).attached_polls()
    }

    #[must_use]
    pub fn has_poll(&self, session_id: &str) -> bool {
        lock_state(&self.shared).has_poll(session_id)
    }

    /// Committed pending queue of `session_id`.
    #[must_use]
    pub fn queued(&self, session_id: &str) -> Vec<NotificationArgs> {
        lock_state(&self.shared)
            .store
            .get(session_id)
            .map(|record| record.outq())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        lock_state(&self.shared).store.len()
    }
}
