use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::envelope::{Envelope, Notification, NotificationArgs, PollErrorCode, PollReply};
use crate::observability::SessionEvent;
use crate::session::SessionStore;

use super::poll::{PendingPoll, PendingReply, ReplySlot, new_slot, send_timeout};

/// Committed sessions of an entity plus the side table of pending polls.
pub(crate) struct SessionState {
    pub(crate) store: SessionStore,
    polls: HashMap<String, PendingPoll>,
    next_poll_id: u64,
    /// Set by [`close`](Self::close); new polls are answered with a timeout right away.
    closed: bool,
}

pub(crate) fn lock_state(shared: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionState {
    pub(crate) fn new(store: SessionStore) -> Self {
        Self {
            store,
            polls: HashMap::new(),
            next_poll_id: 0,
            closed: false,
        }
    }

    pub(crate) fn attached_polls(&self) -> usize {
        self.polls.len()
    }

    pub(crate) fn has_poll(&self, session_id: &str) -> bool {
        self.polls.contains_key(session_id)
    }

    /// Hand `args` to the waiting poll of `session_id`, or queue it.
    pub(crate) fn notify(&mut self, session_id: &str, args: NotificationArgs) {
        let args = match self.polls.remove(session_id) {
            Some(poll) => {
                self.assert_no_backlog(session_id, "notify");
                let poll_id = poll.id;
                match poll.deliver(args) {
                    Ok(()) => {
                        tracing::debug!(
                            event = SessionEvent::BackchannelDelivered.as_str(),
                            session_id,
                            poll_id,
                            "notification delivered to waiting poll"
                        );
                        return;
                    }
                    Err(args) => {
                        tracing::debug!(
                            event = SessionEvent::BackchannelQueued.as_str(),
                            session_id,
                            poll_id,
                            "waiting poll went away; queueing notification"
                        );
                        args
                    }
                }
            }
            None => args,
        };

        let record = self.store.get_or_create(session_id);
        let dropped = record.enqueue(args);
        let queued = record.messages().len();
        tracing::debug!(
            event = SessionEvent::BackchannelQueued.as_str(),
            session_id,
            queued,
            "notification queued"
        );
        if dropped > 0 {
            tracing::debug!(
                event = SessionEvent::BackchannelQueueTrimmed.as_str(),
                session_id,
                dropped,
                limit = record.limit(),
                "oldest notifications dropped"
            );
        }
    }

    pub(crate) fn limit_queue(&mut self, session_id: &str, max: i64) {
        let record = self.store.get_or_create(session_id);
        let dropped = record.set_limit(max);
        if dropped > 0 {
            tracing::debug!(
                event = SessionEvent::BackchannelQueueTrimmed.as_str(),
                session_id,
                dropped,
                limit = max,
                "queue limit lowered; oldest notifications dropped"
            );
        }
    }

    /// Answer `request` with the oldest queued notification, or park it until one
    /// arrives or `timeout` elapses.
    pub(crate) fn pull(
        &mut self,
        request: &Envelope,
        session_id: &str,
        timeout: Duration,
        shared: Weak<Mutex<SessionState>>,
    ) -> PendingReply {
        if self.closed {
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(PollReply::Failed(PollErrorCode::Timeout));
            tracing::debug!(
                event = SessionEvent::BackchannelShutdown.as_str(),
                session_id,
                "backchannel closed; poll answered with timeout"
            );
            return PendingReply::new(rx);
        }
        if let Some(args) = self.store.get_or_create(session_id).pop_front() {
            self.assert_no_poll(session_id);
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(PollReply::Delivered(Notification::tunnel(request, args)));
            tracing::debug!(
                event = SessionEvent::BackchannelDelivered.as_str(),
                session_id,
                "queued notification delivered on pull"
            );
            return PendingReply::new(rx);
        }

        self.next_poll_id += 1;
        let poll_id = self.next_poll_id;
        let (slot, rx) = new_slot();
        let timer = spawn_timer(shared, session_id.to_string(), poll_id, slot.clone(), timeout);
        let poll = PendingPoll {
            id: poll_id,
            request: request.clone(),
            slot,
            timer: Some(timer),
        };
        if let Some(previous) = self.polls.insert(session_id.to_string(), poll) {
            // The superseded poll keeps its own timer and times out on its own.
            tracing::debug!(
                event = SessionEvent::BackchannelPollSuperseded.as_str(),
                session_id,
                poll_id = previous.id,
                superseded_by = poll_id,
                "pending poll superseded"
            );
        }
        tracing::debug!(
            event = SessionEvent::BackchannelPollRegistered.as_str(),
            session_id,
            poll_id,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "poll registered"
        );
        PendingReply::new(rx)
    }

    /// Timer expiry of poll `poll_id`; detaches it only if it is still the attached one.
    fn expire_poll(&mut self, session_id: &str, poll_id: u64, slot: &ReplySlot) {
        let attached = self
            .polls
            .get(session_id)
            .is_some_and(|poll| poll.id == poll_id);
        if attached {
            self.polls.remove(session_id);
        }
        if send_timeout(slot) {
            tracing::debug!(
                event = SessionEvent::BackchannelTimeout.as_str(),
                session_id,
                poll_id,
                attached,
                "poll timed out"
            );
        }
    }

    /// Answer every attached poll with a timeout. Returns how many were answered.
    pub(crate) fn shutdown(&mut self) -> usize {
        let mut answered = 0;
        for (session_id, poll) in self.polls.drain() {
            let poll_id = poll.id;
            if poll.expire() {
                answered += 1;
            }
            tracing::debug!(
                event = SessionEvent::BackchannelShutdown.as_str(),
                session_id = %session_id,
                poll_id,
                "pending poll closed"
            );
        }
        answered
    }

    /// Answer every attached poll and refuse new ones until [`reopen`](Self::reopen).
    pub(crate) fn close(&mut self) -> usize {
        self.closed = true;
        self.shutdown()
    }

    pub(crate) fn reopen(&mut self) {
        self.closed = false;
    }

    fn assert_no_backlog(&self, session_id: &str, op: &str) {
        let backlog = self
            .store
            .get(session_id)
            .map_or(0, |record| record.messages().len());
        assert!(
            backlog == 0,
            "BUG: {op}: session `{session_id}` has {backlog} queued notifications and a waiting poll"
        );
    }

    fn assert_no_poll(&self, session_id: &str) {
        assert!(
            !self.polls.contains_key(session_id),
            "BUG: pull: session `{session_id}` has queued notifications and a waiting poll"
        );
    }
}

fn spawn_timer(
    shared: Weak<Mutex<SessionState>>,
    session_id: String,
    poll_id: u64,
    slot: ReplySlot,
    timeout: Duration,
) -> AbortHandle {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        match shared.upgrade() {
            Some(shared) => lock_state(&shared).expire_poll(&session_id, poll_id, &slot),
            None => {
                send_timeout(&slot);
            }
        }
    })
    .abort_handle()
}
