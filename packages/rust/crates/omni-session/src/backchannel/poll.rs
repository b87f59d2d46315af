use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::envelope::{Envelope, Notification, NotificationArgs, PollErrorCode, PollReply};

/// Where a poll's single reply goes. Shared with the poll's own timer task.
pub(crate) type ReplySlot = Arc<Mutex<Option<oneshot::Sender<PollReply>>>>;

/// A poll request waiting for the next notification of its session.
pub(crate) struct PendingPoll {
    pub(crate) id: u64,
    pub(crate) request: Envelope,
    pub(crate) slot: ReplySlot,
    pub(crate) timer: Option<AbortHandle>,
}

impl PendingPoll {
    /// Deliver `args` through this poll; hands them back if nobody is listening anymore.
    pub(crate) fn deliver(mut self, args: NotificationArgs) -> Result<(), NotificationArgs> {
        self.cancel_timer();
        let Some(sender) = take_sender(&self.slot) else {
            return Err(args);
        };
        let reply = PollReply::Delivered(Notification::tunnel(&self.request, args));
        sender.send(reply).map_err(|reply| match reply {
            PollReply::Delivered(notification) => notification.args,
            PollReply::Failed(_) => Vec::new(),
        })
    }

    /// Answer with a timeout right away.
    pub(crate) fn expire(mut self) -> bool {
        self.cancel_timer();
        send_timeout(&self.slot)
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

pub(crate) fn new_slot() -> (ReplySlot, oneshot::Receiver<PollReply>) {
    let (tx, rx) = oneshot::channel();
    (Arc::new(Mutex::new(Some(tx))), rx)
}

pub(crate) fn send_timeout(slot: &ReplySlot) -> bool {
    take_sender(slot)
        .is_some_and(|sender| sender.send(PollReply::Failed(PollErrorCode::Timeout)).is_ok())
}

fn take_sender(slot: &ReplySlot) -> Option<oneshot::Sender<PollReply>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// The eventual reply of an accepted poll.
///
/// Always awaited, even when a queued notification was available at pull time.
#[derive(Debug)]
pub struct PendingReply {
    rx: oneshot::Receiver<PollReply>,
}

impl PendingReply {
    pub(crate) fn new(rx: oneshot::Receiver<PollReply>) -> Self {
        Self { rx }
    }

    /// Wait for the notification or the timeout.
    pub async fn recv(self) -> PollReply {
        self.rx
            .await
            .unwrap_or(PollReply::Failed(PollErrorCode::Timeout))
    }
}
