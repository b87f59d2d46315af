/// Stable `event` field values attached to every `tracing` record of the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    SessionCreated,
    SessionEvicted,
    JournalBegan,
    JournalPrepared,
    JournalCommitted,
    JournalAborted,
    JournalResumed,
    BackchannelQueued,
    BackchannelDelivered,
    BackchannelPollRegistered,
    BackchannelPollSuperseded,
    BackchannelTimeout,
    BackchannelShutdown,
    BackchannelQueueTrimmed,
    ProtocolBegin,
    ProtocolEnd,
    ProtocolNonceMismatch,
    HostOpened,
    HostCheckpointSaved,
    HostCheckpointFailed,
    HostInvokeFailed,
    GatewayStarted,
    GatewayStopped,
}

impl SessionEvent {
    pub const ALL: [Self; 23] = [
        Self::SessionCreated,
        Self::SessionEvicted,
        Self::JournalBegan,
        Self::JournalPrepared,
        Self::JournalCommitted,
        Self::JournalAborted,
        Self::JournalResumed,
        Self::BackchannelQueued,
        Self::BackchannelDelivered,
        Self::BackchannelPollRegistered,
        Self::BackchannelPollSuperseded,
        Self::BackchannelTimeout,
        Self::BackchannelShutdown,
        Self::BackchannelQueueTrimmed,
        Self::ProtocolBegin,
        Self::ProtocolEnd,
        Self::ProtocolNonceMismatch,
        Self::HostOpened,
        Self::HostCheckpointSaved,
        Self::HostCheckpointFailed,
        Self::HostInvokeFailed,
        Self::GatewayStarted,
        Self::GatewayStopped,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SessionCreated => "session.created",
            Self::SessionEvicted => "session.evicted",
            Self::JournalBegan => "journal.began",
            Self::JournalPrepared => "journal.prepared",
            Self::JournalCommitted => "journal.committed",
            Self::JournalAborted => "journal.aborted",
            Self::JournalResumed => "journal.resumed",
            Self::BackchannelQueued => "backchannel.queued",
            Self::BackchannelDelivered => "backchannel.delivered",
            Self::BackchannelPollRegistered => "backchannel.poll.registered",
            Self::BackchannelPollSuperseded => "backchannel.poll.superseded",
            Self::BackchannelTimeout => "backchannel.poll.timeout",
            Self::BackchannelShutdown => "backchannel.shutdown",
            Self::BackchannelQueueTrimmed => "backchannel.queue.trimmed",
            Self::ProtocolBegin => "protocol.begin",
            Self::ProtocolEnd => "protocol.end",
            Self::ProtocolNonceMismatch => "protocol.nonce_mismatch",
            Self::HostOpened => "host.opened",
            Self::HostCheckpointSaved => "host.checkpoint.saved",
            Self::HostCheckpointFailed => "host.checkpoint.failed",
            Self::HostInvokeFailed => "host.invoke.failed",
            Self::GatewayStarted => "gateway.started",
            Self::GatewayStopped => "gateway.stopped",
        }
    }
}
