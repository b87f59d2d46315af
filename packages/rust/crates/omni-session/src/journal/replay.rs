use crate::backchannel::SessionState;

use super::intent::Intent;

/// Apply one intent to committed state. Shared by `commit` and `resume`.
pub(crate) fn apply(intent: &Intent, state: &mut SessionState) {
    match intent {
        Intent::Notify { session_id, args } => state.notify(session_id, args.clone()),
        Intent::LimitQueue { session_id, max } => state.limit_queue(session_id, *max),
        Intent::Begin { session_id, nonce } => {
            state.store.get_or_create(session_id).set_nonce(nonce.clone());
        }
        Intent::End { session_id } => state.store.get_or_create(session_id).clear_persistent(),
        Intent::Remember {
            session_id,
            memento,
        } => state
            .store
            .get_or_create(session_id)
            .set_memento(memento.clone()),
    }
}

/// Apply `intents` in order; returns how many were applied.
pub(crate) fn replay(intents: &[Intent], state: &mut SessionState) -> usize {
    for intent in intents {
        apply(intent, state);
    }
    intents.len()
}
