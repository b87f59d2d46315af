//! Session namespace: per-session record, ordered store with eviction, and session selectors.

mod record;
mod selector;
mod snapshot;
mod store;

pub use record::SessionRecord;
pub use selector::SessionSelector;
pub use snapshot::SessionSnapshot;
pub use store::SessionStore;
