//! Structured log event ids.

mod session_events;

pub use session_events::SessionEvent;
