//! In-process host engine: drives the session plug around each request and
//! persists checkpoints before committing.

mod checkpoint_store;
mod entity;
mod methods;

pub use checkpoint_store::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use entity::{EntityCheckpoint, EntityHost, EntityMethods, MethodContext};
pub use methods::HelloMethods;
