//! Client state stores.
//!
//! Independent state slices with `get_state` / `set_state` / `subscribe`.
//! Persisted slices rehydrate from a [`Storage`] at construction and write
//! back on every mutation.

mod slice;
mod slices;
mod storage;

pub use slice::{Persist, STORAGE_PREFIX, StateStream, StateWatchStream, Store};
pub use slices::{ModalKind, ModalState, ProfileSnapshot, ProfileState, ProtocolState};
pub use storage::{FileStorage, MemoryStorage, Storage};
