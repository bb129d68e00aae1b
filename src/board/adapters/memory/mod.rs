//! In-memory adapters for board ports.

mod storage;

pub use storage::InMemoryItemStorage;
