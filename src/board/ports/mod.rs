//! Port contracts for board persistence.
//!
//! Ports define infrastructure-agnostic interfaces used by board services.

pub mod storage;

pub use storage::{
    BatchOrderCounts, ItemQuery, ItemStorage, ItemStorageError, ItemStorageResult,
    PlacementFilter,
};
