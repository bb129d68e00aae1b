//! Service-level errors for board operations.

use crate::board::{
    domain::{BoardDomainError, ItemId, LaneId},
    ports::ItemStorageError,
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why one entry of a reorder request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderRejection {
    /// No item with this identifier is known.
    UnknownItem,
    /// Sub-items are ordered per parent, not per lane.
    SubItem,
    /// Archived items are outside every lane ordering.
    Archived,
    /// The item currently sits in another lane.
    InOtherLane(LaneId),
    /// The identifier appears more than once in the request.
    Duplicate,
}

impl fmt::Display for ReorderRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownItem => f.write_str("unknown item"),
            Self::SubItem => f.write_str("item is a sub-item"),
            Self::Archived => f.write_str("item is archived"),
            Self::InOtherLane(lane) => write!(f, "item is in lane '{lane}'"),
            Self::Duplicate => f.write_str("item is listed more than once"),
        }
    }
}

/// One refused entry of a reorder request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedReorderEntry {
    /// Identifier as supplied by the caller.
    pub id: ItemId,
    /// Reason for the refusal.
    pub reason: ReorderRejection,
}

/// Errors surfaced by board services.
#[derive(Debug, Error)]
pub enum BoardServiceError {
    /// Input failed validation; nothing was written.
    #[error(transparent)]
    Validation(#[from] BoardDomainError),

    /// The referenced item or parent does not exist.
    #[error("item not found: {0}")]
    NotFound(ItemId),

    /// A reorder named items that do not belong to the lane.
    #[error("reorder of lane '{lane}' rejected {} item(s)", .rejected.len())]
    ReorderRejected {
        /// Lane being reordered.
        lane: LaneId,
        /// Refused entries with their reasons.
        rejected: Vec<RejectedReorderEntry>,
    },

    /// Deleting an item failed while removing its sub-items; nothing was
    /// removed.
    #[error("cascade delete of item {parent} failed: {cause}")]
    CascadeFailure {
        /// Item whose delete was abandoned.
        parent: ItemId,
        /// Underlying failure.
        cause: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// Storage failed to read or write.
    #[error(transparent)]
    Persistence(ItemStorageError),
}

impl From<ItemStorageError> for BoardServiceError {
    fn from(err: ItemStorageError) -> Self {
        match err {
            ItemStorageError::NotFound(id) => Self::NotFound(id),
            ItemStorageError::CascadeFailure { parent, cause } => {
                Self::CascadeFailure { parent, cause }
            }
            other => Self::Persistence(other),
        }
    }
}

/// Result type for board service operations.
pub type BoardServiceResult<T> = Result<T, BoardServiceError>;
