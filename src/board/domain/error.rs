//! Error types for board domain validation.

use super::ItemId;
use thiserror::Error;

/// Validation errors raised while constructing or mutating board values.
///
/// Every variant is reported to the caller before any write is issued.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BoardDomainError {
    /// The item title is empty after trimming.
    #[error("item title must not be empty")]
    EmptyTitle,

    /// The item title exceeds the maximum title length.
    #[error("item title is {length} characters long; the limit is {max}")]
    TitleTooLong {
        /// Length of the trimmed title in characters.
        length: usize,
        /// Maximum permitted length in characters.
        max: usize,
    },

    /// The lane identifier is empty, contains whitespace, or is longer
    /// than [`super::MAX_LANE_LENGTH`] characters.
    #[error("invalid lane identifier '{0}'")]
    InvalidLaneId(String),

    /// The lane is not a member of the configured lane set.
    #[error("unknown lane '{0}'")]
    UnknownLane(String),

    /// A lane set must contain at least one lane.
    #[error("a board needs at least one lane")]
    EmptyLaneSet,

    /// The same lane was configured twice.
    #[error("lane '{0}' is configured more than once")]
    DuplicateLane(String),

    /// A tag exceeds the maximum tag length.
    #[error("tag '{tag}' exceeds {max} characters")]
    TagTooLong {
        /// Offending tag after trimming.
        tag: String,
        /// Maximum permitted length in characters.
        max: usize,
    },

    /// An order key supplied on the wire is negative or too large.
    #[error("order {0} is not a valid non-negative order key")]
    InvalidOrder(i64),

    /// An item references itself as its parent.
    #[error("item {0} cannot be its own parent")]
    SelfParent(ItemId),

    /// Sub-items cannot own sub-items of their own.
    #[error("item {0} is a sub-item and cannot own sub-items")]
    NestedSubItem(ItemId),

    /// A patch field is not legal for the kind of item it targets.
    #[error("field '{field}' cannot be updated on {kind}")]
    FieldNotAllowed {
        /// Wire name of the rejected field.
        field: &'static str,
        /// Human-readable item kind.
        kind: &'static str,
    },

    /// Lanes only apply to top-level items.
    #[error("item {0} is a sub-item and has no lane")]
    SubItemsHaveNoLane(ItemId),

    /// Completion only applies to sub-items.
    #[error("item {0} is not a sub-item")]
    NotASubItem(ItemId),

    /// Archived items are outside every lane ordering.
    #[error("item {0} is archived and cannot be moved")]
    ArchivedItemCannotMove(ItemId),

    /// A reorder request carried no items.
    #[error("reorder requests must name at least one item")]
    EmptyReorder,

    /// A wire payload could not be decoded.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}
