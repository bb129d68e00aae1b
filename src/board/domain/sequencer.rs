//! Order key computation for lane and sub-item partitions.
//!
//! Every function here is pure: callers pass the current ordering and get
//! back the assignments to persist. Reordering always renumbers densely from
//! zero, so the resulting keys depend only on input position.

use super::ItemId;
use serde::{Deserialize, Serialize};

/// Order key assigned to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderAssignment {
    /// Item receiving the key.
    pub id: ItemId,
    /// Zero-based position within the partition.
    pub order: u32,
}

impl OrderAssignment {
    /// Creates an assignment.
    #[must_use]
    pub const fn new(id: ItemId, order: u32) -> Self {
        Self { id, order }
    }
}

/// Returns the key that appends after `existing`: one past the maximum, or
/// zero for an empty partition.
#[must_use]
pub fn append_order(existing: impl IntoIterator<Item = u32>) -> u32 {
    existing
        .into_iter()
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// Assigns dense keys `0..n` following the order of `ids`.
#[must_use]
pub fn reorder(ids: &[ItemId]) -> Vec<OrderAssignment> {
    (0_u32..)
        .zip(ids)
        .map(|(order, id)| OrderAssignment::new(*id, order))
        .collect()
}

/// Moves `moving` to sit immediately before `before` and renumbers.
///
/// `moving` is removed from `current` first when present. When `before` is
/// `None`, absent from `current`, or equal to `moving`, the item goes to the
/// end.
#[must_use]
pub fn insert_at(current: &[ItemId], moving: ItemId, before: Option<ItemId>) -> Vec<OrderAssignment> {
    let mut sequence: Vec<ItemId> = current.iter().copied().filter(|id| *id != moving).collect();
    let position = before
        .and_then(|anchor| sequence.iter().position(|id| *id == anchor))
        .unwrap_or(sequence.len());
    sequence.insert(position, moving);
    reorder(&sequence)
}

/// Returns the key assigned to `id`, if any.
#[must_use]
pub fn order_of(assignments: &[OrderAssignment], id: ItemId) -> Option<u32> {
    assignments
        .iter()
        .find(|assignment| assignment.id == id)
        .map(|assignment| assignment.order)
}
