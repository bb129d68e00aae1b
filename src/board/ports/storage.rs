//! Storage collaborator port for board items.

use crate::board::domain::{Item, ItemId, LaneId, OrderAssignment, OrderScope};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for item storage operations.
pub type ItemStorageResult<T> = Result<T, ItemStorageError>;

/// Which items a query considers by position in the item hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PlacementFilter {
    /// Top-level items only.
    #[default]
    TopLevel,
    /// Sub-items owned by any of the given parents.
    SubItemsOf(Vec<ItemId>),
    /// Every item.
    Any,
}

/// Filter for [`ItemStorage::find`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    /// Hierarchy filter.
    pub placement: PlacementFilter,
    /// Restrict to one lane.
    pub lane: Option<LaneId>,
    /// Restrict to items carrying at least one of these tags.
    pub tags: Vec<String>,
    /// Include archived items.
    pub include_archived: bool,
}

impl ItemQuery {
    /// Matches non-archived top-level items.
    #[must_use]
    pub fn top_level() -> Self {
        Self::default()
    }

    /// Matches non-archived sub-items of the given parents.
    #[must_use]
    pub fn sub_items_of(parents: impl IntoIterator<Item = ItemId>) -> Self {
        Self {
            placement: PlacementFilter::SubItemsOf(parents.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Matches the non-archived members of an order partition.
    #[must_use]
    pub fn partition(scope: &OrderScope) -> Self {
        match scope {
            OrderScope::Lane(lane) => Self::top_level().in_lane(lane.clone()),
            OrderScope::SubItems(parent_id) => Self::sub_items_of([*parent_id]),
        }
    }

    /// Restricts to one lane.
    #[must_use]
    pub fn in_lane(mut self, lane: LaneId) -> Self {
        self.lane = Some(lane);
        self
    }

    /// Restricts to items carrying any of the given tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    /// Includes archived items.
    #[must_use]
    pub fn including_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    /// Returns whether an item satisfies every filter.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        let placement_matches = match &self.placement {
            PlacementFilter::TopLevel => !item.is_sub_item(),
            PlacementFilter::SubItemsOf(parents) => {
                item.parent_id().is_some_and(|parent| parents.contains(&parent))
            }
            PlacementFilter::Any => true,
        };
        let lane_matches = self
            .lane
            .as_ref()
            .is_none_or(|lane| item.lane() == Some(lane));
        let archive_matches = self.include_archived || !item.is_archived();
        placement_matches && lane_matches && archive_matches && self.matches_tags(item)
    }

    /// Returns whether an item satisfies the tag filter alone.
    #[must_use]
    pub fn matches_tags(&self, item: &Item) -> bool {
        self.tags.is_empty() || self.tags.iter().any(|tag| item.tags().contains(tag))
    }
}

/// Outcome of a scoped batch order write.
///
/// `matched` counts requested items found in the declared scope; `modified`
/// counts those whose key actually changed. A `matched` count below the
/// request size means some items had left the scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOrderCounts {
    /// Items found in the declared scope.
    pub matched: u64,
    /// Items whose order key changed.
    pub modified: u64,
}

impl BatchOrderCounts {
    /// Returns whether fewer items matched than were requested.
    #[must_use]
    pub fn is_partial(&self, requested: usize) -> bool {
        u64::try_from(requested).map_or(true, |requested| self.matched < requested)
    }
}

/// Document-style persistence contract for board items.
///
/// No write returns before it is durable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemStorage: Send + Sync {
    /// Waits until the storage accepts operations.
    ///
    /// # Errors
    ///
    /// Returns [`ItemStorageError::NotReady`] when `timeout` elapses first.
    async fn wait_until_ready(&self, timeout: Duration) -> ItemStorageResult<()>;

    /// Inserts a new item.
    ///
    /// # Errors
    ///
    /// Returns [`ItemStorageError::DuplicateItem`] when the identifier exists.
    async fn insert(&self, item: &Item) -> ItemStorageResult<()>;

    /// Finds an item by identifier.
    ///
    /// Returns `None` when the item does not exist.
    async fn find_by_id(&self, id: ItemId) -> ItemStorageResult<Option<Item>>;

    /// Returns matching items sorted by order key, then creation time.
    async fn find(&self, query: &ItemQuery) -> ItemStorageResult<Vec<Item>>;

    /// Replaces a stored item with the given state.
    ///
    /// # Errors
    ///
    /// Returns [`ItemStorageError::NotFound`] when the item does not exist.
    async fn replace(&self, item: &Item) -> ItemStorageResult<()>;

    /// Deletes an item together with its sub-items in one atomic step and
    /// returns the number of items removed.
    ///
    /// # Errors
    ///
    /// Returns [`ItemStorageError::NotFound`] when the item does not exist and
    /// [`ItemStorageError::CascadeFailure`] when the sub-item removal fails,
    /// in which case nothing is removed.
    async fn delete_cascade(&self, id: ItemId) -> ItemStorageResult<u64>;

    /// Writes order keys for the assignments whose item currently belongs to
    /// `scope`; other assignments are skipped.
    async fn bulk_set_order(
        &self,
        scope: &OrderScope,
        assignments: &[OrderAssignment],
        updated_at: DateTime<Utc>,
    ) -> ItemStorageResult<BatchOrderCounts>;

    /// Returns every distinct tag in storage.
    async fn distinct_tags(&self) -> ItemStorageResult<BTreeSet<String>>;
}

/// Errors returned by item storage implementations.
#[derive(Debug, Clone, Error)]
pub enum ItemStorageError {
    /// An item with the same identifier already exists.
    #[error("duplicate item identifier: {0}")]
    DuplicateItem(ItemId),

    /// The item was not found.
    #[error("item not found: {0}")]
    NotFound(ItemId),

    /// Storage did not become ready in time.
    #[error("storage not ready after {0:?}")]
    NotReady(Duration),

    /// Removing the sub-items of a deleted item failed; the delete was
    /// abandoned as a whole.
    #[error("cascade delete of item {parent} failed: {cause}")]
    CascadeFailure {
        /// Item whose delete was abandoned.
        parent: ItemId,
        /// Underlying failure.
        cause: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ItemStorageError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Wraps a failure of the sub-item half of a cascade delete.
    pub fn cascade(parent: ItemId, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::CascadeFailure {
            parent,
            cause: Arc::new(err),
        }
    }
}
