//! Authoritative item collection over the storage collaborator.
//!
//! [`ItemStore`] applies the item lifecycle rules (default lane, append
//! order, allow-listed updates) and gates every operation on storage
//! readiness. It performs no optimistic caching; see
//! [`super::BoardCache`] for that.

use super::{
    error::{BoardServiceError, BoardServiceResult},
    requests::{AddSubItemRequest, CreateItemRequest, ItemFilter},
};
use crate::board::{
    domain::{
        BoardConfig, Item, ItemDraft, ItemId, ItemPatch, LaneSet, OrderAssignment, OrderScope,
        Tags, sequencer,
    },
    ports::{BatchOrderCounts, ItemQuery, ItemStorage},
};
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Item lifecycle operations over an [`ItemStorage`].
pub struct ItemStore<S, C>
where
    S: ItemStorage,
    C: Clock + Send + Sync,
{
    storage: Arc<S>,
    clock: Arc<C>,
    lanes: LaneSet,
    ready_timeout: Duration,
    ready: Arc<OnceCell<()>>,
}

impl<S, C> Clone for ItemStore<S, C>
where
    S: ItemStorage,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            clock: Arc::clone(&self.clock),
            lanes: self.lanes.clone(),
            ready_timeout: self.ready_timeout,
            ready: Arc::clone(&self.ready),
        }
    }
}

impl<S, C> ItemStore<S, C>
where
    S: ItemStorage,
    C: Clock + Send + Sync,
{
    /// Creates a store for the lanes and timeout in `config`.
    #[must_use]
    pub fn new(storage: Arc<S>, clock: Arc<C>, config: &BoardConfig) -> Self {
        Self {
            storage,
            clock,
            lanes: config.lanes.clone(),
            ready_timeout: config.storage_ready_timeout,
            ready: Arc::new(OnceCell::new()),
        }
    }

    /// Returns the configured lanes.
    #[must_use]
    pub const fn lanes(&self) -> &LaneSet {
        &self.lanes
    }

    /// Returns the clock used to stamp mutations.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Waits once for storage readiness; later calls return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Persistence`] when storage is not ready
    /// within the configured timeout. A later call probes again.
    pub async fn ensure_ready(&self) -> BoardServiceResult<()> {
        self.ready
            .get_or_try_init(|| async {
                tracing::debug!(timeout = ?self.ready_timeout, "waiting for item storage");
                self.storage.wait_until_ready(self.ready_timeout).await
            })
            .await
            .map_err(BoardServiceError::Persistence)?;
        Ok(())
    }

    /// Creates a top-level item at the end of its lane.
    ///
    /// The lane defaults to the first configured lane.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Validation`] for a blank title, an
    /// unknown lane, or an over-long tag, and
    /// [`BoardServiceError::Persistence`] when storage fails.
    pub async fn create(&self, request: CreateItemRequest) -> BoardServiceResult<Item> {
        let CreateItemRequest {
            title,
            description,
            tags,
            due_date,
            lane,
        } = request;

        let mut draft = ItemDraft::new(title)?.with_tags(Tags::sanitize(tags)?);
        if let Some(description) = description {
            draft = draft.with_description(description);
        }
        if let Some(due_date) = due_date {
            draft = draft.with_due_date(due_date);
        }
        let lane = match lane {
            Some(name) => self.lanes.resolve(&name)?,
            None => self.lanes.default_lane().clone(),
        };

        self.ensure_ready().await?;
        let order = self.next_order(&OrderScope::Lane(lane.clone())).await?;
        let item = Item::new_top_level(draft, lane, order, &*self.clock);
        self.storage.insert(&item).await?;
        Ok(item)
    }

    /// Creates a sub-item at the end of its parent's list.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::NotFound`] when the parent does not
    /// exist and [`BoardServiceError::Validation`] for a blank title or a
    /// parent that is itself a sub-item.
    pub async fn add_sub_item(
        &self,
        parent_id: ItemId,
        request: AddSubItemRequest,
    ) -> BoardServiceResult<Item> {
        let parent = self.get(parent_id).await?;
        let order = self.next_order(&OrderScope::SubItems(parent_id)).await?;
        let sub_item = Item::new_sub_item(&parent, request.title, order, &*self.clock)?;
        self.storage.insert(&sub_item).await?;
        Ok(sub_item)
    }

    /// Fetches an item.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::NotFound`] when the item does not exist.
    pub async fn get(&self, id: ItemId) -> BoardServiceResult<Item> {
        self.ensure_ready().await?;
        self.storage
            .find_by_id(id)
            .await?
            .ok_or(BoardServiceError::NotFound(id))
    }

    /// Lists top-level items sorted by lane position, order, then creation
    /// time.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Validation`] for an unknown lane filter.
    pub async fn list_top_level(&self, filter: &ItemFilter) -> BoardServiceResult<Vec<Item>> {
        let mut query = ItemQuery::top_level().with_tags(filter.tags.iter().cloned());
        if let Some(name) = &filter.lane {
            query = query.in_lane(self.lanes.resolve(name)?);
        }
        if filter.include_archived {
            query = query.including_archived();
        }

        self.ensure_ready().await?;
        let mut items = self.storage.find(&query).await?;
        let lane_rank = |item: &Item| {
            item.lane()
                .and_then(|lane| self.lanes.position(lane))
                .unwrap_or(usize::MAX)
        };
        items.sort_by_key(|item| (lane_rank(item), item.order(), item.created_at(), item.id()));
        Ok(items)
    }

    /// Lists the sub-items of a parent in order.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::NotFound`] when the parent does not
    /// exist.
    pub async fn list_sub_items(&self, parent_id: ItemId) -> BoardServiceResult<Vec<Item>> {
        self.get(parent_id).await?;
        Ok(self.storage.find(&ItemQuery::sub_items_of([parent_id])).await?)
    }

    /// Loads every top-level item and every sub-item of those items.
    ///
    /// Sub-items are fetched in one batched query, so the board loads with
    /// exactly two storage reads regardless of its size.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Persistence`] when storage fails.
    pub async fn load_board(&self, include_archived: bool) -> BoardServiceResult<Vec<Item>> {
        self.ensure_ready().await?;
        let mut top_level = ItemQuery::top_level();
        if include_archived {
            top_level = top_level.including_archived();
        }
        let mut items = self.storage.find(&top_level).await?;

        let mut sub_items = ItemQuery::sub_items_of(items.iter().map(Item::id));
        if include_archived {
            sub_items = sub_items.including_archived();
        }
        items.extend(self.storage.find(&sub_items).await?);
        Ok(items)
    }

    /// Applies an allow-listed patch and persists the result.
    ///
    /// Lane changes written here keep the item's order key; use the move
    /// coordinator to keep lanes dense.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::NotFound`] when the item does not exist
    /// and [`BoardServiceError::Validation`] when the patch is rejected.
    pub async fn update(&self, id: ItemId, patch: &ItemPatch) -> BoardServiceResult<Item> {
        let mut item = self.get(id).await?;
        item.apply_patch(patch, &self.lanes, &*self.clock)?;
        self.storage.replace(&item).await?;
        Ok(item)
    }

    /// Writes order keys for the items that still belong to `scope`.
    ///
    /// Items outside the scope are skipped and show up as a `matched` count
    /// below the number of assignments.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Persistence`] when storage fails.
    pub async fn batch_set_order(
        &self,
        scope: &OrderScope,
        assignments: &[OrderAssignment],
    ) -> BoardServiceResult<BatchOrderCounts> {
        self.ensure_ready().await?;
        let counts = self
            .storage
            .bulk_set_order(scope, assignments, self.clock.utc())
            .await?;
        if counts.is_partial(assignments.len()) {
            tracing::warn!(
                %scope,
                requested = assignments.len(),
                matched = counts.matched,
                "batch order write skipped items outside the scope"
            );
        }
        Ok(counts)
    }

    /// Writes `items` back exactly as given, stopping at the first failure.
    ///
    /// Used to undo the earlier writes of an operation whose later writes
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::NotFound`] when an item no longer exists
    /// and [`BoardServiceError::Persistence`] when storage fails.
    pub async fn restore(&self, items: &[Item]) -> BoardServiceResult<()> {
        self.ensure_ready().await?;
        for item in items {
            self.storage.replace(item).await?;
        }
        tracing::debug!(restored = items.len(), "restored item pre-images");
        Ok(())
    }

    /// Deletes an item with its sub-items and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::NotFound`] when the item does not exist
    /// and [`BoardServiceError::CascadeFailure`] when the sub-item removal
    /// fails; nothing is removed in that case.
    pub async fn delete(&self, id: ItemId) -> BoardServiceResult<u64> {
        self.ensure_ready().await?;
        Ok(self.storage.delete_cascade(id).await?)
    }

    /// Returns every distinct tag.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Persistence`] when storage fails.
    pub async fn distinct_tags(&self) -> BoardServiceResult<BTreeSet<String>> {
        self.ensure_ready().await?;
        Ok(self.storage.distinct_tags().await?)
    }

    async fn next_order(&self, scope: &OrderScope) -> BoardServiceResult<u32> {
        let siblings = self.storage.find(&ItemQuery::partition(scope)).await?;
        Ok(sequencer::append_order(siblings.iter().map(Item::order)))
    }
}
