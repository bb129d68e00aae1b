//! Presentation-facing board service.
//!
//! [`BoardService`] is the single entry point for the presentation
//! collaborator: it exposes the projection and dispatches every board
//! intent. Lane moves and reorders go through the [`MoveCoordinator`];
//! the other intents are written durably first and then mirrored into the
//! cache, renumbering the affected partition where an item leaves or
//! re-enters it.

use super::{
    cache::BoardCache,
    coordinator::MoveCoordinator,
    error::{BoardServiceError, BoardServiceResult},
    requests::{
        AddSubItemRequest, BatchOrderResponse, BoardSnapshot, CreateItemRequest, ItemFilter,
        MoveToLaneRequest, ReorderLaneRequest,
    },
    store::ItemStore,
};
use crate::board::{
    domain::{
        BoardConfig, BoardDomainError, BoardProjection, Item, ItemId, ItemPatch,
        ProjectionOptions,
    },
    ports::{BatchOrderCounts, ItemStorage},
};
use mockable::Clock;
use std::sync::Arc;
use tokio::sync::watch;

/// Board intents and projection access for one board instance.
pub struct BoardService<S, C>
where
    S: ItemStorage + 'static,
    C: Clock + Send + Sync + 'static,
{
    store: ItemStore<S, C>,
    coordinator: MoveCoordinator<S, C>,
}

impl<S, C> Clone for BoardService<S, C>
where
    S: ItemStorage + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<S, C> BoardService<S, C>
where
    S: ItemStorage + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Waits for storage, loads the board, and publishes its projection.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Persistence`] when storage is not ready
    /// within the configured timeout or the initial load fails.
    pub async fn open(
        storage: Arc<S>,
        clock: Arc<C>,
        config: &BoardConfig,
    ) -> BoardServiceResult<Self> {
        let store = ItemStore::new(storage, clock, config);
        store.ensure_ready().await?;
        let options = ProjectionOptions {
            include_archived: config.include_archived,
        };
        let cache = BoardCache::new(config.lanes.clone(), options);
        let coordinator = MoveCoordinator::new(store.clone(), cache);
        coordinator.refresh().await?;
        tracing::debug!(
            items = coordinator.cache().projection().item_count(),
            "board opened"
        );
        Ok(Self { store, coordinator })
    }

    /// Returns the item store.
    #[must_use]
    pub const fn store(&self) -> &ItemStore<S, C> {
        &self.store
    }

    /// Returns the move/reorder coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &MoveCoordinator<S, C> {
        &self.coordinator
    }

    fn cache(&self) -> &BoardCache {
        self.coordinator.cache()
    }

    /// Returns the current projection.
    #[must_use]
    pub fn projection(&self) -> Arc<BoardProjection> {
        self.cache().projection()
    }

    /// Subscribes to projection updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<BoardProjection>> {
        self.cache().subscribe()
    }

    /// Returns the projection together with every distinct tag.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Persistence`] when the tag query fails.
    pub async fn snapshot(&self) -> BoardServiceResult<BoardSnapshot> {
        let tags = self.store.distinct_tags().await?;
        Ok(BoardSnapshot {
            projection: BoardProjection::clone(&self.projection()),
            tags,
        })
    }

    /// Lists top-level items straight from storage.
    ///
    /// # Errors
    ///
    /// See [`ItemStore::list_top_level`].
    pub async fn list_top_level(&self, filter: &ItemFilter) -> BoardServiceResult<Vec<Item>> {
        self.store.list_top_level(filter).await
    }

    /// Lists the sub-items of a parent straight from storage.
    ///
    /// # Errors
    ///
    /// See [`ItemStore::list_sub_items`].
    pub async fn list_sub_items(&self, parent_id: ItemId) -> BoardServiceResult<Vec<Item>> {
        self.store.list_sub_items(parent_id).await
    }

    /// Creates a top-level item at the end of its lane.
    ///
    /// # Errors
    ///
    /// See [`ItemStore::create`].
    pub async fn create_item(&self, request: CreateItemRequest) -> BoardServiceResult<Item> {
        let item = self.store.create(request).await?;
        self.cache().upsert(item.clone());
        Ok(item)
    }

    /// Applies an allow-listed patch to an item or sub-item.
    ///
    /// The whole patch is validated before anything is written. A lane
    /// change moves the item to the end of the target lane; archiving or
    /// unarchiving renumbers the lane it leaves or re-enters.
    ///
    /// Placement changes are written before the descriptive fields, each as
    /// its own operation. A failure leaves the descriptive fields untouched,
    /// but placement changes that already succeeded stay in effect.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::NotFound`] when the item does not exist
    /// and [`BoardServiceError::Validation`] when the patch is rejected.
    pub async fn update_item(&self, id: ItemId, patch: ItemPatch) -> BoardServiceResult<Item> {
        let mut preview = self.store.get(id).await?;
        preview.apply_patch(&patch, self.store.lanes(), self.store.clock())?;

        let mut remainder = patch;
        let lane = remainder.take_lane();
        let archived = remainder.archived.take();
        if archived == Some(false) {
            self.set_archived(id, false).await?;
        }
        if let Some(target) = lane {
            self.change_lane(id, &target).await?;
        }
        if archived == Some(true) {
            self.set_archived(id, true).await?;
        }
        if !remainder.is_empty() {
            let updated = self.store.update(id, &remainder).await?;
            self.cache().upsert(updated);
        }
        self.cache()
            .item(id)
            .ok_or(BoardServiceError::NotFound(id))
    }

    /// Deletes an item with its sub-items and returns how many were removed.
    ///
    /// The partition the item occupied is renumbered afterwards. A failed
    /// renumbering is logged and the board reloaded; the delete still
    /// counts as done.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::NotFound`] when the item does not exist
    /// and [`BoardServiceError::CascadeFailure`] when the cascade fails, in
    /// which case nothing is removed.
    pub async fn delete_item(&self, id: ItemId) -> BoardServiceResult<u64> {
        let item = self.store.get(id).await?;
        let removed = self.store.delete(id).await?;
        self.cache().remove(id);
        if !item.is_archived() {
            if let Err(err) = self.coordinator.compact(item.scope().clone()).await {
                self.reload_after_failed_renumbering(id, &err).await;
            }
        }
        Ok(removed)
    }

    /// Flips the archive flag of a top-level item.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::NotFound`] when the item does not exist
    /// and [`BoardServiceError::Validation`] for sub-items.
    pub async fn toggle_archive(&self, id: ItemId) -> BoardServiceResult<Item> {
        let item = self.store.get(id).await?;
        self.set_archived(id, !item.is_archived()).await
    }

    /// Adds a sub-item at the end of its parent's list.
    ///
    /// # Errors
    ///
    /// See [`ItemStore::add_sub_item`].
    pub async fn add_sub_item(
        &self,
        parent_id: ItemId,
        request: AddSubItemRequest,
    ) -> BoardServiceResult<Item> {
        let sub_item = self.store.add_sub_item(parent_id, request).await?;
        self.cache().upsert(sub_item.clone());
        Ok(sub_item)
    }

    /// Flips the completion flag of a sub-item.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::NotFound`] when the item does not exist
    /// and [`BoardServiceError::Validation`] for top-level items.
    pub async fn toggle_sub_item(&self, id: ItemId) -> BoardServiceResult<Item> {
        let item = self.store.get(id).await?;
        if !item.is_sub_item() {
            return Err(BoardDomainError::NotASubItem(id).into());
        }
        let patch = ItemPatch::default().with_completed(!item.is_completed());
        let updated = self.store.update(id, &patch).await?;
        self.cache().upsert(updated.clone());
        Ok(updated)
    }

    /// Deletes a sub-item and renumbers its siblings.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::NotFound`] when the item does not exist
    /// and [`BoardServiceError::Validation`] for top-level items.
    pub async fn delete_sub_item(&self, id: ItemId) -> BoardServiceResult<()> {
        let item = self.store.get(id).await?;
        if !item.is_sub_item() {
            return Err(BoardDomainError::NotASubItem(id).into());
        }
        self.delete_item(id).await?;
        Ok(())
    }

    /// Moves an item to a lane; see [`MoveCoordinator::move_to_lane`].
    ///
    /// # Errors
    ///
    /// See [`MoveCoordinator::move_to_lane`].
    pub async fn move_to_lane(
        &self,
        item_id: ItemId,
        target_lane: &str,
        before: Option<ItemId>,
    ) -> BoardServiceResult<Item> {
        self.coordinator
            .move_to_lane(item_id, target_lane, before)
            .await
    }

    /// Moves an item as described by a wire request.
    ///
    /// # Errors
    ///
    /// See [`MoveCoordinator::move_to_lane`].
    pub async fn apply_move_request(&self, request: &MoveToLaneRequest) -> BoardServiceResult<Item> {
        self.coordinator.apply_move_request(request).await
    }

    /// Reorders a lane; see [`MoveCoordinator::reorder_within_lane`].
    ///
    /// # Errors
    ///
    /// See [`MoveCoordinator::reorder_within_lane`].
    pub async fn reorder_within_lane(
        &self,
        lane: &str,
        desired: &[ItemId],
    ) -> BoardServiceResult<BatchOrderCounts> {
        self.coordinator.reorder_within_lane(lane, desired).await
    }

    /// Applies a wire reorder request.
    ///
    /// # Errors
    ///
    /// See [`MoveCoordinator::apply_reorder_request`].
    pub async fn apply_reorder_request(
        &self,
        request: &ReorderLaneRequest,
    ) -> BoardServiceResult<BatchOrderResponse> {
        self.coordinator.apply_reorder_request(request).await
    }

    /// Reloads the board from storage.
    ///
    /// # Errors
    ///
    /// See [`MoveCoordinator::refresh`].
    pub async fn refresh(&self) -> BoardServiceResult<()> {
        self.coordinator.refresh().await
    }

    /// Moves a live item through the coordinator; archived items only
    /// record the new lane, since they hold no lane position.
    async fn change_lane(&self, id: ItemId, target: &str) -> BoardServiceResult<()> {
        let archived = self.cache().item(id).is_some_and(|item| item.is_archived());
        if archived {
            let patch = ItemPatch::default().with_lane(target);
            let updated = self.store.update(id, &patch).await?;
            self.cache().upsert(updated);
        } else {
            self.coordinator.move_to_lane(id, target, None).await?;
        }
        Ok(())
    }

    async fn set_archived(&self, id: ItemId, archived: bool) -> BoardServiceResult<Item> {
        let item = self.store.get(id).await?;
        if item.is_sub_item() {
            return Err(BoardDomainError::FieldNotAllowed {
                field: "archived",
                kind: "a sub-item",
            }
            .into());
        }
        if item.is_archived() == archived {
            return Ok(item);
        }

        let patch = ItemPatch::default().with_archived(archived);
        let updated = self.store.update(id, &patch).await?;
        let scope = updated.scope().clone();
        self.cache().upsert(updated);
        let renumbered = if archived {
            self.coordinator.compact(scope).await
        } else {
            self.coordinator.append(scope, id).await
        };
        if let Err(err) = renumbered {
            self.reload_after_failed_renumbering(id, &err).await;
        }
        self.cache()
            .item(id)
            .ok_or(BoardServiceError::NotFound(id))
    }

    /// Reloads the board when renumbering after a durable change failed.
    async fn reload_after_failed_renumbering(&self, id: ItemId, err: &BoardServiceError) {
        tracing::warn!(item = %id, error = %err, "renumbering after a committed change failed");
        if let Err(reload_err) = self.coordinator.refresh().await {
            tracing::warn!(error = %reload_err, "board reload failed");
        }
    }
}
