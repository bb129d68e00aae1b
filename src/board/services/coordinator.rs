//! Move/reorder coordination with optimistic application and rollback.
//!
//! Each operation runs `Validating → Computing → Applying → Persisting →
//! Committed | RolledBack`. Validation and computation read the
//! [`BoardCache`] snapshot; the tentative result is applied to the cache
//! before any write is issued, so subscribers see the change immediately.
//! A failed write restores exactly the pre-images of the touched items.
//! Operations that need more than one write undo their earlier writes in
//! storage first; if that undo fails as well, the cache is reloaded from
//! storage instead.
//!
//! The persisting phase runs on its own task. Dropping the caller's future
//! abandons only the wait; the outcome is still reconciled with the cache.

use super::{
    cache::BoardCache,
    error::{BoardServiceError, BoardServiceResult, RejectedReorderEntry, ReorderRejection},
    requests::{BatchOrderResponse, MoveToLaneRequest, ReorderLaneRequest},
    store::ItemStore,
};
use crate::board::{
    domain::{
        BoardDomainError, Item, ItemId, ItemPatch, LaneId, OrderAssignment, OrderScope, sequencer,
    },
    ports::{BatchOrderCounts, ItemStorage, ItemStorageError},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::collections::HashSet;

/// Phase of one coordinated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationPhase {
    /// Checking the request against the current snapshot.
    Validating,
    /// Computing new order keys.
    Computing,
    /// Applying the tentative result to the cache.
    Applying,
    /// Waiting for durable writes.
    Persisting,
    /// Writes succeeded, or nothing needed writing.
    Committed,
    /// Writes failed and the cache was restored.
    RolledBack,
}

impl OperationPhase {
    /// Returns whether `next` may follow this phase.
    ///
    /// `Computing` may jump straight to `Committed` when the operation turns
    /// out to change nothing.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Validating, Self::Computing)
                | (Self::Computing, Self::Applying | Self::Committed)
                | (Self::Applying, Self::Persisting)
                | (Self::Persisting, Self::Committed | Self::RolledBack)
        )
    }

    /// Returns whether the operation has settled.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }
}

/// Logs the phase transitions of one operation.
#[derive(Debug)]
struct OperationTrace {
    operation: &'static str,
    phase: OperationPhase,
}

impl OperationTrace {
    fn start(operation: &'static str) -> Self {
        tracing::debug!(operation, phase = ?OperationPhase::Validating, "operation started");
        Self {
            operation,
            phase: OperationPhase::Validating,
        }
    }

    fn advance(&mut self, next: OperationPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal phase transition {:?} -> {next:?}",
            self.phase
        );
        tracing::debug!(
            operation = self.operation,
            from = ?self.phase,
            to = ?next,
            "operation phase changed"
        );
        self.phase = next;
    }
}

/// A failed persisting phase.
#[derive(Debug)]
struct PersistFailure {
    error: BoardServiceError,
    /// Whether storage is back in its pre-operation state.
    restored: bool,
}

impl From<BoardServiceError> for PersistFailure {
    fn from(error: BoardServiceError) -> Self {
        Self {
            error,
            restored: true,
        }
    }
}

/// Orchestrates lane moves, lane reorders, and partition compaction.
pub struct MoveCoordinator<S, C>
where
    S: ItemStorage + 'static,
    C: Clock + Send + Sync + 'static,
{
    store: ItemStore<S, C>,
    cache: BoardCache,
}

impl<S, C> Clone for MoveCoordinator<S, C>
where
    S: ItemStorage + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S, C> MoveCoordinator<S, C>
where
    S: ItemStorage + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a coordinator over a store and the cache it keeps in step.
    #[must_use]
    pub const fn new(store: ItemStore<S, C>, cache: BoardCache) -> Self {
        Self { store, cache }
    }

    /// Returns the cache this coordinator applies changes to.
    #[must_use]
    pub const fn cache(&self) -> &BoardCache {
        &self.cache
    }

    /// Moves a top-level item into `target_lane`, immediately before
    /// `before`, or at the end when `before` is absent or not in the lane.
    ///
    /// Moving an item within its own lane with no `before` changes nothing
    /// and issues no write. Otherwise the item's lane is written first, then
    /// the target lane's order keys, then the source lane is renumbered to
    /// stay dense. When a later write fails, the earlier ones are undone.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Validation`] for an unknown lane, a
    /// sub-item, or an archived item, [`BoardServiceError::NotFound`] when
    /// the item is not on the board, and the storage error after rolling
    /// back when persisting fails.
    pub async fn move_to_lane(
        &self,
        item_id: ItemId,
        target_lane: &str,
        before: Option<ItemId>,
    ) -> BoardServiceResult<Item> {
        let mut trace = OperationTrace::start("move_to_lane");
        let lane = self.store.lanes().resolve(target_lane)?;
        let item = self
            .cache
            .item(item_id)
            .ok_or(BoardServiceError::NotFound(item_id))?;
        let Some(source) = item.lane().cloned() else {
            return Err(BoardDomainError::SubItemsHaveNoLane(item_id).into());
        };
        if item.is_archived() {
            return Err(BoardDomainError::ArchivedItemCannotMove(item_id).into());
        }

        trace.advance(OperationPhase::Computing);
        let relocating = source != lane;
        if !relocating && before.is_none() {
            trace.advance(OperationPhase::Committed);
            return Ok(item);
        }
        let target_plan = sequencer::insert_at(&self.cache.lane_sequence(&lane), item_id, before);
        let source_plan = if relocating {
            let remaining: Vec<ItemId> = self
                .cache
                .lane_sequence(&source)
                .into_iter()
                .filter(|id| *id != item_id)
                .collect();
            sequencer::reorder(&remaining)
        } else {
            Vec::new()
        };

        let now = self.store.clock().utc();
        let mut moved = item.clone();
        if relocating {
            moved.move_to_lane(lane.clone(), self.store.clock())?;
        }
        let mut changes = Vec::new();
        for assignment in target_plan.iter().chain(&source_plan) {
            let found = if assignment.id == item_id {
                Some(moved.clone())
            } else {
                self.cache.item(assignment.id)
            };
            let Some(mut candidate) = found else {
                continue;
            };
            let lane_changed = relocating && assignment.id == item_id;
            if lane_changed || candidate.order() != assignment.order {
                candidate.assign_order(assignment.order, now);
                changes.push(candidate);
            }
        }
        if changes.is_empty() {
            trace.advance(OperationPhase::Committed);
            return Ok(item);
        }

        let pre_images = self.pre_images(&changes);
        let store = self.store.clone();
        let persist = async move {
            if relocating {
                let patch = ItemPatch::default().with_lane(lane.as_str());
                store.update(item_id, &patch).await?;
            }
            let ordered = async {
                let target = OrderScope::Lane(lane);
                let mut stale = store
                    .batch_set_order(&target, &target_plan)
                    .await?
                    .is_partial(target_plan.len());
                if !source_plan.is_empty() {
                    let vacated = OrderScope::Lane(source);
                    stale |= store
                        .batch_set_order(&vacated, &source_plan)
                        .await?
                        .is_partial(source_plan.len());
                }
                Ok::<_, BoardServiceError>(stale)
            }
            .await;
            match ordered {
                Ok(stale) => Ok(((), stale)),
                Err(err) if relocating => Err(undo_writes(&store, &pre_images, err).await),
                Err(err) => Err(PersistFailure::from(err)),
            }
        };
        self.commit(trace, changes, persist).await?;
        self.cache
            .item(item_id)
            .ok_or(BoardServiceError::NotFound(item_id))
    }

    /// Moves an item as described by a wire request.
    ///
    /// # Errors
    ///
    /// See [`Self::move_to_lane`].
    pub async fn apply_move_request(&self, request: &MoveToLaneRequest) -> BoardServiceResult<Item> {
        self.move_to_lane(request.item_id, &request.lane, request.before_item_id)
            .await
    }

    /// Reorders a lane to follow `desired`.
    ///
    /// Lane members missing from `desired` keep their relative order after
    /// the listed ones. A sequence that matches the current order issues no
    /// write.
    ///
    /// The returned counts cover the listed items only. Renumbering the
    /// members left out of `desired` is written separately and undone if it
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Validation`] for an unknown lane or an
    /// empty sequence, [`BoardServiceError::ReorderRejected`] listing every
    /// entry that is not a live member of the lane, and the storage error
    /// after rolling back when persisting fails.
    pub async fn reorder_within_lane(
        &self,
        lane_name: &str,
        desired: &[ItemId],
    ) -> BoardServiceResult<BatchOrderCounts> {
        let mut trace = OperationTrace::start("reorder_within_lane");
        let lane = self.store.lanes().resolve(lane_name)?;
        if desired.is_empty() {
            return Err(BoardDomainError::EmptyReorder.into());
        }
        let rejected = self.rejections(&lane, desired);
        if !rejected.is_empty() {
            return Err(BoardServiceError::ReorderRejected { lane, rejected });
        }

        trace.advance(OperationPhase::Computing);
        let mut sequence = desired.to_vec();
        sequence.extend(
            self.cache
                .lane_sequence(&lane)
                .into_iter()
                .filter(|id| !desired.contains(id)),
        );
        let mut listed = sequencer::reorder(&sequence);
        let changes = self.reassigned(&listed, self.store.clock().utc());
        if changes.is_empty() {
            trace.advance(OperationPhase::Committed);
            return Ok(BatchOrderCounts {
                matched: u64::try_from(desired.len()).unwrap_or(u64::MAX),
                modified: 0,
            });
        }
        let changed: HashSet<ItemId> = changes.iter().map(Item::id).collect();
        let mut trailing = listed.split_off(desired.len());
        trailing.retain(|assignment| changed.contains(&assignment.id));

        let pre_images = self.pre_images(&changes);
        let store = self.store.clone();
        let persist = async move {
            let scope = OrderScope::Lane(lane);
            let counts = store.batch_set_order(&scope, &listed).await?;
            let mut stale = counts.is_partial(listed.len());
            if !trailing.is_empty() {
                match store.batch_set_order(&scope, &trailing).await {
                    Ok(rest) => stale |= rest.is_partial(trailing.len()),
                    Err(err) => return Err(undo_writes(&store, &pre_images, err).await),
                }
            }
            Ok::<_, PersistFailure>((counts, stale))
        };
        self.commit(trace, changes, persist).await
    }

    /// Applies a wire reorder request `{lane, updates: [{id, order}]}`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Validation`] for negative orders and
    /// everything [`Self::reorder_within_lane`] returns.
    pub async fn apply_reorder_request(
        &self,
        request: &ReorderLaneRequest,
    ) -> BoardServiceResult<BatchOrderResponse> {
        let desired = request.desired_sequence()?;
        self.reorder_within_lane(&request.lane, &desired)
            .await
            .map(BatchOrderResponse::from)
    }

    /// Renumbers a partition densely from zero in its current order.
    ///
    /// # Errors
    ///
    /// Returns the storage error after rolling back when persisting fails.
    pub async fn compact(&self, scope: OrderScope) -> BoardServiceResult<BatchOrderCounts> {
        let sequence = self.cache.sequence(&scope);
        self.resequence("compact", scope, &sequence).await
    }

    /// Moves `id` to the end of its partition and renumbers the partition.
    ///
    /// # Errors
    ///
    /// Returns the storage error after rolling back when persisting fails.
    pub async fn append(&self, scope: OrderScope, id: ItemId) -> BoardServiceResult<BatchOrderCounts> {
        let sequence: Vec<ItemId> = self
            .cache
            .sequence(&scope)
            .into_iter()
            .filter(|other| *other != id)
            .chain([id])
            .collect();
        self.resequence("append", scope, &sequence).await
    }

    async fn resequence(
        &self,
        operation: &'static str,
        scope: OrderScope,
        sequence: &[ItemId],
    ) -> BoardServiceResult<BatchOrderCounts> {
        let mut trace = OperationTrace::start(operation);
        trace.advance(OperationPhase::Computing);
        let plan = sequencer::reorder(sequence);
        let changes = self.reassigned(&plan, self.store.clock().utc());
        if changes.is_empty() {
            trace.advance(OperationPhase::Committed);
            return Ok(BatchOrderCounts::default());
        }

        let store = self.store.clone();
        let persist = async move {
            let counts = store.batch_set_order(&scope, &plan).await?;
            Ok::<_, PersistFailure>((counts, counts.is_partial(plan.len())))
        };
        self.commit(trace, changes, persist).await
    }

    /// Reloads the whole board from storage into the cache.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Persistence`] when loading fails; the
    /// cache is left unchanged.
    pub async fn refresh(&self) -> BoardServiceResult<()> {
        let items = self.store.load_board(true).await?;
        self.cache.replace_all(items);
        Ok(())
    }

    /// Applies `changes`, then settles `persist` on its own task.
    ///
    /// `persist` yields the result and whether any batch write came back
    /// partial; a partial write re-syncs the cache from storage. A failure
    /// rolls the cache back, unless storage could not be restored, in which
    /// case the cache is reloaded to match it.
    async fn commit<T, F>(
        &self,
        mut trace: OperationTrace,
        changes: Vec<Item>,
        persist: F,
    ) -> BoardServiceResult<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<(T, bool), PersistFailure>> + Send + 'static,
    {
        trace.advance(OperationPhase::Applying);
        let checkpoint = self.cache.apply(changes);
        trace.advance(OperationPhase::Persisting);

        let settler = self.clone();
        tokio::spawn(async move {
            match persist.await {
                Ok((value, stale)) => {
                    trace.advance(OperationPhase::Committed);
                    if stale {
                        settler.resync().await;
                    }
                    Ok(value)
                }
                Err(PersistFailure { error, restored }) => {
                    trace.advance(OperationPhase::RolledBack);
                    if restored {
                        settler.cache.rollback(checkpoint);
                        tracing::warn!(
                            operation = trace.operation,
                            %error,
                            "rolled back optimistic board change"
                        );
                    } else {
                        tracing::warn!(
                            operation = trace.operation,
                            %error,
                            "storage left partially written; reloading board"
                        );
                        if let Err(err) = settler.refresh().await {
                            tracing::warn!(error = %err, "board reload failed");
                        }
                    }
                    Err(error)
                }
            }
        })
        .await
        .map_err(|err| BoardServiceError::Persistence(ItemStorageError::persistence(err)))?
    }

    async fn resync(&self) {
        tracing::warn!("re-syncing board after a stale batch write");
        if let Err(err) = self.refresh().await {
            tracing::warn!(error = %err, "board re-sync failed");
        }
    }

    /// Returns the cached state of the items about to change.
    fn pre_images(&self, changes: &[Item]) -> Vec<Item> {
        changes
            .iter()
            .filter_map(|change| self.cache.item(change.id()))
            .collect()
    }

    /// Returns copies of the planned items whose key changes, re-keyed.
    fn reassigned(&self, plan: &[OrderAssignment], now: DateTime<Utc>) -> Vec<Item> {
        plan.iter()
            .filter_map(|assignment| {
                let mut item = self.cache.item(assignment.id)?;
                if item.order() == assignment.order {
                    return None;
                }
                item.assign_order(assignment.order, now);
                Some(item)
            })
            .collect()
    }

    fn rejections(&self, lane: &LaneId, desired: &[ItemId]) -> Vec<RejectedReorderEntry> {
        let mut seen = HashSet::with_capacity(desired.len());
        desired
            .iter()
            .filter_map(|&id| {
                let rejection = if seen.insert(id) {
                    self.cache.item(id).map_or(Some(ReorderRejection::UnknownItem), |item| {
                        rejection_for(&item, lane)
                    })
                } else {
                    Some(ReorderRejection::Duplicate)
                };
                rejection.map(|reason| RejectedReorderEntry { id, reason })
            })
            .collect()
    }
}

/// Writes `pre_images` back after a later write of the same operation failed.
async fn undo_writes<S, C>(
    store: &ItemStore<S, C>,
    pre_images: &[Item],
    error: BoardServiceError,
) -> PersistFailure
where
    S: ItemStorage + 'static,
    C: Clock + Send + Sync + 'static,
{
    let restored = store
        .restore(pre_images)
        .await
        .inspect_err(|err| tracing::warn!(error = %err, "could not undo earlier writes"))
        .is_ok();
    PersistFailure { error, restored }
}

fn rejection_for(item: &Item, lane: &LaneId) -> Option<ReorderRejection> {
    if item.is_sub_item() {
        return Some(ReorderRejection::SubItem);
    }
    if item.is_archived() {
        return Some(ReorderRejection::Archived);
    }
    item.lane()
        .filter(|current| *current != lane)
        .map(|current| ReorderRejection::InOtherLane(current.clone()))
}
