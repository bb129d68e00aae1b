//! Optimistic in-memory board snapshot and projection publisher.

use crate::board::domain::{
    BoardProjection, Item, ItemId, LaneId, LaneSet, OrderScope, ProjectionOptions, projection,
};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use tokio::sync::watch;

/// Pre-images of the items touched by one optimistic change.
///
/// `None` marks an item that did not exist before the change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct Checkpoint {
    entries: Vec<(ItemId, Option<Item>)>,
}

impl Checkpoint {
    /// Returns whether the change touched nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of items touched.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Item snapshot that every board intent reads and writes.
///
/// Each mutation recomputes the [`BoardProjection`] and publishes it to
/// subscribers. Clones share the same snapshot.
#[derive(Debug, Clone)]
pub struct BoardCache {
    inner: Arc<CacheState>,
}

#[derive(Debug)]
struct CacheState {
    items: RwLock<HashMap<ItemId, Item>>,
    lanes: LaneSet,
    options: ProjectionOptions,
    publisher: watch::Sender<Arc<BoardProjection>>,
}

impl BoardCache {
    /// Creates an empty cache publishing an empty projection.
    #[must_use]
    pub fn new(lanes: LaneSet, options: ProjectionOptions) -> Self {
        let (publisher, _) = watch::channel(Arc::new(BoardProjection::empty(&lanes)));
        Self {
            inner: Arc::new(CacheState {
                items: RwLock::new(HashMap::new()),
                lanes,
                options,
                publisher,
            }),
        }
    }

    /// Returns the lanes projected by this cache.
    #[must_use]
    pub fn lanes(&self) -> &LaneSet {
        &self.inner.lanes
    }

    /// Replaces the whole snapshot.
    pub fn replace_all(&self, items: impl IntoIterator<Item = Item>) {
        let mut state = self.write();
        *state = items.into_iter().map(|item| (item.id(), item)).collect();
        self.publish(&state);
    }

    /// Returns a copy of one item.
    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<Item> {
        self.read(|items| items.get(&id).cloned())
    }

    /// Returns the non-archived members of a partition in order.
    #[must_use]
    pub fn sequence(&self, scope: &OrderScope) -> Vec<ItemId> {
        self.read(|items| {
            let mut members: Vec<&Item> = items
                .values()
                .filter(|item| item.scope() == scope && !item.is_archived())
                .collect();
            members.sort_by_key(|item| (item.order(), item.created_at(), item.id()));
            members.into_iter().map(Item::id).collect()
        })
    }

    /// Returns the non-archived top-level items of a lane in order.
    #[must_use]
    pub fn lane_sequence(&self, lane: &LaneId) -> Vec<ItemId> {
        self.sequence(&OrderScope::Lane(lane.clone()))
    }

    /// Returns the sub-items of a parent in order.
    #[must_use]
    pub fn sub_item_sequence(&self, parent_id: ItemId) -> Vec<ItemId> {
        self.sequence(&OrderScope::SubItems(parent_id))
    }

    /// Inserts or replaces one item.
    pub fn upsert(&self, item: Item) {
        let mut state = self.write();
        state.insert(item.id(), item);
        self.publish(&state);
    }

    /// Removes an item with its sub-items and returns how many were removed.
    pub fn remove(&self, id: ItemId) -> usize {
        let mut state = self.write();
        let before = state.len();
        state.retain(|item_id, item| *item_id != id && item.parent_id() != Some(id));
        let removed = before - state.len();
        self.publish(&state);
        removed
    }

    /// Applies tentative item states and returns their pre-images.
    pub fn apply(&self, changes: Vec<Item>) -> Checkpoint {
        let mut state = self.write();
        let entries = changes
            .into_iter()
            .map(|item| {
                let id = item.id();
                (id, state.insert(id, item))
            })
            .collect();
        self.publish(&state);
        Checkpoint { entries }
    }

    /// Restores the pre-images recorded by [`Self::apply`].
    ///
    /// Items the change did not touch keep their current state, so
    /// concurrent changes to other partitions survive.
    pub fn rollback(&self, checkpoint: Checkpoint) {
        let mut state = self.write();
        for (id, previous) in checkpoint.entries.into_iter().rev() {
            match previous {
                Some(item) => {
                    state.insert(id, item);
                }
                None => {
                    state.remove(&id);
                }
            }
        }
        self.publish(&state);
    }

    /// Returns the latest projection.
    #[must_use]
    pub fn projection(&self) -> Arc<BoardProjection> {
        Arc::clone(&*self.inner.publisher.borrow())
    }

    /// Subscribes to projection updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<BoardProjection>> {
        self.inner.publisher.subscribe()
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<ItemId, Item>) -> T) -> T {
        let state = self
            .inner
            .items
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ItemId, Item>> {
        self.inner
            .items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes under the write lock so subscribers see changes in order.
    fn publish(&self, items: &HashMap<ItemId, Item>) {
        let next = projection::project(items.values(), &self.inner.lanes, self.inner.options);
        self.inner.publisher.send_replace(Arc::new(next));
    }
}
