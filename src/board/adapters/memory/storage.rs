//! In-memory item storage for tests and embedding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::watch;

use crate::board::{
    domain::{Item, ItemId, OrderAssignment, OrderScope},
    ports::{BatchOrderCounts, ItemQuery, ItemStorage, ItemStorageError, ItemStorageResult},
};

/// Thread-safe in-memory item storage.
///
/// Besides plain storage it can start in a connecting state, delay every
/// write, and fail a planned range of writes, so callers can exercise
/// readiness, cancellation, and rollback paths.
#[derive(Debug, Clone)]
pub struct InMemoryItemStorage {
    state: Arc<RwLock<InMemoryItemState>>,
    faults: Arc<Mutex<WriteFaults>>,
    ready: Arc<watch::Sender<bool>>,
    write_latency: Duration,
}

#[derive(Debug, Default)]
struct InMemoryItemState {
    items: HashMap<ItemId, Item>,
}

/// Planned write failures: let `pass` writes through, then fail `fail`.
#[derive(Debug, Default)]
struct WriteFaults {
    pass: usize,
    fail: usize,
}

impl Default for InMemoryItemStorage {
    fn default() -> Self {
        Self::with_readiness(true)
    }
}

impl InMemoryItemStorage {
    /// Creates an empty storage that is ready immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty storage that stays connecting until
    /// [`Self::mark_ready`] is called.
    #[must_use]
    pub fn connecting() -> Self {
        Self::with_readiness(false)
    }

    fn with_readiness(ready: bool) -> Self {
        let (sender, _) = watch::channel(ready);
        Self {
            state: Arc::default(),
            faults: Arc::default(),
            ready: Arc::new(sender),
            write_latency: Duration::ZERO,
        }
    }

    /// Delays every write by `latency` before it is applied.
    #[must_use]
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = latency;
        self
    }

    /// Finishes connecting.
    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    /// Fails the next `count` writes.
    pub fn fail_next_writes(&self, count: usize) {
        self.inject_write_failures(0, count);
    }

    /// Lets `after` writes succeed, then fails the following `count` writes.
    pub fn inject_write_failures(&self, after: usize, count: usize) {
        let mut faults = self
            .faults
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        faults.pass = after;
        faults.fail = count;
    }

    /// Returns the number of stored items, archived ones included.
    ///
    /// # Errors
    ///
    /// Returns [`ItemStorageError::Persistence`] when the state lock is
    /// poisoned.
    pub fn item_count(&self) -> ItemStorageResult<usize> {
        Ok(self.read_state()?.items.len())
    }

    fn read_state(&self) -> ItemStorageResult<RwLockReadGuard<'_, InMemoryItemState>> {
        self.state.read().map_err(|err| {
            ItemStorageError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write_state(&self) -> ItemStorageResult<RwLockWriteGuard<'_, InMemoryItemState>> {
        self.state.write().map_err(|err| {
            ItemStorageError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    /// Applies write latency and any planned failure.
    async fn begin_write(&self, operation: &'static str) -> ItemStorageResult<()> {
        if !self.write_latency.is_zero() {
            tokio::time::sleep(self.write_latency).await;
        }
        let mut faults = self
            .faults
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if faults.pass > 0 {
            faults.pass -= 1;
            return Ok(());
        }
        if faults.fail > 0 {
            faults.fail -= 1;
            return Err(ItemStorageError::persistence(std::io::Error::other(
                format!("injected failure during {operation}"),
            )));
        }
        Ok(())
    }
}

fn sort_for_listing(items: &mut [Item]) {
    items.sort_by_key(|item| (item.order(), item.created_at(), item.id()));
}

#[async_trait]
impl ItemStorage for InMemoryItemStorage {
    async fn wait_until_ready(&self, timeout: Duration) -> ItemStorageResult<()> {
        let mut receiver = self.ready.subscribe();
        match tokio::time::timeout(timeout, receiver.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(ItemStorageError::persistence(err)),
            Err(_) => Err(ItemStorageError::NotReady(timeout)),
        }
    }

    async fn insert(&self, item: &Item) -> ItemStorageResult<()> {
        self.begin_write("insert").await?;
        let mut state = self.write_state()?;
        if state.items.contains_key(&item.id()) {
            return Err(ItemStorageError::DuplicateItem(item.id()));
        }
        state.items.insert(item.id(), item.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ItemId) -> ItemStorageResult<Option<Item>> {
        let state = self.read_state()?;
        Ok(state.items.get(&id).cloned())
    }

    async fn find(&self, query: &ItemQuery) -> ItemStorageResult<Vec<Item>> {
        let state = self.read_state()?;
        let mut items: Vec<Item> = state
            .items
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect();
        sort_for_listing(&mut items);
        Ok(items)
    }

    async fn replace(&self, item: &Item) -> ItemStorageResult<()> {
        self.begin_write("replace").await?;
        let mut state = self.write_state()?;
        let stored = state
            .items
            .get_mut(&item.id())
            .ok_or(ItemStorageError::NotFound(item.id()))?;
        *stored = item.clone();
        Ok(())
    }

    async fn delete_cascade(&self, id: ItemId) -> ItemStorageResult<u64> {
        self.begin_write("delete_cascade").await?;
        let mut state = self.write_state()?;
        if !state.items.contains_key(&id) {
            return Err(ItemStorageError::NotFound(id));
        }
        let before = state.items.len();
        state
            .items
            .retain(|item_id, item| *item_id != id && item.parent_id() != Some(id));
        let removed = before - state.items.len();
        u64::try_from(removed).map_err(ItemStorageError::persistence)
    }

    async fn bulk_set_order(
        &self,
        scope: &OrderScope,
        assignments: &[OrderAssignment],
        updated_at: DateTime<Utc>,
    ) -> ItemStorageResult<BatchOrderCounts> {
        self.begin_write("bulk_set_order").await?;
        let mut state = self.write_state()?;
        let mut counts = BatchOrderCounts::default();
        for assignment in assignments {
            let Some(item) = state.items.get_mut(&assignment.id) else {
                continue;
            };
            if item.scope() != scope {
                continue;
            }
            counts.matched += 1;
            if item.order() != assignment.order {
                item.assign_order(assignment.order, updated_at);
                counts.modified += 1;
            }
        }
        Ok(counts)
    }

    async fn distinct_tags(&self) -> ItemStorageResult<BTreeSet<String>> {
        let state = self.read_state()?;
        Ok(state
            .items
            .values()
            .flat_map(|item| item.tags().iter().map(str::to_owned))
            .collect())
    }
}
