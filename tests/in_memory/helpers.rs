//! Shared test helpers for in-memory board integration tests.

use corkboard::board::{
    adapters::memory::InMemoryItemStorage,
    domain::{BoardConfig, ItemId, LaneId},
    services::{BoardService, CreateItemRequest, ItemFilter},
};
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;

/// Board service over in-memory storage.
pub type TestBoard = BoardService<InMemoryItemStorage, DefaultClock>;

/// Provides fresh, ready in-memory storage for each test.
#[fixture]
pub fn storage() -> Arc<InMemoryItemStorage> {
    Arc::new(InMemoryItemStorage::new())
}

/// Opens a board with the default lanes over `storage`.
///
/// # Errors
///
/// Returns an error if the board cannot be opened.
pub async fn open(storage: &Arc<InMemoryItemStorage>) -> eyre::Result<TestBoard> {
    let board = BoardService::open(
        Arc::clone(storage),
        Arc::new(DefaultClock),
        &BoardConfig::default(),
    )
    .await?;
    Ok(board)
}

/// Parses a lane identifier.
///
/// # Errors
///
/// Returns an error if `name` is not a valid lane identifier.
pub fn lane(name: &str) -> eyre::Result<LaneId> {
    Ok(LaneId::new(name)?)
}

/// Creates one item per title at the end of `lane_name`.
///
/// # Errors
///
/// Returns an error if any creation fails.
pub async fn seed(board: &TestBoard, lane_name: &str, titles: &[&str]) -> eyre::Result<Vec<ItemId>> {
    let mut ids = Vec::with_capacity(titles.len());
    for title in titles {
        let item = board
            .create_item(CreateItemRequest::new(*title).with_lane(lane_name))
            .await?;
        ids.push(item.id());
    }
    Ok(ids)
}

/// Returns the item identifiers shown in a lane of the current projection.
///
/// # Errors
///
/// Returns an error if `lane_name` is not a valid lane identifier.
pub fn shown_ids(board: &TestBoard, lane_name: &str) -> eyre::Result<Vec<ItemId>> {
    Ok(board.projection().lane_ids(&lane(lane_name)?))
}

/// Checks that a lane holds dense keys `0..n` in storage and that the
/// projection shows the same sequence.
///
/// # Errors
///
/// Returns an error if the lane is not dense or the views disagree.
pub async fn ensure_dense(board: &TestBoard, lane_name: &str) -> eyre::Result<()> {
    let stored = board
        .list_top_level(&ItemFilter::default().in_lane(lane_name))
        .await?;
    for (expected, item) in (0_u32..).zip(&stored) {
        eyre::ensure!(
            item.order() == expected,
            "lane {lane_name}: item {} has order {}, expected {expected}",
            item.id(),
            item.order()
        );
    }
    let stored_ids: Vec<ItemId> = stored.iter().map(|item| item.id()).collect();
    eyre::ensure!(
        shown_ids(board, lane_name)? == stored_ids,
        "lane {lane_name}: projection diverged from storage"
    );
    Ok(())
}
