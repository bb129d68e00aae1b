//! Shared fixtures for board unit tests.

use crate::board::{
    adapters::memory::InMemoryItemStorage,
    domain::{BoardConfig, ItemId, LaneId},
    services::{BoardService, CreateItemRequest},
};
use mockable::DefaultClock;
use std::sync::Arc;

pub(super) type MemoryBoard = BoardService<InMemoryItemStorage, DefaultClock>;

pub(super) fn lane(name: &str) -> LaneId {
    LaneId::new(name).expect("valid lane identifier")
}

pub(super) async fn open_board(storage: &Arc<InMemoryItemStorage>) -> MemoryBoard {
    BoardService::open(
        Arc::clone(storage),
        Arc::new(DefaultClock),
        &BoardConfig::default(),
    )
    .await
    .expect("board should open")
}

/// Creates one item per title in `lane_name`, in order.
pub(super) async fn seed(board: &MemoryBoard, lane_name: &str, titles: &[&str]) -> Vec<ItemId> {
    let mut ids = Vec::with_capacity(titles.len());
    for title in titles {
        let item = board
            .create_item(CreateItemRequest::new(*title).with_lane(lane_name))
            .await
            .expect("item creation should succeed");
        ids.push(item.id());
    }
    ids
}

/// Returns `(id, order)` pairs shown in a lane of the current projection.
pub(super) fn shown(board: &MemoryBoard, lane_name: &str) -> Vec<(ItemId, u32)> {
    board
        .projection()
        .lane(&lane(lane_name))
        .map(|views| {
            views
                .iter()
                .map(|view| (view.item.id(), view.item.order()))
                .collect()
        })
        .unwrap_or_default()
}

/// Returns `(id, order)` pairs stored for a lane, in order.
pub(super) async fn stored(board: &MemoryBoard, lane_name: &str) -> Vec<(ItemId, u32)> {
    board
        .list_top_level(&crate::board::services::ItemFilter::default().in_lane(lane_name))
        .await
        .expect("listing should succeed")
        .into_iter()
        .map(|item| (item.id(), item.order()))
        .collect()
}

/// Asserts a lane holds the dense keys `0..n` in both views.
pub(super) async fn assert_dense(board: &MemoryBoard, lane_name: &str) {
    let persisted = stored(board, lane_name).await;
    let expected: Vec<u32> = (0_u32..).take(persisted.len()).collect();
    let persisted_orders: Vec<u32> = persisted.iter().map(|(_, order)| *order).collect();
    assert_eq!(persisted_orders, expected, "stored lane {lane_name} is not dense");
    assert_eq!(shown(board, lane_name), persisted, "projection diverged in {lane_name}");
}
