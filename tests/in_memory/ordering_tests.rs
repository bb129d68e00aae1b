//! Lane density tests across moves, reorders, and deletes.

use crate::in_memory::helpers::{ensure_dense, open, seed, shown_ids, storage};
use corkboard::board::{
    adapters::memory::InMemoryItemStorage,
    domain::{ItemId, LaneSet},
    services::{BoardServiceError, ReorderLaneRequest, ReorderRejection},
};
use rstest::rstest;
use std::sync::Arc;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn moves_between_every_lane_keep_all_lanes_dense(
    storage: Arc<InMemoryItemStorage>,
) -> eyre::Result<()> {
    let board = open(&storage).await?;
    let ids = seed(&board, "pending", &["A", "B", "C", "D", "E", "F"]).await?;
    let lanes: Vec<String> = LaneSet::default().iter().map(ToString::to_string).collect();

    for (id, target) in ids.iter().zip(lanes.iter().cycle()) {
        let anchor = shown_ids(&board, target)?.first().copied();
        board.move_to_lane(*id, target, anchor).await?;
        for name in &lanes {
            ensure_dense(&board, name).await?;
        }
    }

    let total: usize = board
        .projection()
        .columns()
        .iter()
        .map(|column| column.items.len())
        .sum();
    eyre::ensure!(total == ids.len(), "items were lost or duplicated");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reorder_request_from_the_wire_is_applied_in_order(
    storage: Arc<InMemoryItemStorage>,
) -> eyre::Result<()> {
    let board = open(&storage).await?;
    let ids = seed(&board, "in-progress", &["X", "Y", "Z"]).await?;
    let payload = format!(
        r#"{{"lane": "in-progress", "updates": [{{"id": "{}", "order": 10}}, {{"id": "{}", "order": 3}}, {{"id": "{}", "order": 7}}]}}"#,
        ids[0], ids[1], ids[2]
    );

    let response = board
        .apply_reorder_request(&ReorderLaneRequest::from_json(&payload)?)
        .await?;

    eyre::ensure!(response.matched_count == 3, "all items should match");
    eyre::ensure!(
        shown_ids(&board, "in-progress")? == [ids[1], ids[2], ids[0]],
        "lane order should follow the requested keys"
    );
    ensure_dense(&board, "in-progress").await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reorder_naming_a_foreign_item_changes_nothing(
    storage: Arc<InMemoryItemStorage>,
) -> eyre::Result<()> {
    let board = open(&storage).await?;
    let pending = seed(&board, "pending", &["X", "Y"]).await?;
    let done = seed(&board, "done", &["D"]).await?;

    let result = board
        .reorder_within_lane("pending", &[done[0], pending[1], pending[0]])
        .await;

    let Err(BoardServiceError::ReorderRejected { rejected, .. }) = result else {
        eyre::bail!("expected the reorder to be rejected");
    };
    eyre::ensure!(rejected.len() == 1, "only the foreign item is rejected");
    eyre::ensure!(
        matches!(&rejected[0].reason, ReorderRejection::InOtherLane(lane) if lane.as_str() == "done"),
        "rejection should name the item's lane"
    );
    eyre::ensure!(shown_ids(&board, "pending")? == pending, "pending lane must be untouched");
    eyre::ensure!(shown_ids(&board, "done")? == done, "done lane must be untouched");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_from_the_middle_closes_the_gap(
    storage: Arc<InMemoryItemStorage>,
) -> eyre::Result<()> {
    let board = open(&storage).await?;
    let ids = seed(&board, "review", &["A", "B", "C", "D"]).await?;

    board.delete_item(ids[1]).await?;
    board.delete_item(ids[3]).await?;

    let expected: Vec<ItemId> = vec![ids[0], ids[2]];
    eyre::ensure!(shown_ids(&board, "review")? == expected, "remaining order changed");
    ensure_dense(&board, "review").await
}
