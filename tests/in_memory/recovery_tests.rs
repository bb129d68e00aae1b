//! Rollback and reload tests for the board over faulty in-memory storage.

use crate::in_memory::helpers::{ensure_dense, open, seed, shown_ids, storage};
use corkboard::board::{
    adapters::memory::InMemoryItemStorage,
    domain::ItemPatch,
    services::BoardServiceError,
};
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_move_leaves_board_and_storage_as_before(
    storage: Arc<InMemoryItemStorage>,
) -> eyre::Result<()> {
    let board = open(&storage).await?;
    let pending = seed(&board, "pending", &["X", "Y", "Z"]).await?;
    let review = seed(&board, "review", &["R"]).await?;
    let before = board.projection();
    storage.fail_next_writes(1);

    let result = board.move_to_lane(pending[0], "review", Some(review[0])).await;

    eyre::ensure!(
        matches!(result, Err(BoardServiceError::Persistence(_))),
        "the write failure should surface"
    );
    eyre::ensure!(*board.projection() == *before, "projection was not restored");
    ensure_dense(&board, "pending").await?;
    ensure_dense(&board, "review").await?;

    let retried = board.move_to_lane(pending[0], "review", Some(review[0])).await?;
    eyre::ensure!(retried.order() == 0, "retry should succeed once storage recovers");
    eyre::ensure!(shown_ids(&board, "pending")? == [pending[1], pending[2]], "source not compacted");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reopened_board_shows_the_persisted_order(
    storage: Arc<InMemoryItemStorage>,
) -> eyre::Result<()> {
    let board = open(&storage).await?;
    let ids = seed(&board, "pending", &["A", "B", "C"]).await?;
    board.reorder_within_lane("pending", &[ids[2], ids[0]]).await?;
    board.move_to_lane(ids[1], "done", None).await?;
    drop(board);

    let reopened = open(&storage).await?;

    eyre::ensure!(shown_ids(&reopened, "pending")? == [ids[2], ids[0]], "order was not persisted");
    eyre::ensure!(shown_ids(&reopened, "done")? == [ids[1]], "move was not persisted");
    ensure_dense(&reopened, "pending").await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refresh_picks_up_changes_made_by_another_board(
    storage: Arc<InMemoryItemStorage>,
) -> eyre::Result<()> {
    let board = open(&storage).await?;
    let other = open(&storage).await?;
    let ids = seed(&board, "pending", &["Shared"]).await?;

    eyre::ensure!(shown_ids(&other, "pending")?.is_empty(), "other board has not refreshed yet");
    other.refresh().await?;
    other
        .update_item(ids[0], ItemPatch::default().with_title("Renamed elsewhere"))
        .await?;
    board.refresh().await?;

    let title = board
        .projection()
        .find(ids[0])
        .map(|view| view.item.title().to_owned());
    eyre::ensure!(title.as_deref() == Some("Renamed elsewhere"), "refresh missed the rename");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn abandoned_reorder_still_reaches_storage() -> eyre::Result<()> {
    let slow = Arc::new(InMemoryItemStorage::new().with_write_latency(Duration::from_millis(30)));
    let board = open(&slow).await?;
    let ids = seed(&board, "pending", &["A", "B"]).await?;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(5),
        board.reorder_within_lane("pending", &[ids[1], ids[0]]),
    )
    .await;
    eyre::ensure!(abandoned.is_err(), "the reorder should still be in flight");
    tokio::time::sleep(Duration::from_millis(300)).await;

    let reopened = open(&slow).await?;
    eyre::ensure!(shown_ids(&reopened, "pending")? == [ids[1], ids[0]], "reorder was lost");
    ensure_dense(&board, "pending").await
}
