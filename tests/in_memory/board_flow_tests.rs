//! Item lifecycle tests through the public [`BoardService`] API.

use crate::in_memory::helpers::{lane, open, seed, shown_ids, storage};
use corkboard::board::{
    adapters::memory::InMemoryItemStorage,
    domain::{BoardConfig, ItemPatch},
    services::{
        AddSubItemRequest, BoardService, BoardServiceError, CreateItemRequest, ItemFilter,
    },
};
use mockable::DefaultClock;
use rstest::rstest;
use std::sync::Arc;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn json_payloads_drive_a_full_item_lifecycle(
    storage: Arc<InMemoryItemStorage>,
) -> eyre::Result<()> {
    let board = open(&storage).await?;
    let request = CreateItemRequest::from_json(
        r#"{"title": "Write release notes", "description": "For 1.2", "tags": ["docs", " docs "], "dueDate": "2026-11-02"}"#,
    )?;

    let created = board.create_item(request).await?;
    eyre::ensure!(created.lane() == Some(&lane("pending")?), "new items start in the first lane");
    eyre::ensure!(created.tags().as_slice() == ["docs".to_owned()], "tags were not sanitized");

    let sub_item = board
        .add_sub_item(created.id(), AddSubItemRequest::from_json(r#"{"title": "Draft"}"#)?)
        .await?;
    board.toggle_sub_item(sub_item.id()).await?;

    let patch = ItemPatch::from_json(r#"{"description": null, "lane": "review"}"#)?;
    let updated = board.update_item(created.id(), patch).await?;
    eyre::ensure!(updated.description().is_none(), "description should be cleared");
    eyre::ensure!(updated.lane() == Some(&lane("review")?), "lane change was not applied");

    let projection = board.projection();
    let view = projection
        .find(created.id())
        .ok_or_else(|| eyre::eyre!("item missing from projection"))?;
    eyre::ensure!(view.summary.total == 1 && view.summary.completed == 1, "summary mismatch");

    let removed = board.delete_item(created.id()).await?;
    eyre::ensure!(removed == 2, "expected the item and its sub-item to be removed");
    eyre::ensure!(board.projection().item_count() == 0, "board should be empty");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn custom_lanes_come_from_configuration(
    storage: Arc<InMemoryItemStorage>,
) -> eyre::Result<()> {
    let config = BoardConfig::from_json(r#"{"lanes": ["backlog", "doing", "shipped"]}"#)?;
    let board = BoardService::open(Arc::clone(&storage), Arc::new(DefaultClock), &config).await?;

    let created = board.create_item(CreateItemRequest::new("Configured")).await?;
    let columns: Vec<String> = board
        .projection()
        .columns()
        .iter()
        .map(|column| column.lane.to_string())
        .collect();

    eyre::ensure!(created.lane() == Some(&lane("backlog")?), "first configured lane is the default");
    eyre::ensure!(columns == ["backlog", "doing", "shipped"], "columns follow configuration");
    let rejected = board
        .create_item(CreateItemRequest::new("Lost").with_lane("pending"))
        .await;
    eyre::ensure!(
        matches!(rejected, Err(BoardServiceError::Validation(_))),
        "lanes outside the configuration are rejected"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn archived_items_are_listed_only_on_request(
    storage: Arc<InMemoryItemStorage>,
) -> eyre::Result<()> {
    let board = open(&storage).await?;
    let ids = seed(&board, "done", &["Shipped", "Current"]).await?;

    board.toggle_archive(ids[0]).await?;

    let live = board.list_top_level(&ItemFilter::default().in_lane("done")).await?;
    let all = board
        .list_top_level(&ItemFilter::default().in_lane("done").including_archived())
        .await?;
    eyre::ensure!(live.len() == 1, "archived items are hidden by default");
    eyre::ensure!(all.len() == 2, "archived items are listed when requested");
    eyre::ensure!(shown_ids(&board, "done")? == [ids[1]], "projection hides archived items");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tag_filter_matches_any_requested_tag(
    storage: Arc<InMemoryItemStorage>,
) -> eyre::Result<()> {
    let board = open(&storage).await?;
    let bug = board
        .create_item(CreateItemRequest::new("Crash").with_tags(["bug"]))
        .await?;
    let ui = board
        .create_item(CreateItemRequest::new("Layout").with_tags(["ui"]).with_lane("review"))
        .await?;
    board
        .create_item(CreateItemRequest::new("Untagged"))
        .await?;

    let filter = ItemFilter::from_json(r#"{"tags": ["ui", "bug"]}"#)?;
    let matched: Vec<_> = board
        .list_top_level(&filter)
        .await?
        .iter()
        .map(|item| item.id())
        .collect();

    eyre::ensure!(matched == [bug.id(), ui.id()], "unexpected tag matches: {matched:?}");
    Ok(())
}
