//! Then steps for board ordering BDD scenarios.

use super::world::{BoardOrderingWorld, run_async, split_titles};
use corkboard::board::{
    domain::{LaneId, LaneSet},
    services::{BoardServiceError, ItemFilter},
};
use rstest_bdd_macros::then;

#[then(r#"lane "{lane}" shows "{titles}""#)]
fn lane_shows(world: &BoardOrderingWorld, lane: String, titles: String) -> Result<(), eyre::Report> {
    let expected: Vec<&str> = split_titles(&titles).collect();
    let shown = world.shown_titles(&lane)?;
    if shown != expected {
        return Err(eyre::eyre!("lane {lane} shows {shown:?}, expected {expected:?}"));
    }
    Ok(())
}

#[then(r#"lane "{lane}" is empty"#)]
fn lane_is_empty(world: &BoardOrderingWorld, lane: String) -> Result<(), eyre::Report> {
    let shown = world.shown_titles(&lane)?;
    eyre::ensure!(shown.is_empty(), "lane {lane} still shows {shown:?}");
    Ok(())
}

#[then("every lane has dense order keys")]
fn every_lane_is_dense(world: &BoardOrderingWorld) -> Result<(), eyre::Report> {
    let board = world.board()?;
    for lane in LaneSet::default().iter() {
        let stored = run_async(
            board.list_top_level(&ItemFilter::default().in_lane(lane.as_str())),
        )?;
        for (expected, item) in (0_u32..).zip(&stored) {
            eyre::ensure!(
                item.order() == expected,
                "lane {lane}: {} has order {}, expected {expected}",
                item.title(),
                item.order()
            );
        }
    }
    Ok(())
}

#[then(r#"item "{title}" has order {order:u32} in lane "{lane}""#)]
fn item_has_order(
    world: &BoardOrderingWorld,
    title: String,
    order: u32,
    lane: String,
) -> Result<(), eyre::Report> {
    let item = run_async(world.board()?.store().get(world.id_of(&title)?))?;
    eyre::ensure!(item.order() == order, "{title} has order {}", item.order());
    eyre::ensure!(
        item.lane().map(LaneId::as_str) == Some(lane.as_str()),
        "{title} is not in lane {lane}"
    );
    Ok(())
}

#[then(r#"item "{title}" has the tags {tags}"#)]
fn item_has_tags(world: &BoardOrderingWorld, title: String, tags: String) -> Result<(), eyre::Report> {
    let expected: Vec<String> = serde_json::from_str(&tags)?;
    let item = run_async(world.board()?.store().get(world.id_of(&title)?))?;
    eyre::ensure!(
        item.tags().as_slice() == expected.as_slice(),
        "{title} has tags {:?}, expected {expected:?}",
        item.tags().as_slice()
    );
    Ok(())
}

#[then("the operation fails with a persistence error")]
fn operation_fails_with_persistence_error(world: &BoardOrderingWorld) -> Result<(), eyre::Report> {
    let error = world
        .last_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected the operation to fail"))?;
    if !matches!(error, BoardServiceError::Persistence(_)) {
        return Err(eyre::eyre!("expected a persistence error, got {error:?}"));
    }
    Ok(())
}

#[then(r#"the reorder is rejected for "{titles}""#)]
fn reorder_is_rejected_for(world: &BoardOrderingWorld, titles: String) -> Result<(), eyre::Report> {
    let expected = world.ids_of(&titles)?;
    let Some(BoardServiceError::ReorderRejected { rejected, .. }) = &world.last_error else {
        return Err(eyre::eyre!("expected a reorder rejection, got {:?}", world.last_error));
    };
    let ids: Vec<_> = rejected.iter().map(|entry| entry.id).collect();
    eyre::ensure!(ids == expected, "rejected {ids:?}, expected {expected:?}");
    Ok(())
}
