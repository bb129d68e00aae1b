//! Given steps for board ordering BDD scenarios.

use super::world::{BoardOrderingWorld, run_async, split_titles};
use corkboard::board::{
    domain::BoardConfig,
    services::{BoardService, CreateItemRequest},
};
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest_bdd_macros::given;
use std::sync::Arc;

#[given("an empty board")]
fn empty_board(world: &mut BoardOrderingWorld) -> Result<(), eyre::Report> {
    let board = run_async(BoardService::open(
        Arc::clone(&world.storage),
        Arc::new(DefaultClock),
        &BoardConfig::default(),
    ))
    .wrap_err("open board for ordering scenario")?;
    world.board = Some(board);
    Ok(())
}

#[given(r#"lane "{lane}" holds "{titles}""#)]
fn lane_holds(
    world: &mut BoardOrderingWorld,
    lane: String,
    titles: String,
) -> Result<(), eyre::Report> {
    for title in split_titles(&titles) {
        let request = CreateItemRequest::new(title).with_lane(lane.as_str());
        let created = run_async(world.board()?.create_item(request))
            .wrap_err_with(|| format!("create {title} in lane {lane}"))?;
        world.ids_by_title.insert(title.to_owned(), created.id());
    }
    Ok(())
}

#[given("the next storage write fails")]
fn next_write_fails(world: &BoardOrderingWorld) {
    world.storage.fail_next_writes(1);
}
