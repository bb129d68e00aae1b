//! When steps for board ordering BDD scenarios.

use super::world::{BoardOrderingWorld, run_async};
use corkboard::board::services::CreateItemRequest;
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when(r#"lane "{lane}" is reordered to "{titles}""#)]
fn lane_is_reordered(
    world: &mut BoardOrderingWorld,
    lane: String,
    titles: String,
) -> Result<(), eyre::Report> {
    let desired = world.ids_of(&titles)?;
    let result = run_async(world.board()?.reorder_within_lane(&lane, &desired));
    world.last_error = result.err();
    Ok(())
}

#[when(r#""{title}" is moved to lane "{lane}""#)]
fn item_is_moved(
    world: &mut BoardOrderingWorld,
    title: String,
    lane: String,
) -> Result<(), eyre::Report> {
    let id = world.id_of(&title)?;
    let result = run_async(world.board()?.move_to_lane(id, &lane, None));
    world.last_error = result.err();
    Ok(())
}

#[when(r#"item "{title}" is created without a lane"#)]
fn item_created_in_default_lane(
    world: &mut BoardOrderingWorld,
    title: String,
) -> Result<(), eyre::Report> {
    let created = run_async(world.board()?.create_item(CreateItemRequest::new(title.as_str())))
        .wrap_err("create item in default lane")?;
    world.ids_by_title.insert(title, created.id());
    Ok(())
}

#[when(r#"item "{title}" is created with the raw tags {tags}"#)]
fn item_created_with_raw_tags(
    world: &mut BoardOrderingWorld,
    title: String,
    tags: String,
) -> Result<(), eyre::Report> {
    let raw: Vec<String> = serde_json::from_str(&tags).wrap_err("parse raw tag list")?;
    let request = CreateItemRequest::new(title.as_str()).with_tags(raw);
    let created = run_async(world.board()?.create_item(request)).wrap_err("create tagged item")?;
    world.ids_by_title.insert(title, created.id());
    Ok(())
}
