//! Domain model for the board.
//!
//! Items, lanes, and tags are validated values; ordering and projection are
//! pure functions over them. Nothing in this module performs I/O.

mod config;
mod error;
mod ids;
mod item;
mod lane;
mod patch;
pub mod projection;
pub mod sequencer;
mod tags;

pub use config::BoardConfig;
pub use error::BoardDomainError;
pub use ids::ItemId;
pub use item::{Item, ItemDraft, MAX_TITLE_LENGTH, OrderScope, PersistedItemData};
pub use lane::{LaneId, LaneSet, MAX_LANE_LENGTH};
pub use patch::ItemPatch;
pub use projection::{BoardProjection, ItemView, LaneColumn, ProjectionOptions, SubItemSummary};
pub use sequencer::OrderAssignment;
pub use tags::{MAX_TAG_LENGTH, Tags};
