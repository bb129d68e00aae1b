//! Application services for the board.
//!
//! [`ItemStore`] owns the item lifecycle over storage, [`BoardCache`] holds
//! the optimistic snapshot and publishes projections, [`MoveCoordinator`]
//! runs lane moves and reorders, and [`BoardService`] dispatches the
//! presentation intents.

mod board;
mod cache;
mod coordinator;
mod error;
mod requests;
mod store;

pub use board::BoardService;
pub use cache::{BoardCache, Checkpoint};
pub use coordinator::{MoveCoordinator, OperationPhase};
pub use error::{BoardServiceError, BoardServiceResult, RejectedReorderEntry, ReorderRejection};
pub use requests::{
    AddSubItemRequest, BatchOrderResponse, BoardSnapshot, CreateItemRequest, ItemFilter,
    MoveToLaneRequest, ReorderLaneRequest, ReorderUpdate,
};
pub use store::ItemStore;
