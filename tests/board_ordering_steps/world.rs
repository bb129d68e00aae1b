//! Shared world state for board ordering BDD scenarios.

use std::{collections::HashMap, sync::Arc};

use corkboard::board::{
    adapters::memory::InMemoryItemStorage,
    domain::{ItemId, LaneId},
    services::{BoardService, BoardServiceError},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Board type used by the BDD world.
pub type TestBoard = BoardService<InMemoryItemStorage, DefaultClock>;

/// Scenario world for board ordering behaviour tests.
pub struct BoardOrderingWorld {
    pub storage: Arc<InMemoryItemStorage>,
    pub board: Option<TestBoard>,
    pub ids_by_title: HashMap<String, ItemId>,
    pub last_error: Option<BoardServiceError>,
}

impl BoardOrderingWorld {
    /// Creates a world over fresh in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: Arc::new(InMemoryItemStorage::new()),
            board: None,
            ids_by_title: HashMap::new(),
            last_error: None,
        }
    }

    /// Returns the opened board.
    ///
    /// # Errors
    ///
    /// Returns an error if no step has opened the board yet.
    pub fn board(&self) -> Result<&TestBoard, eyre::Report> {
        self.board
            .as_ref()
            .ok_or_else(|| eyre::eyre!("board has not been opened in scenario world"))
    }

    /// Resolves an item title recorded by an earlier step.
    ///
    /// # Errors
    ///
    /// Returns an error if no item with `title` was created.
    pub fn id_of(&self, title: &str) -> Result<ItemId, eyre::Report> {
        self.ids_by_title
            .get(title)
            .copied()
            .ok_or_else(|| eyre::eyre!("no item titled {title:?} in scenario world"))
    }

    /// Resolves a comma-separated list of titles.
    ///
    /// # Errors
    ///
    /// Returns an error if any title is unknown.
    pub fn ids_of(&self, titles: &str) -> Result<Vec<ItemId>, eyre::Report> {
        split_titles(titles).map(|title| self.id_of(title)).collect()
    }

    /// Returns the titles shown in a lane of the current projection.
    ///
    /// # Errors
    ///
    /// Returns an error if the board is not open or the lane is invalid.
    pub fn shown_titles(&self, lane: &str) -> Result<Vec<String>, eyre::Report> {
        let lane_id = LaneId::new(lane)?;
        let projection = self.board()?.projection();
        let views = projection
            .lane(&lane_id)
            .ok_or_else(|| eyre::eyre!("lane {lane} is not on the board"))?;
        Ok(views.iter().map(|view| view.item.title().to_owned()).collect())
    }
}

impl Default for BoardOrderingWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits `"X, Y, Z"` into its titles.
pub fn split_titles(titles: &str) -> impl Iterator<Item = &str> {
    titles
        .split(',')
        .map(str::trim)
        .filter(|title| !title.is_empty())
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> BoardOrderingWorld {
    BoardOrderingWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
