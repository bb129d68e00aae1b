//! Lane-partitioned, order-sorted board view.
//!
//! [`project`] is a pure function of an item snapshot and the lane set. Sub-
//! items are grouped in the same pass as their parents, so a projection never
//! needs a per-item lookup.

use super::{Item, ItemId, LaneId, LaneSet};
use serde::Serialize;
use std::collections::HashMap;

/// Options controlling which items a projection includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionOptions {
    /// Include archived items and archived sub-items.
    pub include_archived: bool,
}

/// Completion counts for an item's sub-items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubItemSummary {
    /// Number of sub-items.
    pub total: usize,
    /// Number of completed sub-items.
    pub completed: usize,
}

/// A top-level item with its resolved sub-items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    /// The top-level item.
    pub item: Item,
    /// Sub-items in order.
    pub sub_items: Vec<Item>,
    /// Sub-item completion counts.
    pub summary: SubItemSummary,
}

/// One lane of the board with its items in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneColumn {
    /// Lane shown by this column.
    pub lane: LaneId,
    /// Items in ascending order.
    pub items: Vec<ItemView>,
}

/// Presentation-ready board: one column per configured lane, in configured
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardProjection {
    columns: Vec<LaneColumn>,
}

impl BoardProjection {
    /// Creates a projection with an empty column per lane.
    #[must_use]
    pub fn empty(lanes: &LaneSet) -> Self {
        Self {
            columns: lanes
                .iter()
                .map(|lane| LaneColumn {
                    lane: lane.clone(),
                    items: Vec::new(),
                })
                .collect(),
        }
    }

    /// Returns all columns in configured order.
    #[must_use]
    pub fn columns(&self) -> &[LaneColumn] {
        &self.columns
    }

    /// Returns the items of one lane, or `None` for an unconfigured lane.
    #[must_use]
    pub fn lane(&self, lane: &LaneId) -> Option<&[ItemView]> {
        self.columns
            .iter()
            .find(|column| &column.lane == lane)
            .map(|column| column.items.as_slice())
    }

    /// Returns the identifiers shown in a lane, in order.
    #[must_use]
    pub fn lane_ids(&self, lane: &LaneId) -> Vec<ItemId> {
        self.lane(lane)
            .map(|views| views.iter().map(|view| view.item.id()).collect())
            .unwrap_or_default()
    }

    /// Finds the view of a top-level item.
    #[must_use]
    pub fn find(&self, id: ItemId) -> Option<&ItemView> {
        self.columns
            .iter()
            .flat_map(|column| column.items.iter())
            .find(|view| view.item.id() == id)
    }

    /// Returns the total number of top-level items shown.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.columns.iter().map(|column| column.items.len()).sum()
    }
}

/// Builds the board projection from an item snapshot.
///
/// Top-level items whose lane is not configured are shown in the default
/// lane and a warning is logged. Sub-items of hidden parents are dropped
/// with their parent.
#[must_use]
pub fn project<'a>(
    items: impl IntoIterator<Item = &'a Item>,
    lanes: &LaneSet,
    options: ProjectionOptions,
) -> BoardProjection {
    let mut projection = BoardProjection::empty(lanes);
    let mut top_level: Vec<(usize, &Item)> = Vec::new();
    let mut sub_items: HashMap<ItemId, Vec<&Item>> = HashMap::new();

    for item in items {
        if item.is_archived() && !options.include_archived {
            continue;
        }
        match (item.lane(), item.parent_id()) {
            (_, Some(parent_id)) => sub_items.entry(parent_id).or_default().push(item),
            (Some(lane), None) => top_level.push((column_index(lanes, lane, item), item)),
            (None, None) => {}
        }
    }

    top_level.sort_by_key(|(_, item)| (item.order(), item.created_at(), item.id()));
    for (index, item) in top_level {
        let mut children = sub_items.remove(&item.id()).unwrap_or_default();
        children.sort_by_key(|child| (child.order(), child.created_at(), child.id()));
        let summary = SubItemSummary {
            total: children.len(),
            completed: children.iter().filter(|child| child.is_completed()).count(),
        };
        let view = ItemView {
            item: item.clone(),
            sub_items: children.into_iter().cloned().collect(),
            summary,
        };
        if let Some(column) = projection.columns.get_mut(index) {
            column.items.push(view);
        }
    }
    projection
}

fn column_index(lanes: &LaneSet, lane: &LaneId, item: &Item) -> usize {
    lanes.position(lane).unwrap_or_else(|| {
        tracing::warn!(
            item_id = %item.id(),
            lane = %lane,
            fallback = %lanes.default_lane(),
            "item lane is not configured; showing it in the default lane"
        );
        0
    })
}
