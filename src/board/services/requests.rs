//! Request and response payloads exchanged with the presentation layer.
//!
//! Every request rejects unknown fields, so arbitrary JSON can never reach
//! storage.

use crate::board::{
    domain::{BoardDomainError, BoardProjection, ItemId},
    ports::BatchOrderCounts,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::BTreeSet;

fn decode<T: DeserializeOwned>(payload: &str) -> Result<T, BoardDomainError> {
    serde_json::from_str(payload).map_err(|err| BoardDomainError::MalformedPayload(err.to_string()))
}

/// Payload for creating a top-level item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateItemRequest {
    /// Item title; must not be blank.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Raw tags, sanitized on creation.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Target lane; the board's first lane when absent.
    #[serde(default)]
    pub lane: Option<String>,
}

impl CreateItemRequest {
    /// Creates a request with only a title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            tags: Vec::new(),
            due_date: None,
            lane: None,
        }
    }

    /// Decodes a request from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::MalformedPayload`] when decoding fails.
    pub fn from_json(payload: &str) -> Result<Self, BoardDomainError> {
        decode(payload)
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the raw tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the due date.
    #[must_use]
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the target lane.
    #[must_use]
    pub fn with_lane(mut self, lane: impl Into<String>) -> Self {
        self.lane = Some(lane.into());
        self
    }
}

/// Payload for adding a sub-item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddSubItemRequest {
    /// Sub-item title.
    pub title: String,
}

impl AddSubItemRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Decodes a request from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::MalformedPayload`] when decoding fails.
    pub fn from_json(payload: &str) -> Result<Self, BoardDomainError> {
        decode(payload)
    }
}

/// Payload for moving an item to a lane.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MoveToLaneRequest {
    /// Item to move.
    pub item_id: ItemId,
    /// Target lane name.
    pub lane: String,
    /// Item to insert before; the end of the lane when absent.
    #[serde(default)]
    pub before_item_id: Option<ItemId>,
}

impl MoveToLaneRequest {
    /// Decodes a request from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::MalformedPayload`] when decoding fails.
    pub fn from_json(payload: &str) -> Result<Self, BoardDomainError> {
        decode(payload)
    }
}

/// One entry of a batch reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderUpdate {
    /// Item to position.
    pub id: ItemId,
    /// Requested position; only the relative order matters.
    pub order: i64,
}

/// Batch reorder request: `{lane, updates: [{id, order}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderLaneRequest {
    /// Lane being reordered.
    pub lane: String,
    /// Requested positions.
    pub updates: Vec<ReorderUpdate>,
}

impl ReorderLaneRequest {
    /// Decodes a request from JSON.
    ///
    /// Non-numeric orders fail here as malformed payloads.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::MalformedPayload`] when decoding fails.
    pub fn from_json(payload: &str) -> Result<Self, BoardDomainError> {
        decode(payload)
    }

    /// Returns the identifiers sorted by requested order.
    ///
    /// Entries with equal orders keep their request position.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::InvalidOrder`] for negative orders.
    pub fn desired_sequence(&self) -> Result<Vec<ItemId>, BoardDomainError> {
        if let Some(update) = self.updates.iter().find(|update| update.order < 0) {
            return Err(BoardDomainError::InvalidOrder(update.order));
        }
        let mut updates = self.updates.clone();
        updates.sort_by_key(|update| update.order);
        Ok(updates.into_iter().map(|update| update.id).collect())
    }
}

/// Batch reorder response: `{matchedCount, modifiedCount}`.
///
/// `matched_count` below the request size signals that some items had left
/// the lane; it is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOrderResponse {
    /// Items found in the lane.
    pub matched_count: u64,
    /// Items whose order changed.
    pub modified_count: u64,
}

impl From<BatchOrderCounts> for BatchOrderResponse {
    fn from(counts: BatchOrderCounts) -> Self {
        Self {
            matched_count: counts.matched,
            modified_count: counts.modified,
        }
    }
}

/// Filter for listing top-level items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ItemFilter {
    /// Restrict to one lane.
    pub lane: Option<String>,
    /// Restrict to items carrying any of these tags.
    pub tags: Vec<String>,
    /// Include archived items.
    pub include_archived: bool,
}

impl ItemFilter {
    /// Decodes a filter from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::MalformedPayload`] when decoding fails.
    pub fn from_json(payload: &str) -> Result<Self, BoardDomainError> {
        decode(payload)
    }

    /// Restricts to one lane.
    #[must_use]
    pub fn in_lane(mut self, lane: impl Into<String>) -> Self {
        self.lane = Some(lane.into());
        self
    }

    /// Restricts to items carrying any of the given tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Includes archived items.
    #[must_use]
    pub fn including_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }
}

/// What the presentation layer renders: the projection plus every tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardSnapshot {
    /// Lane-partitioned board.
    pub projection: BoardProjection,
    /// Every distinct tag in storage.
    pub tags: BTreeSet<String>,
}
