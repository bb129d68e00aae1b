//! Allow-listed partial updates for items and sub-items.

use super::BoardDomainError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Partial update applied through the single item update contract.
///
/// Only the fields declared here can be changed; unknown fields in a wire
/// payload are rejected. Top-level items accept every field except
/// `completed`; sub-items accept only `title` and `completed`. Order keys
/// are never patched and change only through batch reordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ItemPatch {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement description; `Some(None)` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub description: Option<Option<String>>,
    /// Replacement tag list, sanitized before use.
    pub tags: Option<Vec<String>>,
    /// Replacement due date; `Some(None)` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub due_date: Option<Option<NaiveDate>>,
    /// Target lane name.
    pub lane: Option<String>,
    /// Archive flag.
    pub archived: Option<bool>,
    /// Sub-item completion flag.
    pub completed: Option<bool>,
}

/// Distinguishes an explicit `null` from an absent field.
fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl ItemPatch {
    /// Decodes a patch from a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::MalformedPayload`] for invalid JSON,
    /// wrongly typed values, or fields outside the allow-list.
    pub fn from_json(payload: &str) -> Result<Self, BoardDomainError> {
        serde_json::from_str(payload)
            .map_err(|err| BoardDomainError::MalformedPayload(err.to_string()))
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    /// Clears the description.
    #[must_use]
    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }

    /// Sets the tag list.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the due date.
    #[must_use]
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(Some(due_date));
        self
    }

    /// Clears the due date.
    #[must_use]
    pub fn clear_due_date(mut self) -> Self {
        self.due_date = Some(None);
        self
    }

    /// Sets the target lane.
    #[must_use]
    pub fn with_lane(mut self, lane: impl Into<String>) -> Self {
        self.lane = Some(lane.into());
        self
    }

    /// Sets the archive flag.
    #[must_use]
    pub fn with_archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    /// Sets the completion flag.
    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Removes and returns the lane change, leaving the other fields.
    pub fn take_lane(&mut self) -> Option<String> {
        self.lane.take()
    }

    /// Returns whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present_fields().next().is_none()
    }

    /// Iterates the wire names of the fields this patch sets.
    pub fn present_fields(&self) -> impl Iterator<Item = &'static str> {
        [
            ("title", self.title.is_some()),
            ("description", self.description.is_some()),
            ("tags", self.tags.is_some()),
            ("dueDate", self.due_date.is_some()),
            ("lane", self.lane.is_some()),
            ("archived", self.archived.is_some()),
            ("completed", self.completed.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
    }
}
