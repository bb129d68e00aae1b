//! Board item aggregate and its ordering partition.

use super::{BoardDomainError, ItemId, ItemPatch, LaneId, LaneSet, Tags};
use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use serde::{Serialize, Serializer, ser::SerializeStruct};
use std::fmt;

/// Patch fields legal on top-level items.
const TOP_LEVEL_FIELDS: &[&str] = &["title", "description", "tags", "dueDate", "lane", "archived"];

/// Patch fields legal on sub-items.
const SUB_ITEM_FIELDS: &[&str] = &["title", "completed"];

/// Maximum title length in characters, measured after trimming.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Partition in which an item's order key is unique.
///
/// Top-level items are ordered per lane; sub-items are ordered per parent
/// and never carry a lane of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderScope {
    /// Top-level items of one lane.
    Lane(LaneId),
    /// Sub-items of one top-level item.
    SubItems(ItemId),
}

impl OrderScope {
    /// Returns the lane for lane partitions.
    #[must_use]
    pub const fn lane(&self) -> Option<&LaneId> {
        match self {
            Self::Lane(lane) => Some(lane),
            Self::SubItems(_) => None,
        }
    }

    /// Returns the parent identifier for sub-item partitions.
    #[must_use]
    pub const fn parent_id(&self) -> Option<ItemId> {
        match self {
            Self::Lane(_) => None,
            Self::SubItems(parent_id) => Some(*parent_id),
        }
    }
}

impl fmt::Display for OrderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lane(lane) => write!(f, "lane:{lane}"),
            Self::SubItems(parent_id) => write!(f, "parent:{parent_id}"),
        }
    }
}

impl Serialize for OrderScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("OrderScope", 2)?;
        state.serialize_field("lane", &self.lane())?;
        state.serialize_field("parentId", &self.parent_id())?;
        state.end()
    }
}

/// Validated descriptive fields for a new top-level item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    title: String,
    description: Option<String>,
    tags: Tags,
    due_date: Option<NaiveDate>,
}

impl ItemDraft {
    /// Creates a draft with a validated title.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::EmptyTitle`] when the title is blank and
    /// [`BoardDomainError::TitleTooLong`] past [`MAX_TITLE_LENGTH`].
    pub fn new(title: impl Into<String>) -> Result<Self, BoardDomainError> {
        Ok(Self {
            title: validate_title(title.into())?,
            description: None,
            tags: Tags::default(),
            due_date: None,
        })
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the sanitized tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the due date.
    #[must_use]
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Returns the validated title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Board item: a top-level task or a sub-item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    id: ItemId,
    title: String,
    description: Option<String>,
    tags: Tags,
    due_date: Option<NaiveDate>,
    #[serde(flatten)]
    scope: OrderScope,
    order: u32,
    archived: bool,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedItemData {
    /// Persisted identifier.
    pub id: ItemId,
    /// Persisted title.
    pub title: String,
    /// Persisted description, if any.
    pub description: Option<String>,
    /// Persisted tags.
    pub tags: Tags,
    /// Persisted due date, if any.
    pub due_date: Option<NaiveDate>,
    /// Persisted ordering partition.
    pub scope: OrderScope,
    /// Persisted order key.
    pub order: u32,
    /// Persisted archive flag.
    pub archived: bool,
    /// Persisted completion flag.
    pub completed: bool,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Creates a top-level item in the given lane at the given position.
    #[must_use]
    pub fn new_top_level(draft: ItemDraft, lane: LaneId, order: u32, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: ItemId::new(),
            title: draft.title,
            description: draft.description,
            tags: draft.tags,
            due_date: draft.due_date,
            scope: OrderScope::Lane(lane),
            order,
            archived: false,
            completed: false,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Creates a sub-item owned by `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::NestedSubItem`] when `parent` is itself a
    /// sub-item and [`BoardDomainError::EmptyTitle`] or
    /// [`BoardDomainError::TitleTooLong`] for an invalid title.
    pub fn new_sub_item(
        parent: &Self,
        title: impl Into<String>,
        order: u32,
        clock: &impl Clock,
    ) -> Result<Self, BoardDomainError> {
        if parent.is_sub_item() {
            return Err(BoardDomainError::NestedSubItem(parent.id));
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: ItemId::new(),
            title: validate_title(title.into())?,
            description: None,
            tags: Tags::default(),
            due_date: None,
            scope: OrderScope::SubItems(parent.id),
            order,
            archived: false,
            completed: false,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs an item from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::SelfParent`] when the stored parent
    /// reference points at the item itself.
    pub fn try_from_persisted(data: PersistedItemData) -> Result<Self, BoardDomainError> {
        if data.scope.parent_id() == Some(data.id) {
            return Err(BoardDomainError::SelfParent(data.id));
        }
        Ok(Self {
            id: data.id,
            title: data.title,
            description: data.description,
            tags: data.tags,
            due_date: data.due_date,
            scope: data.scope,
            order: data.order,
            archived: data.archived,
            completed: data.completed,
            created_at: data.created_at,
            updated_at: data.updated_at,
        })
    }

    /// Returns the item identifier.
    #[must_use]
    pub const fn id(&self) -> ItemId {
        self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the tags.
    #[must_use]
    pub const fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Returns the due date, if any.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Returns the ordering partition.
    #[must_use]
    pub const fn scope(&self) -> &OrderScope {
        &self.scope
    }

    /// Returns the lane of a top-level item.
    #[must_use]
    pub const fn lane(&self) -> Option<&LaneId> {
        self.scope.lane()
    }

    /// Returns the owning item of a sub-item.
    #[must_use]
    pub const fn parent_id(&self) -> Option<ItemId> {
        self.scope.parent_id()
    }

    /// Returns whether this is a sub-item.
    #[must_use]
    pub const fn is_sub_item(&self) -> bool {
        matches!(self.scope, OrderScope::SubItems(_))
    }

    /// Returns the order key within the partition.
    #[must_use]
    pub const fn order(&self) -> u32 {
        self.order
    }

    /// Returns whether the item is archived.
    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.archived
    }

    /// Returns whether the sub-item is completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies an allow-listed patch.
    ///
    /// Every field is validated before any is written, so a rejected patch
    /// leaves the item untouched.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::FieldNotAllowed`] for fields illegal on
    /// this kind of item, and title, tag, or lane validation failures.
    pub fn apply_patch(
        &mut self,
        patch: &ItemPatch,
        lanes: &LaneSet,
        clock: &impl Clock,
    ) -> Result<(), BoardDomainError> {
        self.ensure_fields_allowed(patch)?;
        let title = patch.title.clone().map(validate_title).transpose()?;
        let tags = patch.tags.as_ref().map(Tags::sanitize).transpose()?;
        let lane = patch
            .lane
            .as_deref()
            .map(|name| lanes.resolve(name))
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(tags) = tags {
            self.tags = tags;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(lane) = lane {
            self.scope = OrderScope::Lane(lane);
        }
        if let Some(archived) = patch.archived {
            self.archived = archived;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        self.touch(clock);
        Ok(())
    }

    /// Moves a top-level item to another lane, keeping its order key.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::SubItemsHaveNoLane`] for sub-items.
    pub fn move_to_lane(&mut self, lane: LaneId, clock: &impl Clock) -> Result<(), BoardDomainError> {
        if self.is_sub_item() {
            return Err(BoardDomainError::SubItemsHaveNoLane(self.id));
        }
        self.scope = OrderScope::Lane(lane);
        self.touch(clock);
        Ok(())
    }

    /// Assigns a new order key, stamping the mutation time.
    pub const fn assign_order(&mut self, order: u32, at: DateTime<Utc>) {
        self.order = order;
        self.updated_at = at;
    }

    /// Sets the archive flag.
    pub fn set_archived(&mut self, archived: bool, clock: &impl Clock) {
        self.archived = archived;
        self.touch(clock);
    }

    /// Sets the completion flag of a sub-item.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::NotASubItem`] for top-level items.
    pub fn set_completed(&mut self, completed: bool, clock: &impl Clock) -> Result<(), BoardDomainError> {
        if !self.is_sub_item() {
            return Err(BoardDomainError::NotASubItem(self.id));
        }
        self.completed = completed;
        self.touch(clock);
        Ok(())
    }

    fn ensure_fields_allowed(&self, patch: &ItemPatch) -> Result<(), BoardDomainError> {
        let (kind, allowed) = if self.is_sub_item() {
            ("a sub-item", SUB_ITEM_FIELDS)
        } else {
            ("a top-level item", TOP_LEVEL_FIELDS)
        };
        match patch.present_fields().find(|field| !allowed.contains(field)) {
            Some(field) => Err(BoardDomainError::FieldNotAllowed { field, kind }),
            None => Ok(()),
        }
    }

    /// Updates the `updated_at` timestamp to the current clock time.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}

fn validate_title(raw: String) -> Result<String, BoardDomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BoardDomainError::EmptyTitle);
    }
    let length = trimmed.chars().count();
    if length > MAX_TITLE_LENGTH {
        return Err(BoardDomainError::TitleTooLong {
            length,
            max: MAX_TITLE_LENGTH,
        });
    }
    Ok(trimmed.to_owned())
}
