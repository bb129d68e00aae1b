//! Diesel row models for board item persistence.

use super::schema::board_items;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for board items.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = board_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ItemRow {
    /// Item identifier.
    pub id: uuid::Uuid,
    /// Item title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Tag list JSON payload.
    pub tags: Value,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Lane of a top-level item.
    pub lane: Option<String>,
    /// Owning item of a sub-item.
    pub parent_id: Option<uuid::Uuid>,
    /// Position within the partition.
    pub order_key: i64,
    /// Archive flag.
    pub archived: bool,
    /// Completion flag.
    pub completed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for board items.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = board_items)]
pub struct NewItemRow {
    /// Item identifier.
    pub id: uuid::Uuid,
    /// Item fields shared with updates.
    #[diesel(embed)]
    pub fields: ItemChangeset,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Full-row changeset applied on replace.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = board_items)]
#[diesel(treat_none_as_null = true)]
pub struct ItemChangeset {
    /// Item title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Tag list JSON payload.
    pub tags: Value,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Lane of a top-level item.
    pub lane: Option<String>,
    /// Owning item of a sub-item.
    pub parent_id: Option<uuid::Uuid>,
    /// Position within the partition.
    pub order_key: i64,
    /// Archive flag.
    pub archived: bool,
    /// Completion flag.
    pub completed: bool,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Row produced by the distinct tag query.
#[derive(Debug, Clone, QueryableByName)]
pub struct TagRow {
    /// One distinct tag.
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub tag: String,
}
