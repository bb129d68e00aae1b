//! `PostgreSQL` storage implementation for board items.

use super::{
    models::{ItemChangeset, ItemRow, NewItemRow, TagRow},
    schema::board_items,
};
use crate::board::{
    domain::{Item, ItemId, LaneId, OrderAssignment, OrderScope, PersistedItemData, Tags},
    ports::{
        BatchOrderCounts, ItemQuery, ItemStorage, ItemStorageError, ItemStorageResult,
        PlacementFilter,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// `PostgreSQL` connection pool type used by board adapters.
pub type BoardPgPool = Pool<ConnectionManager<PgConnection>>;

/// Pause between readiness probes.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// `PostgreSQL`-backed item storage.
#[derive(Debug, Clone)]
pub struct PostgresItemStorage {
    pool: BoardPgPool,
}

impl PostgresItemStorage {
    /// Creates a new storage from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: BoardPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> ItemStorageResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ItemStorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ItemStorageError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(ItemStorageError::persistence)?
    }
}

/// A stored row must carry exactly one of lane and parent.
#[derive(Debug, Error)]
#[error("item {0} must have exactly one of lane or parent_id set")]
struct InvalidPlacement(uuid::Uuid);

/// Failure inside the cascade delete transaction.
#[derive(Debug)]
enum CascadeError {
    Missing,
    SubItems(DieselError),
    Other(DieselError),
}

impl From<DieselError> for CascadeError {
    fn from(err: DieselError) -> Self {
        Self::Other(err)
    }
}

impl CascadeError {
    fn into_storage_error(self, id: ItemId) -> ItemStorageError {
        match self {
            Self::Missing => ItemStorageError::NotFound(id),
            Self::SubItems(err) => ItemStorageError::cascade(id, err),
            Self::Other(err) => ItemStorageError::persistence(err),
        }
    }
}

#[async_trait]
impl ItemStorage for PostgresItemStorage {
    async fn wait_until_ready(&self, timeout: Duration) -> ItemStorageResult<()> {
        let probe = async {
            loop {
                let attempt = self
                    .run_blocking(|connection| {
                        diesel::sql_query("SELECT 1")
                            .execute(connection)
                            .map_err(ItemStorageError::persistence)?;
                        Ok(())
                    })
                    .await;
                match attempt {
                    Ok(()) => return,
                    Err(err) => {
                        tracing::debug!(error = %err, "storage not ready yet");
                        tokio::time::sleep(READY_POLL_INTERVAL).await;
                    }
                }
            }
        };
        tokio::time::timeout(timeout, probe)
            .await
            .map_err(|_| ItemStorageError::NotReady(timeout))
    }

    async fn insert(&self, item: &Item) -> ItemStorageResult<()> {
        let item_id = item.id();
        let new_row = to_new_row(item)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(board_items::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        ItemStorageError::DuplicateItem(item_id)
                    }
                    _ => ItemStorageError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: ItemId) -> ItemStorageResult<Option<Item>> {
        self.run_blocking(move |connection| {
            let row = board_items::table
                .filter(board_items::id.eq(id.into_inner()))
                .select(ItemRow::as_select())
                .first::<ItemRow>(connection)
                .optional()
                .map_err(ItemStorageError::persistence)?;
            row.map(row_to_item).transpose()
        })
        .await
    }

    async fn find(&self, query: &ItemQuery) -> ItemStorageResult<Vec<Item>> {
        let filter = query.clone();
        self.run_blocking(move |connection| {
            let mut statement = board_items::table.select(ItemRow::as_select()).into_boxed();
            statement = match &filter.placement {
                PlacementFilter::TopLevel => statement.filter(board_items::parent_id.is_null()),
                PlacementFilter::SubItemsOf(parents) => {
                    let parent_ids: Vec<uuid::Uuid> =
                        parents.iter().map(|parent| parent.into_inner()).collect();
                    statement.filter(board_items::parent_id.eq_any(parent_ids))
                }
                PlacementFilter::Any => statement,
            };
            if let Some(lane) = &filter.lane {
                statement = statement.filter(board_items::lane.eq(lane.as_str().to_owned()));
            }
            if !filter.include_archived {
                statement = statement.filter(board_items::archived.eq(false));
            }
            let rows = statement
                .order((
                    board_items::order_key.asc(),
                    board_items::created_at.asc(),
                    board_items::id.asc(),
                ))
                .load::<ItemRow>(connection)
                .map_err(ItemStorageError::persistence)?;

            // Tag filtering stays in Rust; the tag column is a JSON array.
            let mut items = Vec::with_capacity(rows.len());
            for row in rows {
                let item = row_to_item(row)?;
                if filter.matches_tags(&item) {
                    items.push(item);
                }
            }
            Ok(items)
        })
        .await
    }

    async fn replace(&self, item: &Item) -> ItemStorageResult<()> {
        let item_id = item.id();
        let changeset = to_changeset(item)?;
        self.run_blocking(move |connection| {
            let updated = diesel::update(board_items::table.find(item_id.into_inner()))
                .set(&changeset)
                .execute(connection)
                .map_err(ItemStorageError::persistence)?;
            if updated == 0 {
                return Err(ItemStorageError::NotFound(item_id));
            }
            Ok(())
        })
        .await
    }

    async fn delete_cascade(&self, id: ItemId) -> ItemStorageResult<u64> {
        self.run_blocking(move |connection| {
            let uuid = id.into_inner();
            let removed = connection
                .transaction::<usize, CascadeError, _>(|conn| {
                    let exists: i64 = board_items::table
                        .filter(board_items::id.eq(uuid))
                        .count()
                        .get_result(conn)?;
                    if exists == 0 {
                        return Err(CascadeError::Missing);
                    }
                    // Sub-items go first so a failure never strands orphans.
                    let sub_items = diesel::delete(
                        board_items::table.filter(board_items::parent_id.eq(uuid)),
                    )
                    .execute(conn)
                    .map_err(CascadeError::SubItems)?;
                    let parent = diesel::delete(board_items::table.find(uuid)).execute(conn)?;
                    Ok(sub_items + parent)
                })
                .map_err(|err| err.into_storage_error(id))?;
            u64::try_from(removed).map_err(ItemStorageError::persistence)
        })
        .await
    }

    async fn bulk_set_order(
        &self,
        scope: &OrderScope,
        assignments: &[OrderAssignment],
        updated_at: DateTime<Utc>,
    ) -> ItemStorageResult<BatchOrderCounts> {
        let partition = scope.clone();
        let planned = assignments.to_vec();
        self.run_blocking(move |connection| {
            connection
                .transaction::<BatchOrderCounts, DieselError, _>(|conn| {
                    let mut counts = BatchOrderCounts::default();
                    for assignment in &planned {
                        let uuid = assignment.id.into_inner();
                        let Some(current) = scoped_order_key(conn, uuid, &partition)? else {
                            continue;
                        };
                        counts.matched += 1;
                        let target = i64::from(assignment.order);
                        if current != target {
                            diesel::update(board_items::table.find(uuid))
                                .set((
                                    board_items::order_key.eq(target),
                                    board_items::updated_at.eq(updated_at),
                                ))
                                .execute(conn)?;
                            counts.modified += 1;
                        }
                    }
                    Ok(counts)
                })
                .map_err(ItemStorageError::persistence)
        })
        .await
    }

    async fn distinct_tags(&self) -> ItemStorageResult<BTreeSet<String>> {
        self.run_blocking(|connection| {
            let rows = diesel::sql_query(concat!(
                "SELECT DISTINCT t.tag AS tag FROM board_items ",
                "CROSS JOIN LATERAL jsonb_array_elements_text(board_items.tags) AS t(tag)",
            ))
            .load::<TagRow>(connection)
            .map_err(ItemStorageError::persistence)?;
            Ok(rows.into_iter().map(|row| row.tag).collect())
        })
        .await
    }
}

/// Reads and locks the order key of `id` if it still belongs to `scope`.
fn scoped_order_key(
    connection: &mut PgConnection,
    id: uuid::Uuid,
    scope: &OrderScope,
) -> QueryResult<Option<i64>> {
    match scope {
        OrderScope::Lane(lane) => board_items::table
            .filter(board_items::id.eq(id))
            .filter(board_items::parent_id.is_null())
            .filter(board_items::lane.eq(lane.as_str()))
            .select(board_items::order_key)
            .for_update()
            .first::<i64>(connection)
            .optional(),
        OrderScope::SubItems(parent_id) => board_items::table
            .filter(board_items::id.eq(id))
            .filter(board_items::parent_id.eq(parent_id.into_inner()))
            .select(board_items::order_key)
            .for_update()
            .first::<i64>(connection)
            .optional(),
    }
}

fn to_changeset(item: &Item) -> ItemStorageResult<ItemChangeset> {
    let tags = serde_json::to_value(item.tags()).map_err(ItemStorageError::persistence)?;
    Ok(ItemChangeset {
        title: item.title().to_owned(),
        description: item.description().map(str::to_owned),
        tags,
        due_date: item.due_date(),
        lane: item.lane().map(|lane| lane.as_str().to_owned()),
        parent_id: item.parent_id().map(ItemId::into_inner),
        order_key: i64::from(item.order()),
        archived: item.is_archived(),
        completed: item.is_completed(),
        updated_at: item.updated_at(),
    })
}

fn to_new_row(item: &Item) -> ItemStorageResult<NewItemRow> {
    Ok(NewItemRow {
        id: item.id().into_inner(),
        fields: to_changeset(item)?,
        created_at: item.created_at(),
    })
}

fn row_to_item(row: ItemRow) -> ItemStorageResult<Item> {
    let ItemRow {
        id,
        title,
        description,
        tags: persisted_tags,
        due_date,
        lane,
        parent_id,
        order_key,
        archived,
        completed,
        created_at,
        updated_at,
    } = row;

    let tags = serde_json::from_value::<Tags>(persisted_tags)
        .map_err(ItemStorageError::persistence)?;
    let scope = match (lane, parent_id) {
        (Some(name), None) => {
            OrderScope::Lane(LaneId::new(name).map_err(ItemStorageError::persistence)?)
        }
        (None, Some(parent)) => OrderScope::SubItems(ItemId::from_uuid(parent)),
        _ => return Err(ItemStorageError::persistence(InvalidPlacement(id))),
    };
    let order = u32::try_from(order_key).map_err(ItemStorageError::persistence)?;

    let data = PersistedItemData {
        id: ItemId::from_uuid(id),
        title,
        description,
        tags,
        due_date,
        scope,
        order,
        archived,
        completed,
        created_at,
        updated_at,
    };
    Item::try_from_persisted(data).map_err(ItemStorageError::persistence)
}
