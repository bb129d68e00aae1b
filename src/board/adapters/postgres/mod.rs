//! `PostgreSQL` adapters for board item persistence.

mod models;
mod repository;
mod schema;

pub use repository::{BoardPgPool, PostgresItemStorage};
