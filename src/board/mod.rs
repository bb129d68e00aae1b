//! Lane-structured board management for Corkboard.
//!
//! The board context keeps a client-visible ordering of items consistent
//! across lane changes, intra-lane reordering, and optimistic updates that
//! may fail and need rolling back. It follows hexagonal architecture:
//!
//! - Domain values, the order sequencer, and the board projection in
//!   [`domain`]
//! - The storage collaborator contract in [`ports`]
//! - In-memory and `PostgreSQL` storage adapters in [`adapters`]
//! - The item store, move/reorder coordinator, and presentation-facing
//!   board service in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
