//! Corkboard: lane-structured task board engine.
//!
//! This crate keeps a client-visible ordering of board items consistent
//! across lane changes, drag-and-drop reordering, and optimistic updates
//! that may fail and need rolling back.
//!
//! # Architecture
//!
//! Corkboard follows hexagonal architecture principles:
//!
//! - **Domain**: Items, lanes, the order sequencer, and the board projection
//! - **Ports**: The storage collaborator contract
//! - **Adapters**: In-memory and `PostgreSQL` storage
//! - **Services**: Item store, move/reorder coordinator, and board service
//!
//! # Modules
//!
//! - [`board`]: Board items, lanes, ordering, and presentation intents

pub mod board;
