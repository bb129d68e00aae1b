//! Step definitions for board ordering behaviour tests.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
