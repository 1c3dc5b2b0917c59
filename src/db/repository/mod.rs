//! Repository layer: entity-scoped database operations.
//!
//! Free functions over `&rusqlite::Connection`, one sub-module per table.

mod audit;
mod patient;
mod triage;

pub use audit::*;
pub use patient::*;
pub use triage::*;
