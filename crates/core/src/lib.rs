//! Core domain logic shared across the newsart workspace.
//!
//! Pure logic only: naming conventions for delivered artifacts,
//! workflow template mutation, and the shared error/type aliases.
//! No I/O beyond reading a workflow file from disk.

pub mod error;
pub mod naming;
pub mod workflow;

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
