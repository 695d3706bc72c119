//! chatlens storage crate - the record store.
//!
//! Provides a pooled, WAL-mode SQLite database with migrations, repositories
//! for users, conversation turns and attachments, projections for the
//! analytics engine, and the async `RecordStore` seam used by the pipeline.

pub mod db;
pub mod migrations;
pub mod queries;
pub mod repository;
pub mod store;

pub use db::Database;
pub use queries::{AnalyticsQueries, DbStats, TurnRow, UserRow};
pub use repository::{AttachmentRepository, TurnRepository, UserRepository};
pub use store::{RecordStore, SqliteRecordStore};
