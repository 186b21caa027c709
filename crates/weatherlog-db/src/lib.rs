//! Data layer for the weatherlog pipeline (`SQLite`).
//!
//! Readings are appended to a single `weather_log` table and never updated.
//! `SQLite` runs in WAL mode, which serializes writers internally while
//! letting readers proceed against the last committed state, so the
//! scheduler's append path and the query path never need a shared lock.
//!
//! ```text
//! Scheduler cycle --append--> ReadingStore --INSERT ... RETURNING id--> weather_log
//! QueryService  --snapshot--> ReadingStore --SELECT ... ORDER BY id DESC--^
//! ```
//!
//! # Modules
//!
//! - [`sqlite`] -- Connection pool and configuration
//! - [`reading_store`] -- Append and recency queries on `weather_log`
//! - [`error`] -- Shared error types

pub mod error;
pub mod reading_store;
pub mod sqlite;

// Re-export primary types for convenience.
pub use error::DbError;
pub use reading_store::{ReadingRow, ReadingStore};
pub use sqlite::{SqliteConfig, SqlitePool};

// Re-exported so callers can name `sqlx::Error` without their own dependency.
pub use sqlx;
