//! Read-only facade over the reading store.

use weatherlog_db::{DbError, ReadingStore};
use weatherlog_types::{Reading, Snapshot};

/// What the presentation layer reads: the current reading and its history.
///
/// Holds its own handle on the store, so reads never wait for the scheduler
/// beyond the storage engine's own locking.
#[derive(Debug, Clone)]
pub struct QueryService {
    store: ReadingStore,
    location: String,
}

impl QueryService {
    /// Create a query service for readings taken at `location`.
    pub fn new(store: ReadingStore, location: impl Into<String>) -> Self {
        Self {
            store,
            location: location.into(),
        }
    }

    /// Label of the monitored site.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The latest reading and everything stored before it, newest first.
    ///
    /// Both halves come from one read, so `current` is always newer than
    /// every entry in `history`. An empty store yields
    /// [`Snapshot::empty`], not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Read`] if the store cannot be read.
    pub async fn snapshot(&self) -> Result<Snapshot, DbError> {
        self.store.snapshot().await
    }

    /// The most recent reading, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Read`] if the store cannot be read.
    pub async fn latest(&self) -> Result<Option<Reading>, DbError> {
        self.store.latest().await
    }

    /// Stored readings, newest first.
    ///
    /// With `excluding_latest` the current reading is left out, giving the
    /// history list on its own. Prefer [`snapshot`](Self::snapshot) when the
    /// current reading is needed too, since two separate calls can straddle
    /// an append.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Read`] if the store cannot be read.
    pub async fn history(&self, excluding_latest: bool) -> Result<Vec<Reading>, DbError> {
        self.store.history(excluding_latest).await
    }

    /// Number of readings stored so far.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Read`] if the store cannot be read.
    pub async fn count(&self) -> Result<u64, DbError> {
        self.store.count().await
    }
}
