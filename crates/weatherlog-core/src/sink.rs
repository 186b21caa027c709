//! Where the scheduler puts readings.
//!
//! [`ReadingSink`] is the write half of the store as the scheduler sees it.
//! The production implementation is [`ReadingStore`]; tests substitute
//! in-memory sinks with injected delays or faults.

use std::future::Future;

use weatherlog_db::{DbError, ReadingStore};
use weatherlog_types::{NewReading, Reading};

/// Durable, append-only destination for readings.
pub trait ReadingSink: Send + Sync + 'static {
    /// Persist `reading` atomically and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Write`] if nothing was committed.
    fn persist(
        &self,
        reading: &NewReading,
    ) -> impl Future<Output = Result<Reading, DbError>> + Send;
}

impl ReadingSink for ReadingStore {
    async fn persist(&self, reading: &NewReading) -> Result<Reading, DbError> {
        self.append(reading).await
    }
}
