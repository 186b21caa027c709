//! Reading store operations on the `weather_log` table.
//!
//! The table is append-only: readings are inserted once and never updated
//! or deleted here. Ids come from `AUTOINCREMENT`, so they grow strictly with
//! insertion order and are never handed out twice.
//!
//! All statements are parameterized; text fields from the provider are
//! bound, never spliced into SQL.

use weatherlog_types::{NewReading, Reading, ReadingId, Snapshot};

use crate::error::DbError;
use crate::sqlite::{SqliteConfig, SqlitePool};

/// Most recent row.
const SELECT_LATEST: &str = r"SELECT id, timestamp, location, temperature, description, icon
    FROM weather_log
    ORDER BY id DESC
    LIMIT 1";

/// All rows newest first, skipping the first `?1`.
const SELECT_NEWEST_FIRST: &str = r"SELECT id, timestamp, location, temperature, description, icon
    FROM weather_log
    ORDER BY id DESC
    LIMIT -1 OFFSET ?1";

/// Append and recency queries on the `weather_log` table.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ReadingStore {
    pool: SqlitePool,
}

impl ReadingStore {
    /// Wrap an already connected pool. Call [`initialize`](Self::initialize)
    /// before use.
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the database at `config.path` and initialize the schema.
    ///
    /// # Errors
    ///
    /// Returns an init-class [`DbError`] ([`DbError::is_init`]) if the
    /// medium is unreachable or write-protected.
    pub async fn open(config: &SqliteConfig) -> Result<Self, DbError> {
        let store = Self::new(SqlitePool::connect(config).await?);
        store.initialize().await?;
        Ok(store)
    }

    /// Ensure the `weather_log` table exists.
    ///
    /// Safe to call on every startup; a store that is already initialized is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if the schema cannot be written.
    pub async fn initialize(&self) -> Result<(), DbError> {
        self.pool.run_migrations().await
    }

    /// Persist `reading` and return it with its assigned id.
    ///
    /// The insert runs in its own transaction: either the whole row is
    /// committed and visible, or nothing is.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Write`] if the insert or commit fails.
    pub async fn append(&self, reading: &NewReading) -> Result<Reading, DbError> {
        let mut tx = self.pool.pool().begin().await.map_err(DbError::Write)?;

        let id: i64 = sqlx::query_scalar(
            r"INSERT INTO weather_log (timestamp, location, temperature, description, icon)
              VALUES (?1, ?2, ?3, ?4, ?5)
              RETURNING id",
        )
        .bind(reading.observed_at)
        .bind(&reading.location)
        .bind(reading.temperature)
        .bind(&reading.description)
        .bind(&reading.icon)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::Write)?;

        tx.commit().await.map_err(DbError::Write)?;

        tracing::debug!(reading_id = id, observed_at = reading.observed_at, "Appended reading");
        Ok(reading.clone().into_reading(ReadingId(id)))
    }

    /// The reading with the highest id, or `None` if the store is empty.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Read`] if the query fails.
    pub async fn latest(&self) -> Result<Option<Reading>, DbError> {
        let row = sqlx::query_as::<_, ReadingRow>(SELECT_LATEST)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(DbError::Read)?;

        Ok(row.map(Reading::from))
    }

    /// All stored readings in descending id order.
    ///
    /// With `excluding_latest` the most recent reading is left out, which is
    /// the history list shown under the current reading.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Read`] if the query fails.
    pub async fn history(&self, excluding_latest: bool) -> Result<Vec<Reading>, DbError> {
        let offset: i64 = if excluding_latest { 1 } else { 0 };
        let rows = sqlx::query_as::<_, ReadingRow>(SELECT_NEWEST_FIRST)
            .bind(offset)
            .fetch_all(self.pool.pool())
            .await
            .map_err(DbError::Read)?;

        Ok(rows.into_iter().map(Reading::from).collect())
    }

    /// Latest reading plus the rest of the history, read in one statement.
    ///
    /// Equivalent to [`latest`](Self::latest) followed by
    /// `history(true)`, except that both halves come from the same committed
    /// state even if an append lands in between.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Read`] if the query fails.
    pub async fn snapshot(&self) -> Result<Snapshot, DbError> {
        let all = self.history(false).await?;
        Ok(Snapshot::from_newest_first(all))
    }

    /// Number of stored readings.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Read`] if the query fails.
    pub async fn count(&self) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM weather_log")
            .fetch_one(self.pool.pool())
            .await
            .map_err(DbError::Read)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Return the underlying pool handle.
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// A row from the `weather_log` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReadingRow {
    /// Auto-incremented reading id.
    pub id: i64,
    /// Provider observation time, seconds since the epoch.
    pub timestamp: i64,
    /// Location label.
    pub location: String,
    /// Temperature, provider units.
    pub temperature: f64,
    /// Condition summary.
    pub description: String,
    /// Condition icon code.
    pub icon: String,
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Self {
            id: ReadingId(row.id),
            observed_at: row.timestamp,
            location: row.location,
            temperature: row.temperature,
            description: row.description,
            icon: row.icon,
        }
    }
}
