//! Error types for the data layer.
//!
//! [`DbError`] separates failures by the phase they happened in, because the
//! caller treats them differently: an init failure stops the process, a
//! write failure only skips one cycle.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The database could not be opened or prepared.
    ///
    /// Fatal: the process cannot run without a working store.
    #[error("storage init error: {0}")]
    Init(#[source] sqlx::Error),

    /// A schema migration failed during initialization.
    #[error("storage migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Persisting a reading failed. Nothing was committed.
    #[error("storage write error: {0}")]
    Write(#[source] sqlx::Error),

    /// Reading back stored data failed.
    #[error("storage read error: {0}")]
    Read(#[source] sqlx::Error),

    /// A configuration error.
    #[error("storage configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether this error happened while bringing the store up.
    pub const fn is_init(&self) -> bool {
        matches!(self, Self::Init(_) | Self::Migration(_) | Self::Config(_))
    }
}
