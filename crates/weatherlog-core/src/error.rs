//! Error taxonomy shared by every cycle.
//!
//! Each failure a cycle can hit is classified by [`ErrorKind`] so the
//! [`ErrorSink`](crate::alerts::ErrorSink) can apply policy per kind without
//! matching on the concrete error types of every crate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use weatherlog_db::DbError;

use crate::fetch::FetchError;

/// Classification of pipeline failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The store could not be brought up. Fatal at startup.
    StorageInit,
    /// Persisting a reading failed. The cycle is skipped.
    StorageWrite,
    /// Reading back stored data failed.
    StorageRead,
    /// The provider could not be reached.
    ProviderUnreachable,
    /// The provider answered with a non-2xx status.
    ProviderHttp,
    /// The provider body was not usable.
    ProviderMalformed,
}

impl ErrorKind {
    /// Stable snake-case name, used as a structured log field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StorageInit => "storage_init",
            Self::StorageWrite => "storage_write",
            Self::StorageRead => "storage_read",
            Self::ProviderUnreachable => "provider_unreachable",
            Self::ProviderHttp => "provider_http",
            Self::ProviderMalformed => "provider_malformed",
        }
    }

    /// Whether the process cannot continue after this kind of error.
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::StorageInit)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Taxonomy kind of a storage error.
pub const fn db_error_kind(err: &DbError) -> ErrorKind {
    match err {
        DbError::Init(_) | DbError::Migration(_) | DbError::Config(_) => ErrorKind::StorageInit,
        DbError::Write(_) => ErrorKind::StorageWrite,
        DbError::Read(_) => ErrorKind::StorageRead,
    }
}

/// Failure of one fetch-then-append cycle.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// The fetch failed; nothing was written.
    #[error("fetch failed: {source}")]
    Fetch {
        /// The underlying fetch error.
        #[from]
        source: FetchError,
    },

    /// The fetch succeeded but the append failed; nothing was committed.
    #[error("append failed: {source}")]
    Store {
        /// The underlying storage error.
        #[from]
        source: DbError,
    },
}

impl CycleError {
    /// Taxonomy kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch { source } => source.kind(),
            Self::Store { source } => db_error_kind(source),
        }
    }
}

/// What an [`ErrorSink`](crate::alerts::ErrorSink) receives for each failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// When the failure was observed.
    pub occurred_at: DateTime<Utc>,
    /// Sequence number of the failing cycle (1-based).
    pub cycle: u64,
    /// Taxonomy kind.
    pub kind: ErrorKind,
    /// Rendered error chain.
    pub message: String,
}

impl ErrorReport {
    /// Build a report for `err` observed now during `cycle`.
    pub fn new(cycle: u64, err: &CycleError) -> Self {
        Self {
            occurred_at: Utc::now(),
            cycle,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Build a report for a storage failure outside any cycle, such as
    /// opening the store at startup. The cycle number is 0.
    pub fn storage(err: &DbError) -> Self {
        Self {
            occurred_at: Utc::now(),
            cycle: 0,
            kind: db_error_kind(err),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_init_is_fatal() {
        assert!(ErrorKind::StorageInit.is_fatal());
        assert!(!ErrorKind::StorageWrite.is_fatal());
        assert!(!ErrorKind::ProviderHttp.is_fatal());
        assert!(!ErrorKind::ProviderMalformed.is_fatal());
    }

    #[test]
    fn cycle_error_kind_from_fetch() {
        let err = CycleError::from(FetchError::Http { status: 500 });
        assert_eq!(err.kind(), ErrorKind::ProviderHttp);
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[test]
    fn cycle_error_kind_from_store() {
        let err = CycleError::from(DbError::Write(sqlx_error()));
        assert_eq!(err.kind(), ErrorKind::StorageWrite);
        let err = CycleError::from(DbError::Config("bad".to_owned()));
        assert_eq!(err.kind(), ErrorKind::StorageInit);
    }

    #[test]
    fn migration_failure_is_init_class() {
        let migrate = weatherlog_db::sqlx::migrate::MigrateError::VersionMissing(1);
        let err = DbError::Migration(migrate);
        assert!(err.is_init());
        assert!(!matches!(err, DbError::Init(_)));
        let report = ErrorReport::storage(&err);
        assert_eq!(report.kind, ErrorKind::StorageInit);
        assert!(report.kind.is_fatal());
    }

    #[test]
    fn read_failure_is_its_own_kind() {
        let err = CycleError::from(DbError::Read(sqlx_error()));
        assert_eq!(err.kind(), ErrorKind::StorageRead);
        assert_eq!(err.kind().to_string(), "storage_read");
        assert!(!err.kind().is_fatal());
    }

    #[test]
    fn report_captures_kind_and_message() {
        let err = CycleError::from(FetchError::malformed("missing currently"));
        let report = ErrorReport::new(4, &err);
        assert_eq!(report.cycle, 4);
        assert_eq!(report.kind, ErrorKind::ProviderMalformed);
        assert!(report.message.contains("missing currently"));
    }

    #[test]
    fn startup_storage_report_is_fatal_kind() {
        let report = ErrorReport::storage(&DbError::Init(sqlx_error()));
        assert_eq!(report.cycle, 0);
        assert_eq!(report.kind, ErrorKind::StorageInit);
        assert!(report.kind.is_fatal());
    }

    #[test]
    fn kind_display_is_snake_case() {
        assert_eq!(ErrorKind::ProviderUnreachable.to_string(), "provider_unreachable");
    }

    fn sqlx_error() -> weatherlog_db::sqlx::Error {
        weatherlog_db::sqlx::Error::PoolTimedOut
    }
}
