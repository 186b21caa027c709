//! Error types for the weatherlog engine binary.
//!
//! [`EngineError`] wraps every failure that can stop the process: bad
//! configuration, an unwritable log file, a store that cannot be opened, a
//! provider client that cannot be built, or a scheduler that fails to start
//! or join.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: weatherlog_core::config::ConfigError,
    },

    /// The configured log file could not be opened for appending.
    #[error("cannot open log file {}: {source}", path.display())]
    LogFile {
        /// Path from `logging.file`.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The reading store could not be opened.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying storage error.
        #[from]
        source: weatherlog_db::DbError,
    },

    /// The provider client could not be built.
    #[error("provider error: {source}")]
    Provider {
        /// The underlying provider error.
        #[from]
        source: weatherlog_provider::ProviderError,
    },

    /// The scheduler failed to start or stop.
    #[error("scheduler error: {source}")]
    Scheduler {
        /// The underlying scheduler error.
        #[from]
        source: weatherlog_core::scheduler::SchedulerError,
    },
}
