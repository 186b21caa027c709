//! Weatherlog engine binary.
//!
//! Wires the configuration, the reading store, the provider fetcher and the
//! scheduler together, then runs until Ctrl+C or SIGTERM.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `weatherlog-config.yaml` (or the path in
//!    `WEATHERLOG_CONFIG`), falling back to defaults if the file is absent
//! 2. Initialize structured logging (tracing), to stdout or to
//!    `logging.file`
//! 3. Validate the configuration
//! 4. Open the store; failure here is fatal
//! 5. Build the provider fetcher and error sink
//! 6. Start the scheduler
//! 7. Wait for a shutdown signal, stop the scheduler, close the store

mod error;

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use weatherlog_core::alerts::{ErrorSink, TracingErrorSink};
use weatherlog_core::config::{LoggingConfig, WeatherlogConfig};
use weatherlog_core::error::ErrorReport;
use weatherlog_core::query::QueryService;
use weatherlog_core::scheduler::Scheduler;
use weatherlog_db::{ReadingStore, SqliteConfig};
use weatherlog_provider::ProviderFetcher;

use crate::error::EngineError;

/// Config file read when `WEATHERLOG_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "weatherlog-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the store cannot be
/// opened, or the scheduler fails to start or stop.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    let (config, config_path) = load_config()?;
    init_logging(&config.logging)?;

    info!("weatherlog-engine starting");
    match &config_path {
        Some(path) => info!(path = %path.display(), "Configuration file loaded"),
        None => info!("Config file not found, using defaults"),
    }

    config.validate()?;
    info!(
        location = config.location.name,
        period_minutes = config.poll.period_minutes,
        db_path = %config.storage.path.display(),
        provider = config.provider.base_url,
        timeout_secs = config.provider.timeout_secs,
        "Configuration validated"
    );

    let errors = Arc::new(TracingErrorSink::new(config.alerts.escalate_after));

    let storage = SqliteConfig::new(&config.storage.path)
        .with_max_connections(config.storage.max_connections);
    let store = match ReadingStore::open(&storage).await {
        Ok(store) => store,
        Err(err) => {
            errors.report(&ErrorReport::storage(&err));
            error!("Cannot continue without storage, exiting");
            return Err(err.into());
        }
    };

    match store.count().await {
        Ok(readings) => info!(
            path = %store.pool().path().display(),
            readings,
            "Reading store opened"
        ),
        Err(err) => warn!(error = %err, "Could not count stored readings"),
    }

    let query = QueryService::new(store.clone(), config.location.name.clone());
    log_store_state(&query).await;

    let fetcher = ProviderFetcher::new(&config.provider, config.location.name.clone())?;
    info!(url = %fetcher.redacted_url(), "Provider fetcher ready");

    let scheduler = Scheduler::new(
        fetcher,
        store.clone(),
        Arc::clone(&errors) as Arc<dyn ErrorSink>,
        config.poll.period(),
    );
    scheduler.start()?;

    shutdown_signal().await;

    scheduler.stop().await?;
    let stats = scheduler.stats();
    info!(
        cycles = stats.cycles(),
        stored = stats.stored(),
        failed = stats.failed(),
        escalations = errors.escalations(),
        "Polling finished"
    );

    log_store_state(&query).await;
    store.close().await;

    info!("weatherlog-engine stopped");
    Ok(())
}

/// Load configuration from the configured path.
///
/// A missing file is not an error: defaults (plus environment overrides)
/// are used and `None` is returned as the path.
fn load_config() -> Result<(WeatherlogConfig, Option<PathBuf>), EngineError> {
    let path = std::env::var_os("WEATHERLOG_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        let config = WeatherlogConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        Ok((WeatherlogConfig::parse("")?, None))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.filter` when set. With `logging.file` set,
/// lines are appended to that file without ANSI colours.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match &logging.file {
        Some(path) => {
            let builder = builder
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?));
            if logging.json {
                builder.json().init();
            } else {
                builder.init();
            }
        }
        None if logging.json => builder.json().init(),
        None => builder.init(),
    }
    Ok(())
}

/// Open `path` for appending, creating it if needed.
fn open_log_file(path: &Path) -> Result<File, EngineError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| EngineError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Log what the presentation layer would currently show.
async fn log_store_state(query: &QueryService) {
    match query.snapshot().await {
        Ok(snapshot) => match &snapshot.current {
            Some(current) => info!(
                location = query.location(),
                readings = snapshot.len(),
                reading_id = %current.id,
                observed_at = ?current.observed_at_utc(),
                temperature = current.temperature,
                description = %current.description,
                icon = %current.icon,
                "Current conditions"
            ),
            None => info!(location = query.location(), "Waiting for data"),
        },
        Err(err) => warn!(error = %err, "Could not read stored readings"),
    }
}

/// Resolve on Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed the failure is logged and that signal
/// is ignored; the other one still triggers shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received terminate signal"),
    }
}
