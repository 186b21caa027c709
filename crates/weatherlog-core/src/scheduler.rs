//! Fixed-period, non-overlapping cycle runner.
//!
//! The [`Scheduler`] owns one tokio task. Each cycle calls
//! [`Fetcher::fetch`] and, on success, [`ReadingSink::persist`]. A failed
//! cycle is reported to the [`ErrorSink`] and the loop carries on; nothing a
//! cycle does can end the loop.
//!
//! # Timing
//!
//! The first cycle runs as soon as [`Scheduler::start`] is called. After
//! that the scheduler sleeps one period measured from the end of the previous
//! cycle, so a slow provider delays later cycles instead of stacking them.
//!
//! # Shutdown
//!
//! [`Scheduler::stop`] sends on a `watch` channel and joins the task. The
//! signal only interrupts the sleep between cycles. A cycle in flight runs to
//! its append or its failure report before the loop exits, so the wait is
//! bounded by the fetcher's own timeout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use weatherlog_types::Reading;

use crate::alerts::ErrorSink;
use crate::error::{CycleError, ErrorReport};
use crate::fetch::Fetcher;
use crate::sink::ReadingSink;

/// Shortest accepted period. Shorter values are clamped up to this.
pub const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Errors from scheduler lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// `start` was called while the loop is already running.
    #[error("scheduler is already running")]
    AlreadyRunning,

    /// `start` was called after `stop`. A scheduler runs at most once.
    #[error("scheduler has been stopped")]
    Stopped,

    /// `start` was called outside a tokio runtime.
    #[error("no tokio runtime available to spawn the scheduler task")]
    NoRuntime,

    /// The scheduler task panicked or was aborted.
    #[error("scheduler task failed: {0}")]
    Join(String),
}

/// Lifecycle phase of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed, not yet started.
    Idle,
    /// The cycle loop is running.
    Running,
    /// Stopped. Terminal.
    Stopped,
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The reading was fetched and committed.
    Stored(Reading),
    /// The fetch failed; nothing was written.
    FetchFailed(ErrorReport),
    /// The fetch succeeded but the append failed; nothing was committed.
    StoreFailed(ErrorReport),
}

impl CycleOutcome {
    /// Whether the cycle committed a reading.
    pub const fn is_stored(&self) -> bool {
        matches!(self, Self::Stored(_))
    }
}

/// Counters for cycles run by a scheduler.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    cycles: AtomicU64,
    stored: AtomicU64,
    failed: AtomicU64,
}

impl SchedulerStats {
    /// Cycles started.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    /// Cycles that committed a reading.
    pub fn stored(&self) -> u64 {
        self.stored.load(Ordering::Acquire)
    }

    /// Cycles that ended in a fetch or store failure.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    /// Count a new cycle and return its 1-based sequence number.
    fn begin_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }
}

enum Lifecycle {
    Idle,
    Running {
        shutdown: watch::Sender<bool>,
        task: JoinHandle<()>,
    },
    Stopped,
}

struct Inner<F, S> {
    fetcher: F,
    sink: S,
    errors: Arc<dyn ErrorSink>,
    period: Duration,
    stats: SchedulerStats,
    /// Held for the whole of a cycle so cycles never overlap, even when
    /// [`Scheduler::run_cycle`] is called while the loop is running.
    gate: tokio::sync::Mutex<()>,
}

/// Drives a [`Fetcher`] into a [`ReadingSink`] on a fixed period.
pub struct Scheduler<F, S> {
    inner: Arc<Inner<F, S>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<F, S> std::fmt::Debug for Scheduler<F, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("period", &self.inner.period)
            .field("state", &self.state())
            .field("stats", &self.inner.stats)
            .finish_non_exhaustive()
    }
}

impl<F, S> Scheduler<F, S> {
    /// The effective period between cycles.
    pub fn period(&self) -> Duration {
        self.inner.period
    }

    /// Cycle counters, readable at any time.
    pub fn stats(&self) -> &SchedulerStats {
        &self.inner.stats
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> SchedulerState {
        match *self.lock_lifecycle() {
            Lifecycle::Idle => SchedulerState::Idle,
            Lifecycle::Running { .. } => SchedulerState::Running,
            Lifecycle::Stopped => SchedulerState::Stopped,
        }
    }

    fn lock_lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F: Fetcher, S: ReadingSink> Scheduler<F, S> {
    /// Create an idle scheduler.
    ///
    /// A `period` below [`MIN_PERIOD`] is clamped up to it with a warning.
    pub fn new(fetcher: F, sink: S, errors: Arc<dyn ErrorSink>, period: Duration) -> Self {
        let period = if period < MIN_PERIOD {
            warn!(
                requested_ms = period.as_millis(),
                min_ms = MIN_PERIOD.as_millis(),
                "Poll period below minimum, clamping"
            );
            MIN_PERIOD
        } else {
            period
        };

        Self {
            inner: Arc::new(Inner {
                fetcher,
                sink,
                errors,
                period,
                stats: SchedulerStats::default(),
                gate: tokio::sync::Mutex::new(()),
            }),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Spawn the cycle loop on the current tokio runtime.
    ///
    /// The first cycle begins immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::AlreadyRunning`] if the loop is running,
    /// [`SchedulerError::Stopped`] after [`stop`](Self::stop), and
    /// [`SchedulerError::NoRuntime`] outside a tokio runtime.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut lifecycle = self.lock_lifecycle();
        match *lifecycle {
            Lifecycle::Running { .. } => return Err(SchedulerError::AlreadyRunning),
            Lifecycle::Stopped => return Err(SchedulerError::Stopped),
            Lifecycle::Idle => {}
        }

        let Ok(runtime) = Handle::try_current() else {
            return Err(SchedulerError::NoRuntime);
        };

        let (shutdown, receiver) = watch::channel(false);
        let inner = Arc::clone(&self.inner);
        let task = runtime.spawn(async move { inner.run_loop(receiver).await });

        *lifecycle = Lifecycle::Running { shutdown, task };
        info!(period_secs = self.inner.period.as_secs(), "Scheduler started");
        Ok(())
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// A cycle in flight completes, fetch and append included, before this
    /// returns. Stopping an idle
    /// scheduler moves it straight to [`SchedulerState::Stopped`]; stopping
    /// twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Join`] if the loop task panicked.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let previous = std::mem::replace(&mut *self.lock_lifecycle(), Lifecycle::Stopped);

        let Lifecycle::Running { shutdown, task } = previous else {
            debug!("Scheduler stopped before it ran");
            return Ok(());
        };

        info!("Scheduler stopping");
        // The receiver only goes away when the task has already exited.
        if shutdown.send(true).is_err() {
            debug!("Scheduler task already gone");
        }
        task.await.map_err(|err| SchedulerError::Join(err.to_string()))?;

        info!(
            cycles = self.inner.stats.cycles(),
            stored = self.inner.stats.stored(),
            failed = self.inner.stats.failed(),
            "Scheduler stopped"
        );
        Ok(())
    }

    /// Run one fetch-then-append cycle outside the loop.
    ///
    /// Waits for any cycle already in progress, so it never overlaps with
    /// the loop. Failures are reported to the error sink exactly as loop
    /// cycles are.
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.inner.cycle().await
    }
}

impl<F: Fetcher, S: ReadingSink> Inner<F, S> {
    async fn run_loop(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            self.cycle().await;

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                () = tokio::time::sleep(self.period) => {}
                () = stop_requested(&mut shutdown) => break,
            }
        }
        debug!("Scheduler loop exited");
    }

    /// One fetch-then-append cycle. Never raced against shutdown.
    async fn cycle(&self) -> CycleOutcome {
        let _gate = self.gate.lock().await;
        let cycle = self.stats.begin_cycle();
        debug!(cycle, "Cycle starting");

        let new_reading = match self.fetcher.fetch().await {
            Ok(reading) => reading,
            Err(err) => return CycleOutcome::FetchFailed(self.fail(cycle, &err.into())),
        };

        match self.sink.persist(&new_reading).await {
            Ok(reading) => {
                self.stats.stored.fetch_add(1, Ordering::AcqRel);
                info!(
                    cycle,
                    reading_id = %reading.id,
                    observed_at = reading.observed_at,
                    temperature = reading.temperature,
                    description = %reading.description,
                    "Stored reading"
                );
                self.errors.cycle_succeeded();
                CycleOutcome::Stored(reading)
            }
            Err(err) => CycleOutcome::StoreFailed(self.fail(cycle, &err.into())),
        }
    }

    fn fail(&self, cycle: u64, err: &CycleError) -> ErrorReport {
        self.stats.failed.fetch_add(1, Ordering::AcqRel);
        let report = ErrorReport::new(cycle, err);
        self.errors.report(&report);
        report
    }
}

/// Resolves once `true` has been sent, or the sender is gone.
async fn stop_requested(receiver: &mut watch::Receiver<bool>) {
    if receiver.wait_for(|stop| *stop).await.is_err() {
        debug!("Shutdown sender dropped");
    }
}
