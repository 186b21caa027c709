//! Error reporting for failed cycles.
//!
//! Every failure the scheduler sees is handed to an [`ErrorSink`]. The core
//! decides only that each failure is observable; what happens next
//! (logging, paging, email) is the sink's policy.
//!
//! [`TracingErrorSink`] logs each report and escalates when one kind of
//! failure repeats, which is how a provider schema change (every response
//! malformed) becomes distinguishable from a one-off network blip.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::{ErrorKind, ErrorReport};

/// Receiver of structured error reports.
pub trait ErrorSink: Send + Sync {
    /// Record one failure.
    fn report(&self, report: &ErrorReport);

    /// Called after a cycle stored a reading.
    fn cycle_succeeded(&self) {}
}

/// A run of consecutive failures of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Streak {
    /// Kind of every failure in the run.
    pub kind: ErrorKind,
    /// Number of failures in the run.
    pub count: u32,
}

/// [`ErrorSink`] that logs through `tracing` and escalates repeated failures.
///
/// An escalation is logged when a streak reaches `escalate_after` failures,
/// and again at every further multiple. A successful cycle or a failure of
/// another kind starts a new streak. `escalate_after == 0` disables
/// escalation.
#[derive(Debug)]
pub struct TracingErrorSink {
    escalate_after: u32,
    streak: Mutex<Option<Streak>>,
    escalations: AtomicU64,
}

impl TracingErrorSink {
    /// Create a sink that escalates after `escalate_after` repeats.
    pub const fn new(escalate_after: u32) -> Self {
        Self {
            escalate_after,
            streak: Mutex::new(None),
            escalations: AtomicU64::new(0),
        }
    }

    /// The current failure streak, if the last cycle failed.
    pub fn streak(&self) -> Option<Streak> {
        *self.streak.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of escalations logged so far.
    pub fn escalations(&self) -> u64 {
        self.escalations.load(Ordering::Relaxed)
    }

    fn should_escalate(&self, count: u32) -> bool {
        self.escalate_after > 0 && count.checked_rem(self.escalate_after) == Some(0)
    }
}

impl ErrorSink for TracingErrorSink {
    fn report(&self, report: &ErrorReport) {
        tracing::error!(
            cycle = report.cycle,
            kind = %report.kind,
            occurred_at = %report.occurred_at.to_rfc3339(),
            error = %report.message,
            "Cycle failed"
        );

        let streak = {
            let mut guard = self.streak.lock().unwrap_or_else(PoisonError::into_inner);
            let next = match *guard {
                Some(s) if s.kind == report.kind => Streak {
                    kind: s.kind,
                    count: s.count.saturating_add(1),
                },
                _ => Streak {
                    kind: report.kind,
                    count: 1,
                },
            };
            *guard = Some(next);
            next
        };

        if self.should_escalate(streak.count) {
            self.escalations.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                kind = %streak.kind,
                consecutive_failures = streak.count,
                last_error = %report.message,
                "Persistent failure, escalating"
            );
        }
    }

    fn cycle_succeeded(&self) {
        let previous = self
            .streak
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(streak) = previous {
            tracing::info!(
                kind = %streak.kind,
                failures = streak.count,
                "Recovered after failures"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn report(cycle: u64, kind: ErrorKind) -> ErrorReport {
        ErrorReport {
            occurred_at: Utc::now(),
            cycle,
            kind,
            message: format!("{kind} failure"),
        }
    }

    #[test]
    fn streak_counts_same_kind() {
        let sink = TracingErrorSink::new(10);
        sink.report(&report(1, ErrorKind::ProviderMalformed));
        sink.report(&report(2, ErrorKind::ProviderMalformed));
        assert_eq!(
            sink.streak(),
            Some(Streak {
                kind: ErrorKind::ProviderMalformed,
                count: 2
            })
        );
    }

    #[test]
    fn other_kind_restarts_streak() {
        let sink = TracingErrorSink::new(10);
        sink.report(&report(1, ErrorKind::ProviderMalformed));
        sink.report(&report(2, ErrorKind::ProviderUnreachable));
        assert_eq!(
            sink.streak(),
            Some(Streak {
                kind: ErrorKind::ProviderUnreachable,
                count: 1
            })
        );
    }

    #[test]
    fn success_clears_streak() {
        let sink = TracingErrorSink::new(10);
        sink.report(&report(1, ErrorKind::StorageWrite));
        sink.cycle_succeeded();
        assert_eq!(sink.streak(), None);
    }

    #[test]
    fn escalates_at_threshold_and_multiples() {
        let sink = TracingErrorSink::new(3);
        for cycle in 1..=7 {
            sink.report(&report(cycle, ErrorKind::ProviderMalformed));
        }
        // At 3 and 6.
        assert_eq!(sink.escalations(), 2);
    }

    #[test]
    fn zero_threshold_never_escalates() {
        let sink = TracingErrorSink::new(0);
        for cycle in 1..=5 {
            sink.report(&report(cycle, ErrorKind::ProviderHttp));
        }
        assert_eq!(sink.escalations(), 0);
    }

    #[test]
    fn interrupted_streak_does_not_escalate() {
        let sink = TracingErrorSink::new(3);
        sink.report(&report(1, ErrorKind::ProviderHttp));
        sink.report(&report(2, ErrorKind::ProviderHttp));
        sink.cycle_succeeded();
        sink.report(&report(4, ErrorKind::ProviderHttp));
        sink.report(&report(5, ErrorKind::ProviderHttp));
        assert_eq!(sink.escalations(), 0);
    }
}
