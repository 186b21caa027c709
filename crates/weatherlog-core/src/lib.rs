//! Acquisition pipeline for weatherlog: scheduled fetch, per-cycle error
//! isolation, and the read facade over the store.
//!
//! ```text
//! Scheduler tick --> Fetcher::fetch --ok--> ReadingSink::persist --> ReadingStore
//!                          |                        |
//!                          +------err---------------+--> ErrorSink::report
//!
//! QueryService::snapshot --> ReadingStore (independent of the write path)
//! ```
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `weatherlog-config.yaml`.
//! - [`error`] -- Error taxonomy shared by every cycle.
//! - [`fetch`] -- [`Fetcher`] trait and [`FetchError`].
//! - [`sink`] -- [`ReadingSink`] trait, implemented by the store.
//! - [`alerts`] -- [`ErrorSink`] trait and [`TracingErrorSink`].
//! - [`scheduler`] -- Fixed-period, non-overlapping cycle runner.
//! - [`query`] -- [`QueryService`], the read-only snapshot facade.
//!
//! [`Fetcher`]: fetch::Fetcher
//! [`FetchError`]: fetch::FetchError
//! [`ReadingSink`]: sink::ReadingSink
//! [`ErrorSink`]: alerts::ErrorSink
//! [`TracingErrorSink`]: alerts::TracingErrorSink
//! [`QueryService`]: query::QueryService

pub mod alerts;
pub mod config;
pub mod error;
pub mod fetch;
pub mod query;
pub mod scheduler;
pub mod sink;
