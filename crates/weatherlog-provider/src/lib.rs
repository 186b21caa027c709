//! Forecast provider client for weatherlog.
//!
//! [`ProviderFetcher`] implements [`Fetcher`](weatherlog_core::fetch::Fetcher)
//! against a Dark Sky style forecast API: one `GET` per cycle, the current
//! conditions read from the `currently` object of the JSON body.

pub mod client;

pub use client::{ProviderError, ProviderFetcher, extract_reading};
