//! Shared type definitions for the weatherlog pipeline.
//!
//! Every crate in the workspace speaks in terms of the types defined here:
//! the fetcher produces a [`NewReading`], the store assigns it a
//! [`ReadingId`] and hands back a [`Reading`], and the query path returns a
//! [`Snapshot`].
//!
//! # Modules
//!
//! - [`reading`] -- Readings before and after persistence, plus the id newtype
//! - [`snapshot`] -- The `{current, history}` view served to presentation

pub mod reading;
pub mod snapshot;

pub use reading::{NewReading, Reading, ReadingId};
pub use snapshot::Snapshot;
