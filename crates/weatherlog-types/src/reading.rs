//! Weather readings before and after persistence.
//!
//! A [`NewReading`] is what the fetcher produces from one provider response.
//! It has no identity yet. The store assigns a [`ReadingId`] on insert and
//! returns the resulting [`Reading`], which is immutable from then on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a persisted reading.
///
/// Ids increase strictly with insertion order and are never reused, so
/// ordering by id is ordering by insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingId(pub i64);

impl ReadingId {
    /// Return the inner integer value.
    pub const fn into_inner(self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for ReadingId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ReadingId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ReadingId> for i64 {
    fn from(id: ReadingId) -> Self {
        id.0
    }
}

/// A normalized sample that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
    /// Observation time reported by the provider, in seconds since the epoch.
    pub observed_at: i64,
    /// Label of the monitored site.
    pub location: String,
    /// Temperature in whatever units the provider was asked for.
    pub temperature: f64,
    /// Short human-readable condition, e.g. `"Clear"`.
    pub description: String,
    /// Short symbolic condition code, e.g. `"clear-day"`.
    pub icon: String,
}

impl NewReading {
    /// Attach a store-assigned id, producing the persisted form.
    pub fn into_reading(self, id: ReadingId) -> Reading {
        Reading {
            id,
            observed_at: self.observed_at,
            location: self.location,
            temperature: self.temperature,
            description: self.description,
            icon: self.icon,
        }
    }
}

/// A persisted reading.
///
/// `observed_at` is provider time and may go backwards between readings;
/// only `id` defines history order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Store-assigned id.
    pub id: ReadingId,
    /// Observation time reported by the provider, in seconds since the epoch.
    pub observed_at: i64,
    /// Label of the monitored site.
    pub location: String,
    /// Temperature, provider units.
    pub temperature: f64,
    /// Short human-readable condition.
    pub description: String,
    /// Short symbolic condition code.
    pub icon: String,
}

impl Reading {
    /// The provider timestamp as a UTC datetime.
    ///
    /// Returns `None` if the timestamp is outside the range `chrono` can
    /// represent.
    pub fn observed_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.observed_at, 0)
    }

    /// Whether this reading carries the same sample as `new`, ignoring the id.
    pub fn matches(&self, new: &NewReading) -> bool {
        self.observed_at == new.observed_at
            && self.location == new.location
            && self.temperature.to_bits() == new.temperature.to_bits()
            && self.description == new.description
            && self.icon == new.icon
    }
}
