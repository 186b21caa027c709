//! The `{current, history}` view served to the presentation layer.

use serde::{Deserialize, Serialize};

use crate::reading::Reading;

/// Most recent reading plus everything stored before it.
///
/// An empty snapshot is a normal state: it means no cycle has stored a
/// reading yet and the caller should render a waiting page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The reading with the highest id, if any.
    pub current: Option<Reading>,
    /// All other readings, newest first (descending id).
    pub history: Vec<Reading>,
}

impl Snapshot {
    /// A snapshot with no data.
    pub const fn empty() -> Self {
        Self {
            current: None,
            history: Vec::new(),
        }
    }

    /// Build a snapshot from readings already sorted by descending id.
    pub fn from_newest_first(readings: Vec<Reading>) -> Self {
        let mut rows = readings.into_iter();
        let current = rows.next();
        Self {
            current,
            history: rows.collect(),
        }
    }

    /// Whether no reading has been stored yet.
    pub const fn is_waiting(&self) -> bool {
        self.current.is_none()
    }

    /// Total number of readings in the snapshot.
    pub fn len(&self) -> usize {
        self.history.len().saturating_add(usize::from(self.current.is_some()))
    }

    /// Whether the snapshot holds no readings.
    pub const fn is_empty(&self) -> bool {
        self.is_waiting()
    }
}
