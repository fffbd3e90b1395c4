use chrono::{DateTime, Utc};

use super::types::TimelineEvent;

const MILLIS_PER_DAY: i64 = 1000 * 60 * 60 * 24;

/// Outcome of looking up a board column in an issue timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnEntry {
    Found(DateTime<Utc>),
    Missing,
}

impl ColumnEntry {
    pub fn timestamp(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Found(at) => Some(at),
            Self::Missing => None,
        }
    }

    /// Falls back to `other` when this entry is missing.
    pub fn or(self, other: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        self.timestamp().or(other)
    }
}

/// First time the issue entered `column`.
pub fn first_in_column(timeline: &[TimelineEvent], column: &str) -> ColumnEntry {
    timeline
        .iter()
        .find(|event| event.column == column)
        .map_or(ColumnEntry::Missing, |event| {
            ColumnEntry::Found(event.created_at)
        })
}

/// Last time the issue entered `column`.
pub fn last_in_column(timeline: &[TimelineEvent], column: &str) -> ColumnEntry {
    timeline
        .iter()
        .rev()
        .find(|event| event.column == column)
        .map_or(ColumnEntry::Missing, |event| {
            ColumnEntry::Found(event.created_at)
        })
}

/// Whole days from `start` to `end`, rounded up.
///
/// Returns `None` when either endpoint is unknown. Negative spans (an issue
/// finished before it started) round towards zero like any other ceiling.
pub fn days_between(end: Option<DateTime<Utc>>, start: Option<DateTime<Utc>>) -> Option<i64> {
    let millis = (end? - start?).num_milliseconds();
    let days = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) == 0 {
        Some(days)
    } else {
        Some(days + 1)
    }
}
