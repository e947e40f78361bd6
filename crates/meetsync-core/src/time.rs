//! Time window for calendar queries.
//!
//! [`TimeWindow`] defines the half-open range `[start, end)` that each
//! user's calendar is queried for.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default number of days to look ahead.
pub const DEFAULT_DAYS_AHEAD: u32 = 14;

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates the window `[now, now + days)`.
    ///
    /// The end saturates at the latest representable instant.
    pub fn lookahead(now: DateTime<Utc>, days: u32) -> Self {
        let end = now
            .checked_add_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(now, end)
    }
}
