//! Merging per-user event lists into unique meetings.
//!
//! A meeting shared by several queried users comes back once per calendar.
//! [`dedupe`] groups the copies by [`MeetingKey`] and records which users
//! had the meeting on their calendar.
//!
//! Events without a provider identifier are keyed on `(title, start, end)`.
//! That fallback is an approximation: two distinct meetings with identical
//! metadata are merged, and copies whose titles differ are not.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event::CalendarEvent;

/// The grouping key for a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeetingKey {
    /// Provider identifier shared by every copy.
    Id { id: String },
    /// Fallback for events without an identifier.
    Composite {
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl MeetingKey {
    /// Derives the key for an event.
    pub fn for_event(event: &CalendarEvent) -> Self {
        match event.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => Self::Id { id: id.to_string() },
            None => Self::Composite {
                title: event.effective_title().unwrap_or_default().to_string(),
                start: event.start,
                end: event.end,
            },
        }
    }

    /// Returns true for the `(title, start, end)` fallback.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite { .. })
    }

    /// The string used to break ties between meetings with the same start.
    ///
    /// Identifier for keyed meetings, title for composite ones.
    pub fn tie_breaker(&self) -> &str {
        match self {
            Self::Id { id } => id,
            Self::Composite { title, .. } => title,
        }
    }
}

impl fmt::Display for MeetingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id { id } => f.write_str(id),
            Self::Composite { title, start, end } => {
                write!(f, "{}|{}|{}", title, start.to_rfc3339(), end.to_rfc3339())
            }
        }
    }
}

/// One unique meeting and the queried users who have it on their calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupedMeeting {
    /// The grouping key.
    pub key: MeetingKey,
    /// The canonical copy (the first one seen).
    pub event: CalendarEvent,
    /// Queried users whose calendars contained the meeting.
    pub users: BTreeSet<String>,
}

impl DedupedMeeting {
    /// Creates a meeting from its first copy.
    pub fn new(event: CalendarEvent, user: impl Into<String>) -> Self {
        let mut users = BTreeSet::new();
        users.insert(user.into());
        Self {
            key: MeetingKey::for_event(&event),
            event,
            users,
        }
    }
}

/// Merges per-user event lists into unique meetings.
///
/// Output is ordered by start time, ties broken by
/// [`MeetingKey::tie_breaker`], so it does not depend on the order the
/// users were fetched in. Feeding the same event twice for one user is a
/// no-op.
pub fn dedupe<I, U>(per_user: I) -> Vec<DedupedMeeting>
where
    I: IntoIterator<Item = (U, Vec<CalendarEvent>)>,
    U: Into<String>,
{
    let mut meetings: HashMap<MeetingKey, DedupedMeeting> = HashMap::new();
    let mut total = 0usize;

    for (user, events) in per_user {
        let user = user.into();
        for event in events {
            total += 1;
            let key = MeetingKey::for_event(&event);
            match meetings.get_mut(&key) {
                Some(existing) => {
                    debug!(key = %key, user = %user, "merging duplicate meeting copy");
                    existing.users.insert(user.clone());
                }
                None => {
                    if key.is_composite() {
                        debug!(key = %key, "event has no identifier, using composite key");
                    }
                    meetings.insert(key, DedupedMeeting::new(event, user.clone()));
                }
            }
        }
    }

    let mut merged: Vec<DedupedMeeting> = meetings.into_values().collect();
    merged.sort_by(|a, b| {
        a.event
            .start
            .cmp(&b.event.start)
            .then_with(|| a.key.tie_breaker().cmp(b.key.tie_breaker()))
            .then_with(|| a.key.cmp(&b.key))
    });

    debug!("deduplicated {} event copies into {} meetings", total, merged.len());
    merged
}
