//! Task formatting for classified meetings.
//!
//! [`TaskFormatter`] turns a [`ClassifiedMeeting`] into a [`FormattedTask`]:
//! the title, a plain-text description (see [`description`]), a time
//! estimate, tags and a priority, ready for a task sink.
//!
//! Malformed events never fail formatting. A blank title gets a placeholder
//! and a non-positive duration is clamped to the minimum estimate, both
//! with a warning.
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use meetsync_core::{CalendarEvent, Classifier, ClassifierConfig, DedupedMeeting};
//! use meetsync_core::format::TaskFormatter;
//!
//! let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
//! let event = CalendarEvent::new(start, start, "a@mycompany.com").with_id("evt-1");
//!
//! let classifier = Classifier::new(&ClassifierConfig::new(["mycompany.com"])).unwrap();
//! let meeting = classifier.classify(DedupedMeeting::new(event, "a@mycompany.com"));
//!
//! let task = TaskFormatter::default().format(&meeting);
//! assert_eq!(task.title, "Untitled meeting");
//! assert_eq!(task.time_estimate_minutes, 1);
//! ```

pub mod description;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classify::{ClassifiedMeeting, Priority};
use crate::event::EventStatus;

pub use description::render_description;

/// Title used when an event has none.
pub const UNTITLED_MEETING: &str = "Untitled meeting";

/// Options for the task formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Title for events without one.
    pub untitled_placeholder: String,
    /// Smallest time estimate, in minutes.
    pub min_estimate_minutes: i64,
    /// Base tag added to every task.
    pub base_tag: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            untitled_placeholder: UNTITLED_MEETING.to_string(),
            min_estimate_minutes: 1,
            base_tag: "meeting".to_string(),
        }
    }
}

/// A meeting rendered as a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedTask {
    /// Stable reference to the source meeting.
    pub source_key: String,
    pub title: String,
    pub description: String,
    /// Estimated duration in whole minutes (at least one).
    pub time_estimate_minutes: i64,
    pub tags: Vec<String>,
    pub priority: Priority,
    pub status: EventStatus,
    pub start: DateTime<Utc>,
    pub due: DateTime<Utc>,
    /// Queried users attending the meeting.
    pub assignees: Vec<String>,
}

impl FormattedTask {
    /// Returns the time estimate as a duration.
    pub fn time_estimate(&self) -> Duration {
        Duration::minutes(self.time_estimate_minutes)
    }
}

/// Renders classified meetings as tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFormatter {
    options: FormatOptions,
}

impl TaskFormatter {
    /// Creates a formatter with the given options.
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    /// Returns the formatter options.
    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    /// Formats one meeting.
    pub fn format(&self, meeting: &ClassifiedMeeting) -> FormattedTask {
        let event = meeting.event();
        let key = meeting.meeting.key.to_string();

        let title = match event.effective_title() {
            Some(title) => title.to_string(),
            None => {
                warn!(key = %key, "meeting has no title, using placeholder");
                self.options.untitled_placeholder.clone()
            }
        };

        FormattedTask {
            title,
            description: render_description(meeting),
            time_estimate_minutes: self.estimate_minutes(meeting),
            tags: self.tags(meeting),
            priority: meeting.priority,
            status: event.status,
            start: event.start,
            due: event.start,
            assignees: meeting.meeting.users.iter().cloned().collect(),
            source_key: key,
        }
    }

    fn estimate_minutes(&self, meeting: &ClassifiedMeeting) -> i64 {
        let event = meeting.event();
        let minutes = event.duration().num_minutes();
        if minutes < self.options.min_estimate_minutes {
            warn!(
                key = %meeting.meeting.key,
                start = %event.start,
                end = %event.end,
                "meeting duration below minimum, clamping estimate to {} minute(s)",
                self.options.min_estimate_minutes
            );
            return self.options.min_estimate_minutes;
        }
        minutes
    }

    fn tags(&self, meeting: &ClassifiedMeeting) -> Vec<String> {
        let mut tags = vec![self.options.base_tag.clone()];
        if meeting.is_recurring() {
            tags.push("recurring-meeting".to_string());
        }
        tags.push(meeting.audience.tag().to_string());
        match meeting.event().status {
            EventStatus::Confirmed => {}
            status => tags.push(status.as_str().to_string()),
        }
        tags
    }
}

/// Creates bullet points from a list of items.
pub fn bulletize(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("• {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}
