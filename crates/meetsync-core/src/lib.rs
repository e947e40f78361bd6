//! Core types: events, time window, dedupe, classification, task formatting

pub mod classify;
pub mod dedupe;
pub mod event;
pub mod format;
pub mod html;
pub mod links;
pub mod time;
pub mod tracing;

pub use classify::{
    Audience, ClassifiedMeeting, Classifier, ClassifierConfig, ClassifierError, Priority,
    PriorityMap, RecurrenceDetection,
};
pub use dedupe::{DedupedMeeting, MeetingKey, dedupe};
pub use event::{Attendee, CalendarEvent, EventStatus, ResponseStatus};
pub use format::{FormatOptions, FormattedTask, TaskFormatter, UNTITLED_MEETING};
pub use html::html_to_text;
pub use links::{ConferenceKind, find_conference_link};
pub use time::{DEFAULT_DAYS_AHEAD, TimeWindow};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
