//! Event types for calendar meetings.
//!
//! This module provides the provider-agnostic meeting model:
//! - [`CalendarEvent`]: one event as fetched from one user's calendar
//! - [`Attendee`]: an invitee with email, display name and response
//! - [`EventStatus`]: confirmed / tentative / cancelled
//! - [`ResponseStatus`]: an attendee's answer to the invitation

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The response status for an event attendee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// The attendee has accepted the invitation.
    Accepted,
    /// The attendee has declined the invitation.
    Declined,
    /// The attendee has tentatively accepted.
    Tentative,
    /// The attendee has not responded.
    NeedsAction,
    /// Unknown response status.
    #[default]
    Unknown,
}

impl ResponseStatus {
    /// Parses a provider response status string (e.g. Google's `needsAction`).
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "accepted" => Self::Accepted,
            "declined" => Self::Declined,
            "tentative" => Self::Tentative,
            "needsaction" | "needs_action" => Self::NeedsAction,
            _ => Self::Unknown,
        }
    }
}

/// The status of the event itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    /// Parses a provider status string.
    ///
    /// Unknown or missing values are treated as confirmed, which is what
    /// Google Calendar reports for ordinary events.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "cancelled" || v == "canceled" => Self::Cancelled,
            Some(v) if v == "tentative" => Self::Tentative,
            _ => Self::Confirmed,
        }
    }

    /// Returns the lowercase name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Tentative => "tentative",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns the capitalized label used in task descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirmed => "Confirmed",
            Self::Tentative => "Tentative",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// The attendee's email address, as reported by the provider.
    pub email: String,
    /// The attendee's display name, if available.
    pub display_name: Option<String>,
    /// Whether this attendee is the organizer.
    pub organizer: bool,
    /// Whether this attendee represents a resource (room, equipment).
    pub resource: bool,
    /// The attendee's response status.
    pub response_status: ResponseStatus,
}

impl Attendee {
    /// Creates a new attendee with the given email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            organizer: false,
            resource: false,
            response_status: ResponseStatus::Unknown,
        }
    }

    /// Builder method to set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Builder method to mark as organizer.
    pub fn with_organizer(mut self, organizer: bool) -> Self {
        self.organizer = organizer;
        self
    }

    /// Builder method to mark as a resource.
    pub fn with_resource(mut self, resource: bool) -> Self {
        self.resource = resource;
        self
    }

    /// Builder method to set the response status.
    pub fn with_response_status(mut self, status: ResponseStatus) -> Self {
        self.response_status = status;
        self
    }

    /// Returns the lowercased domain part of the email address.
    ///
    /// Returns `None` for malformed addresses: no `@`, an empty local part,
    /// an empty domain, whitespace, or a domain without a dot.
    pub fn email_domain(&self) -> Option<String> {
        let email = self.email.trim();
        let (local, domain) = email.rsplit_once('@')?;
        let domain = domain.trim_end_matches('.');
        if local.is_empty()
            || domain.is_empty()
            || !domain.contains('.')
            || domain.starts_with('.')
            || email.chars().any(char::is_whitespace)
        {
            return None;
        }
        Some(domain.to_ascii_lowercase())
    }
}

/// A calendar event as fetched from one user's calendar.
///
/// The same meeting shows up once per queried user who was invited; the
/// copies are identical except for [`owner`](Self::owner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Identifier that is stable across every attendee's copy of the meeting.
    ///
    /// Some providers omit it for certain invite types; the deduplicator
    /// then falls back to a composite key.
    pub id: Option<String>,
    /// The event title/summary.
    pub title: Option<String>,
    /// When the event starts.
    pub start: DateTime<Utc>,
    /// When the event ends.
    pub end: DateTime<Utc>,
    /// The IANA timezone the event was scheduled in, if known.
    pub timezone: Option<String>,
    /// Confirmed, tentative or cancelled.
    pub status: EventStatus,
    /// The raw body, possibly HTML.
    pub body: Option<String>,
    /// Free-text location or URL.
    pub location: Option<String>,
    /// Video conference URL.
    pub conference_link: Option<String>,
    /// Everyone invited, including the organizer.
    pub attendees: Vec<Attendee>,
    /// Provider-native recurrence rules (e.g. `RRULE:FREQ=WEEKLY`).
    pub recurrence: Vec<String>,
    /// Present when this event is one occurrence of a series.
    pub recurring_event_id: Option<String>,
    /// The user (calendar) this copy was fetched from.
    pub owner: String,
}

impl CalendarEvent {
    /// Creates a new event with the minimum required fields.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, owner: impl Into<String>) -> Self {
        Self {
            id: None,
            title: None,
            start,
            end,
            timezone: None,
            status: EventStatus::Confirmed,
            body: None,
            location: None,
            conference_link: None,
            attendees: Vec::new(),
            recurrence: Vec::new(),
            recurring_event_id: None,
            owner: owner.into(),
        }
    }

    /// Returns the title if it contains anything besides whitespace.
    pub fn effective_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Returns the raw duration (may be zero or negative for malformed input).
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns true if the event is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    /// Returns the organizer attendee, if one is marked.
    pub fn organizer(&self) -> Option<&Attendee> {
        self.attendees.iter().find(|a| a.organizer)
    }

    /// Returns true if `email` is on the attendee list (case-insensitive).
    pub fn has_attendee(&self, email: &str) -> bool {
        self.attendees
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(email))
    }

    /// Builder method to set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder method to set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder method to set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the conference link.
    pub fn with_conference_link(mut self, link: impl Into<String>) -> Self {
        self.conference_link = Some(link.into());
        self
    }

    /// Builder method to set the timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Builder method to add an attendee.
    pub fn with_attendee(mut self, attendee: Attendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Builder method to add a recurrence rule.
    pub fn with_recurrence_rule(mut self, rule: impl Into<String>) -> Self {
        self.recurrence.push(rule.into());
        self
    }

    /// Builder method to mark as an instance of a recurring series.
    pub fn with_recurring_event_id(mut self, id: impl Into<String>) -> Self {
        self.recurring_event_id = Some(id.into());
        self
    }

    /// Builder method to set the owning calendar.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, min, 0).unwrap()
    }

    mod status {
        use super::*;

        #[test]
        fn parses_known_values() {
            assert_eq!(EventStatus::parse(Some("confirmed")), EventStatus::Confirmed);
            assert_eq!(EventStatus::parse(Some("Tentative")), EventStatus::Tentative);
            assert_eq!(EventStatus::parse(Some("cancelled")), EventStatus::Cancelled);
            assert_eq!(EventStatus::parse(Some("canceled")), EventStatus::Cancelled);
        }

        #[test]
        fn missing_or_unknown_is_confirmed() {
            assert_eq!(EventStatus::parse(None), EventStatus::Confirmed);
            assert_eq!(EventStatus::parse(Some("weird")), EventStatus::Confirmed);
        }

        #[test]
        fn response_status_parse() {
            assert_eq!(ResponseStatus::parse("needsAction"), ResponseStatus::NeedsAction);
            assert_eq!(ResponseStatus::parse("accepted"), ResponseStatus::Accepted);
            assert_eq!(ResponseStatus::parse("bogus"), ResponseStatus::Unknown);
        }
    }

    mod attendee {
        use super::*;

        #[test]
        fn email_domain_is_lowercased() {
            let a = Attendee::new("Jane@MyCompany.COM");
            assert_eq!(a.email_domain().as_deref(), Some("mycompany.com"));
        }

        #[test]
        fn email_domain_uses_last_at() {
            let a = Attendee::new("\"odd@name\"@example.org");
            assert_eq!(a.email_domain().as_deref(), Some("example.org"));
        }

        #[test]
        fn malformed_emails_have_no_domain() {
            for email in ["", "nobody", "@example.com", "user@", "user@localhost", "a b@x.com"] {
                assert!(
                    Attendee::new(email).email_domain().is_none(),
                    "{email:?} should not resolve"
                );
            }
        }
    }

    #[test]
    fn builder_sets_fields() {
        let event = CalendarEvent::new(utc(10, 0), utc(11, 0), "a@x.com")
            .with_id("evt-1")
            .with_title("Planning")
            .with_status(EventStatus::Tentative)
            .with_body("<p>hi</p>")
            .with_location("Room 1")
            .with_recurrence_rule("RRULE:FREQ=WEEKLY")
            .with_attendee(Attendee::new("a@x.com").with_organizer(true));

        assert_eq!(event.id.as_deref(), Some("evt-1"));
        assert_eq!(event.effective_title(), Some("Planning"));
        assert_eq!(event.duration(), Duration::hours(1));
        assert_eq!(event.organizer().map(|a| a.email.as_str()), Some("a@x.com"));
        assert!(event.has_attendee("A@X.COM"));
        assert!(!event.is_cancelled());
    }

    #[test]
    fn blank_title_is_not_effective() {
        let event = CalendarEvent::new(utc(10, 0), utc(11, 0), "a@x.com").with_title("   ");
        assert_eq!(event.effective_title(), None);
    }

    #[test]
    fn serde_roundtrip() {
        let event = CalendarEvent::new(utc(10, 0), utc(10, 30), "a@x.com")
            .with_id("evt-1")
            .with_attendee(Attendee::new("b@y.com").with_response_status(ResponseStatus::Declined));
        let json = serde_json::to_string(&event).unwrap();
        let parsed: CalendarEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }
}
