//! Plain-text task descriptions.
//!
//! The description is a series of blank-line separated sections:
//!
//! ```text
//! Agenda:
//! <event body as plain text>
//!
//! Status: Tentative
//! Location: Room 4
//! Meeting Link: https://meet.google.com/abc-defg-hij
//! Meeting type: Client meeting (external: client.io)
//!
//! Recurring meeting
//! Recurrence: FREQ=WEEKLY;BYDAY=MO
//!
//! Attendees:
//! • Angela Smith <angela@mycompany.com> (organizer)
//! • bob@client.io
//! ```
//!
//! The agenda and attendee sections are omitted when empty. The recurrence
//! section is always present, so a description is never empty.

use crate::classify::{Audience, ClassifiedMeeting, RecurrenceDetection};
use crate::event::{Attendee, CalendarEvent, EventStatus, ResponseStatus};
use crate::html::html_to_text;
use crate::links::is_web_url;

use super::bulletize;

/// Renders the full description for a meeting.
pub fn render_description(meeting: &ClassifiedMeeting) -> String {
    let event = meeting.event();
    let mut sections = Vec::new();

    let agenda = event.body.as_deref().map(html_to_text).unwrap_or_default();
    if !agenda.is_empty() {
        sections.push(format!("Agenda:\n{agenda}"));
    }

    sections.push(details_section(meeting));
    sections.push(recurrence_section(event, &meeting.recurrence));

    let roster: Vec<String> = event
        .attendees
        .iter()
        .filter(|a| !a.resource)
        .map(roster_line)
        .collect();
    if !roster.is_empty() {
        sections.push(format!("Attendees:\n{}", bulletize(&roster)));
    }

    sections.join("\n\n")
}

fn details_section(meeting: &ClassifiedMeeting) -> String {
    let event = meeting.event();
    let mut lines = Vec::new();

    if event.status != EventStatus::Confirmed {
        lines.push(format!("Status: {}", event.status.label()));
    }

    let location = event
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());
    let link = event
        .conference_link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .or_else(|| location.filter(|l| is_web_url(l)));

    match location.filter(|l| !is_web_url(l)) {
        Some(place) => lines.push(format!("Location: {place}")),
        None if link.is_some() => lines.push("Location: Virtual".to_string()),
        None => {}
    }
    if let Some(link) = link {
        lines.push(format!("Meeting Link: {link}"));
    }

    lines.push(match meeting.audience {
        Audience::Internal => "Meeting type: Internal meeting".to_string(),
        Audience::ClientFacing => {
            let domains: Vec<&str> = meeting.external_domains.iter().map(String::as_str).collect();
            format!("Meeting type: Client meeting (external: {})", domains.join(", "))
        }
    });

    lines.join("\n")
}

fn recurrence_section(event: &CalendarEvent, detection: &RecurrenceDetection) -> String {
    let mut lines = vec![match detection {
        RecurrenceDetection::None => "One-time meeting".to_string(),
        RecurrenceDetection::Keyword { .. } => {
            format!("Recurring meeting (detected by {})", detection.describe())
        }
        RecurrenceDetection::Rule | RecurrenceDetection::Instance => {
            "Recurring meeting".to_string()
        }
    }];

    for rule in event.recurrence.iter().map(|r| r.trim()).filter(|r| !r.is_empty()) {
        let rule = rule.strip_prefix("RRULE:").unwrap_or(rule);
        lines.push(format!("Recurrence: {rule}"));
    }
    if let Some(series) = event
        .recurring_event_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        lines.push(format!("Part of a recurring series (ID: {series})"));
    }

    lines.join("\n")
}

fn roster_line(attendee: &Attendee) -> String {
    let email = attendee.email.trim();
    let mut line = match attendee
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case(email))
    {
        Some(name) => format!("{name} <{email}>"),
        None => email.to_string(),
    };
    if attendee.organizer {
        line.push_str(" (organizer)");
    }
    match attendee.response_status {
        ResponseStatus::Declined => line.push_str(" (declined)"),
        ResponseStatus::Tentative => line.push_str(" (maybe)"),
        _ => {}
    }
    line
}
