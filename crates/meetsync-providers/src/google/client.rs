//! Google Calendar API client.
//!
//! Low-level HTTP client for the events.list endpoint: request building,
//! pagination, status mapping and conversion of API events into
//! [`CalendarEvent`]s.

use chrono::{DateTime, Utc};
use meetsync_core::links::find_conference_link;
use meetsync_core::{Attendee, CalendarEvent, EventStatus, ResponseStatus, TimeWindow};
use serde::Deserialize;
use tracing::{debug, warn};

use super::config::GoogleConfig;
use crate::error::{ProviderError, ProviderResult};

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    api_base: String,
    calendar_id: String,
    max_results: u32,
    include_cancelled: bool,
}

impl GoogleCalendarClient {
    /// Creates a client for the configured calendar.
    pub fn new(config: &GoogleConfig, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            calendar_id: config.calendar_id.clone(),
            max_results: config.max_results,
            include_cancelled: config.include_cancelled,
        }
    }

    /// Lists all events of `user`'s calendar within `window`, following
    /// pagination.
    ///
    /// All-day events and events with unparseable times are skipped.
    pub async fn list_events(
        &self,
        access_token: &str,
        user: &str,
        window: &TimeWindow,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut skipped = 0usize;

        loop {
            let page = self
                .list_events_page(access_token, user, window, page_token.as_deref())
                .await?;

            for event in page.items {
                match convert_event(event, user) {
                    Some(event) => all_events.push(event),
                    None => skipped += 1,
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(
            user = %user,
            skipped,
            "fetched {} events from calendar {}",
            all_events.len(),
            self.calendar_id
        );
        Ok(all_events)
    }

    /// Fetches a single page of events.
    async fn list_events_page(
        &self,
        access_token: &str,
        user: &str,
        window: &TimeWindow,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        // "primary" resolves to the impersonated user's own calendar
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(&self.calendar_id)
        );

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", self.max_results.to_string()),
            ]);

        if self.include_cancelled {
            request = request.query(&[("showDeleted", "true")]);
        }

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::network("request timeout")
            } else if e.is_connect() {
                ProviderError::network(format!("connection failed: {}", e))
            } else {
                ProviderError::network(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            )));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::authentication(
                "access token expired or invalid",
            ));
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::authorization(format!(
                "access denied to calendar of {}",
                user
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("API error ({}): {}", status, body);
            return Err(match status {
                reqwest::StatusCode::NOT_FOUND => ProviderError::not_found(message),
                s if s.is_client_error() => ProviderError::bad_request(message),
                _ => ProviderError::server(message),
            });
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e))
        })?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })
    }
}

/// Converts a Google Calendar API event to a [`CalendarEvent`].
///
/// Returns `None` for all-day events and events whose times cannot be read.
fn convert_event(event: ApiEvent, owner: &str) -> Option<CalendarEvent> {
    let label = event
        .id
        .clone()
        .or_else(|| event.ical_uid.clone())
        .unwrap_or_else(|| "<no id>".to_string());

    let cancelled = event.status.as_deref() == Some("cancelled");
    let (start, end) = match (event.start.as_ref(), event.end.as_ref()) {
        (Some(start), Some(end)) => (start, end),
        // Cancelled occurrences of a series only keep their original start
        (None, None) if cancelled && event.original_start_time.is_some() => {
            let original = event.original_start_time.as_ref()?;
            (original, original)
        }
        _ => {
            debug!(event = %label, "skipping event without start/end");
            return None;
        }
    };

    if start.date_time.is_none() && start.date.is_some() {
        debug!(event = %label, "skipping all-day event");
        return None;
    }

    let start_at = parse_time(start.date_time.as_deref(), &label, "start")?;
    let end_at = parse_time(end.date_time.as_deref(), &label, "end")?;
    let timezone = start.time_zone.clone();

    let mut calendar_event = CalendarEvent::new(start_at, end_at, owner);
    calendar_event.id = event_identifier(&event);
    calendar_event.title = event.summary;
    calendar_event.status = EventStatus::parse(event.status.as_deref());
    calendar_event.timezone = timezone;
    calendar_event.location = event.location.filter(|l| !l.trim().is_empty());
    calendar_event.recurrence = event.recurrence.unwrap_or_default();
    calendar_event.recurring_event_id = event.recurring_event_id;

    calendar_event.conference_link = event
        .conference_data
        .as_ref()
        .and_then(ApiConferenceData::join_uri)
        .or(event.hangout_link)
        .or_else(|| {
            calendar_event
                .location
                .as_deref()
                .and_then(find_conference_link)
        })
        .or_else(|| event.description.as_deref().and_then(find_conference_link));
    calendar_event.body = event.description;

    calendar_event.attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let email = a.email?;
            let mut attendee = Attendee::new(email)
                .with_organizer(a.organizer.unwrap_or(false))
                .with_resource(a.resource.unwrap_or(false))
                .with_response_status(
                    a.response_status
                        .as_deref()
                        .map(ResponseStatus::parse)
                        .unwrap_or_default(),
                );
            attendee.display_name = a.display_name;
            Some(attendee)
        })
        .collect();

    // Events without guests only carry the organizer block
    if let Some(organizer) = event.organizer.and_then(|o| o.email.map(|e| (e, o.display_name))) {
        if !calendar_event.has_attendee(&organizer.0) {
            let mut attendee = Attendee::new(organizer.0).with_organizer(true);
            attendee.display_name = organizer.1;
            calendar_event.attendees.insert(0, attendee);
        }
    }

    Some(calendar_event)
}

/// The identifier shared by every attendee's copy of the meeting.
///
/// Expanded instances of a series share one iCalUID, so they are qualified
/// with their original start time.
fn event_identifier(event: &ApiEvent) -> Option<String> {
    let uid = event.ical_uid.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
    if event.recurring_event_id.is_none() {
        return Some(uid.to_string());
    }
    let original = event
        .original_start_time
        .as_ref()
        .or(event.start.as_ref())
        .and_then(|t| t.date_time.as_deref())
        .and_then(|dt| DateTime::parse_from_rfc3339(dt).ok())
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339());
    Some(match original {
        Some(original) => format!("{}@{}", uid, original),
        None => uid.to_string(),
    })
}

fn parse_time(value: Option<&str>, label: &str, which: &str) -> Option<DateTime<Utc>> {
    let Some(value) = value else {
        warn!(event = %label, "event has no {} time", which);
        return None;
    };
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            warn!(event = %label, "failed to parse {} time {:?}: {}", which, value, e);
            None
        }
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    #[serde(rename = "iCalUID")]
    ical_uid: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
    original_start_time: Option<ApiEventTime>,
    status: Option<String>,
    recurring_event_id: Option<String>,
    recurrence: Option<Vec<String>>,
    organizer: Option<ApiPerson>,
    attendees: Option<Vec<ApiAttendee>>,
    hangout_link: Option<String>,
    conference_data: Option<ApiConferenceData>,
}

/// Event time from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPerson {
    email: Option<String>,
    display_name: Option<String>,
}

/// Attendee from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    email: Option<String>,
    display_name: Option<String>,
    organizer: Option<bool>,
    resource: Option<bool>,
    response_status: Option<String>,
}

/// Conference data from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiConferenceData {
    #[serde(default)]
    entry_points: Vec<ApiEntryPoint>,
}

impl ApiConferenceData {
    /// The video entry point, falling back to the "more" entry point.
    fn join_uri(&self) -> Option<String> {
        ["video", "more"].iter().find_map(|kind| {
            self.entry_points
                .iter()
                .find(|ep| ep.entry_point_type == *kind)
                .and_then(|ep| ep.uri.clone())
        })
    }
}

/// Entry point from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEntryPoint {
    entry_point_type: String,
    uri: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::google::config::tests::test_key;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_event(value: serde_json::Value) -> ApiEvent {
        serde_json::from_value(value).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::lookahead(Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap(), 14)
    }

    fn client_for(server: &MockServer) -> GoogleCalendarClient {
        let config = GoogleConfig::new(test_key()).with_api_base(server.uri());
        GoogleCalendarClient::new(&config, reqwest::Client::new())
    }

    mod convert {
        use super::*;

        #[test]
        fn full_event() {
            let event = api_event(json!({
                "id": "abc_20250310T100000Z",
                "iCalUID": "evt123@google.com",
                "summary": "Q3 Planning",
                "description": "<b>Plan Q3</b>",
                "location": "Room 4",
                "status": "tentative",
                "start": {"dateTime": "2025-03-10T11:00:00+01:00", "timeZone": "Europe/Paris"},
                "end": {"dateTime": "2025-03-10T12:00:00+01:00"},
                "organizer": {"email": "angela@mycompany.com"},
                "attendees": [
                    {"email": "angela@mycompany.com", "displayName": "Angela", "organizer": true, "responseStatus": "accepted"},
                    {"email": "bob@client.io", "responseStatus": "needsAction"},
                    {"email": "room@resource.calendar.google.com", "resource": true}
                ],
                "conferenceData": {"entryPoints": [
                    {"entryPointType": "phone", "uri": "tel:+1-555"},
                    {"entryPointType": "video", "uri": "https://meet.google.com/abc-defg-hij"}
                ]}
            }));

            let e = convert_event(event, "angela@mycompany.com").unwrap();
            assert_eq!(e.id.as_deref(), Some("evt123@google.com"));
            assert_eq!(e.title.as_deref(), Some("Q3 Planning"));
            assert_eq!(e.start, Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap());
            assert_eq!(e.timezone.as_deref(), Some("Europe/Paris"));
            assert_eq!(e.status, EventStatus::Tentative);
            assert_eq!(e.conference_link.as_deref(), Some("https://meet.google.com/abc-defg-hij"));
            assert_eq!(e.attendees.len(), 3);
            assert!(e.attendees[0].organizer);
            assert_eq!(e.attendees[0].display_name.as_deref(), Some("Angela"));
            assert_eq!(e.attendees[1].response_status, ResponseStatus::NeedsAction);
            assert!(e.attendees[2].resource);
            assert_eq!(e.owner, "angela@mycompany.com");
        }

        #[test]
        fn all_day_is_skipped() {
            let event = api_event(json!({
                "iCalUID": "x",
                "start": {"date": "2025-03-10"},
                "end": {"date": "2025-03-11"}
            }));
            assert!(convert_event(event, "a@x.com").is_none());
        }

        #[test]
        fn unparseable_time_is_skipped() {
            let event = api_event(json!({
                "iCalUID": "x",
                "start": {"dateTime": "tomorrow"},
                "end": {"dateTime": "2025-03-10T12:00:00Z"}
            }));
            assert!(convert_event(event, "a@x.com").is_none());
        }

        #[test]
        fn cancelled_is_kept() {
            let event = api_event(json!({
                "iCalUID": "x",
                "status": "cancelled",
                "start": {"dateTime": "2025-03-10T10:00:00Z"},
                "end": {"dateTime": "2025-03-10T11:00:00Z"}
            }));
            let e = convert_event(event, "a@x.com").unwrap();
            assert!(e.is_cancelled());
        }

        #[test]
        fn cancelled_occurrence_uses_original_start() {
            let event = api_event(json!({
                "id": "abc_20250310T100000Z",
                "iCalUID": "series@google.com",
                "status": "cancelled",
                "recurringEventId": "abc",
                "originalStartTime": {"dateTime": "2025-03-10T10:00:00Z"}
            }));
            let e = convert_event(event, "a@x.com").unwrap();
            let original = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
            assert!(e.is_cancelled());
            assert_eq!(e.start, original);
            assert_eq!(e.end, original);
            assert_eq!(e.id.as_deref(), Some("series@google.com@2025-03-10T10:00:00+00:00"));
        }

        #[test]
        fn confirmed_without_times_is_skipped() {
            let event = api_event(json!({
                "iCalUID": "series@google.com",
                "recurringEventId": "abc",
                "originalStartTime": {"dateTime": "2025-03-10T10:00:00Z"}
            }));
            assert!(convert_event(event, "a@x.com").is_none());
        }

        #[test]
        fn recurring_instance_is_qualified() {
            let event = api_event(json!({
                "iCalUID": "series@google.com",
                "recurringEventId": "series",
                "originalStartTime": {"dateTime": "2025-03-10T11:00:00+01:00"},
                "start": {"dateTime": "2025-03-10T12:00:00+01:00"},
                "end": {"dateTime": "2025-03-10T13:00:00+01:00"}
            }));
            let e = convert_event(event, "a@x.com").unwrap();
            assert_eq!(e.id.as_deref(), Some("series@google.com@2025-03-10T10:00:00+00:00"));
            assert_eq!(e.recurring_event_id.as_deref(), Some("series"));
        }

        #[test]
        fn recurrence_rules_pass_through() {
            let event = api_event(json!({
                "iCalUID": "x",
                "recurrence": ["RRULE:FREQ=WEEKLY;BYDAY=MO", "EXDATE:20250317T100000Z"],
                "start": {"dateTime": "2025-03-10T10:00:00Z"},
                "end": {"dateTime": "2025-03-10T11:00:00Z"}
            }));
            let e = convert_event(event, "a@x.com").unwrap();
            assert_eq!(e.recurrence.len(), 2);
        }

        #[test]
        fn missing_ical_uid_has_no_identifier() {
            let event = api_event(json!({
                "id": "local-only",
                "summary": "Lunch",
                "start": {"dateTime": "2025-03-10T12:00:00Z"},
                "end": {"dateTime": "2025-03-10T13:00:00Z"}
            }));
            assert!(convert_event(event, "a@x.com").unwrap().id.is_none());
        }

        #[test]
        fn organizer_added_when_no_guests() {
            let event = api_event(json!({
                "iCalUID": "x",
                "organizer": {"email": "a@x.com", "displayName": "A"},
                "start": {"dateTime": "2025-03-10T12:00:00Z"},
                "end": {"dateTime": "2025-03-10T13:00:00Z"}
            }));
            let e = convert_event(event, "a@x.com").unwrap();
            assert_eq!(e.attendees.len(), 1);
            assert!(e.attendees[0].organizer);
        }

        #[test]
        fn conference_link_from_location_or_body() {
            let from_location = api_event(json!({
                "iCalUID": "x",
                "location": "https://zoom.us/j/42",
                "start": {"dateTime": "2025-03-10T12:00:00Z"},
                "end": {"dateTime": "2025-03-10T13:00:00Z"}
            }));
            assert_eq!(
                convert_event(from_location, "a@x.com").unwrap().conference_link.as_deref(),
                Some("https://zoom.us/j/42")
            );

            let from_body = api_event(json!({
                "iCalUID": "x",
                "description": "Join: <a href=\"https://teams.microsoft.com/l/meetup-join/1\">Teams</a>",
                "start": {"dateTime": "2025-03-10T12:00:00Z"},
                "end": {"dateTime": "2025-03-10T13:00:00Z"}
            }));
            assert_eq!(
                convert_event(from_body, "a@x.com").unwrap().conference_link.as_deref(),
                Some("https://teams.microsoft.com/l/meetup-join/1")
            );
        }

        #[test]
        fn more_entry_point_fallback() {
            let data: ApiConferenceData = serde_json::from_value(json!({
                "entryPoints": [{"entryPointType": "more", "uri": "https://tel.meet/abc"}]
            }))
            .unwrap();
            assert_eq!(data.join_uri().as_deref(), Some("https://tel.meet/abc"));
        }
    }

    mod http {
        use super::*;

        #[tokio::test]
        async fn follows_pagination() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/calendars/primary/events"))
                .and(query_param("pageToken", "p2"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "items": [{
                        "iCalUID": "two",
                        "start": {"dateTime": "2025-03-11T10:00:00Z"},
                        "end": {"dateTime": "2025-03-11T11:00:00Z"}
                    }]
                })))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/calendars/primary/events"))
                .and(header("authorization", "Bearer tok"))
                .and(query_param("singleEvents", "true"))
                .and(query_param("orderBy", "startTime"))
                .and(query_param("maxResults", "250"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "items": [
                        {
                            "iCalUID": "one",
                            "start": {"dateTime": "2025-03-10T10:00:00Z"},
                            "end": {"dateTime": "2025-03-10T11:00:00Z"}
                        },
                        {
                            "iCalUID": "holiday",
                            "start": {"date": "2025-03-12"},
                            "end": {"date": "2025-03-13"}
                        }
                    ],
                    "nextPageToken": "p2"
                })))
                .mount(&server)
                .await;

            let events = client_for(&server)
                .list_events("tok", "a@x.com", &window())
                .await
                .unwrap();
            let ids: Vec<_> = events.iter().filter_map(|e| e.id.as_deref()).collect();
            assert_eq!(ids, vec!["one", "two"]);
        }

        #[tokio::test]
        async fn status_mapping() {
            let cases = [
                (401, ProviderErrorCode::AuthenticationFailed),
                (403, ProviderErrorCode::AuthorizationFailed),
                (404, ProviderErrorCode::NotFound),
                (400, ProviderErrorCode::BadRequest),
                (429, ProviderErrorCode::RateLimited),
                (503, ProviderErrorCode::ServerError),
            ];
            for (status, code) in cases {
                let server = MockServer::start().await;
                Mock::given(method("GET"))
                    .respond_with(ResponseTemplate::new(status))
                    .mount(&server)
                    .await;
                let err = client_for(&server)
                    .list_events("tok", "a@x.com", &window())
                    .await
                    .unwrap_err();
                assert_eq!(err.code(), code, "status {status}");
            }
        }

        #[tokio::test]
        async fn malformed_body_is_invalid_response() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
                .mount(&server)
                .await;
            let err = client_for(&server)
                .list_events("tok", "a@x.com", &window())
                .await
                .unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
            assert!(!err.is_unavailable());
        }

        #[tokio::test]
        async fn unreachable_server_is_network_error() {
            let config = GoogleConfig::new(test_key()).with_api_base("http://127.0.0.1:1");
            let client = GoogleCalendarClient::new(&config, reqwest::Client::new());
            let err = client.list_events("tok", "a@x.com", &window()).await.unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::NetworkError);
        }
    }
}
