//! Meeting classification.
//!
//! A [`Classifier`] derives three attributes per deduplicated meeting:
//!
//! - recurrence: explicit rule, recurring-instance id, or a keyword
//!   heuristic over title and body ([`RecurrenceDetection`])
//! - audience: internal when every resolvable attendee belongs to an
//!   organization domain, client-facing otherwise ([`Audience`])
//! - priority: mapped from the event status through a [`PriorityMap`]
//!
//! Domain matching is a heuristic: subdomains of an organization domain
//! count as internal, resources are ignored and so are malformed emails.

use std::collections::BTreeSet;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::dedupe::DedupedMeeting;
use crate::event::{Attendee, CalendarEvent, EventStatus};
use crate::html::html_to_text;

/// Keywords that mark a meeting as recurring when no explicit rule exists.
pub const DEFAULT_RECURRENCE_KEYWORDS: &[&str] = &[
    "recurring",
    "recurring series",
    "weekly",
    "every week",
    "biweekly",
    "bi-weekly",
    "daily standup",
    "monthly",
];

/// Domain suffix Google uses for room and equipment calendars.
const RESOURCE_DOMAIN_SUFFIX: &str = "resource.calendar.google.com";

/// Task priority, ordered from most to least important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    Normal,
    Low,
}

impl Priority {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    /// Numeric priority used by ClickUp (1 = urgent, 4 = low).
    pub fn clickup_value(&self) -> u8 {
        match self {
            Self::Urgent => 1,
            Self::High => 2,
            Self::Normal => 3,
            Self::Low => 4,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status to priority mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityMap {
    pub confirmed: Priority,
    pub tentative: Priority,
    pub cancelled: Priority,
}

impl Default for PriorityMap {
    fn default() -> Self {
        Self {
            confirmed: Priority::Urgent,
            tentative: Priority::Normal,
            cancelled: Priority::Low,
        }
    }
}

impl PriorityMap {
    /// Returns the priority for a status.
    pub fn for_status(&self, status: EventStatus) -> Priority {
        match status {
            EventStatus::Confirmed => self.confirmed,
            EventStatus::Tentative => self.tentative,
            EventStatus::Cancelled => self.cancelled,
        }
    }
}

/// How a meeting was identified as recurring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RecurrenceDetection {
    /// The event carries an explicit recurrence rule.
    Rule,
    /// The event is an instance of a recurring series.
    Instance,
    /// Heuristic: the title or body mentions a recurrence keyword.
    Keyword { keyword: String },
    /// One-off meeting.
    None,
}

impl RecurrenceDetection {
    /// Returns true for every variant except [`None`](Self::None).
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns true when detection relied on text matching.
    pub fn is_heuristic(&self) -> bool {
        matches!(self, Self::Keyword { .. })
    }

    /// Short human-readable description of the detection method.
    pub fn describe(&self) -> String {
        match self {
            Self::Rule => "recurrence rule".to_string(),
            Self::Instance => "recurring series instance".to_string(),
            Self::Keyword { keyword } => format!("keyword \"{keyword}\""),
            Self::None => "none".to_string(),
        }
    }
}

/// Whether a meeting involves anyone outside the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Internal,
    ClientFacing,
}

impl Audience {
    /// Tag attached to the task.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Internal => "internal-meeting",
            Self::ClientFacing => "client-meeting",
        }
    }
}

/// Classifier settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Domains considered internal (subdomains included).
    pub org_domains: Vec<String>,
    /// Keywords for the recurrence heuristic, matched case-insensitively on
    /// word boundaries.
    pub recurrence_keywords: Vec<String>,
    /// Status to priority mapping.
    pub priorities: PriorityMap,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            org_domains: Vec::new(),
            recurrence_keywords: DEFAULT_RECURRENCE_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            priorities: PriorityMap::default(),
        }
    }
}

impl ClassifierConfig {
    /// Creates a configuration for the given organization domains.
    pub fn new<I, S>(org_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            org_domains: org_domains.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Builder method to replace the recurrence keywords.
    pub fn with_recurrence_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recurrence_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the priority mapping.
    pub fn with_priorities(mut self, priorities: PriorityMap) -> Self {
        self.priorities = priorities;
        self
    }
}

/// Errors building a [`Classifier`].
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("invalid recurrence keyword pattern: {0}")]
    KeywordPattern(#[from] regex::Error),
}

/// A meeting with its derived attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedMeeting {
    pub meeting: DedupedMeeting,
    pub recurrence: RecurrenceDetection,
    pub audience: Audience,
    pub priority: Priority,
    /// Attendee domains outside the organization, sorted.
    pub external_domains: BTreeSet<String>,
}

impl ClassifiedMeeting {
    /// Shortcut to the canonical event.
    pub fn event(&self) -> &CalendarEvent {
        &self.meeting.event
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_recurring()
    }

    pub fn is_client_facing(&self) -> bool {
        self.audience == Audience::ClientFacing
    }
}

/// Derives recurrence, audience and priority for meetings.
#[derive(Debug, Clone)]
pub struct Classifier {
    org_domains: Vec<String>,
    keyword_pattern: Option<Regex>,
    priorities: PriorityMap,
}

impl Classifier {
    /// Builds a classifier, compiling the keyword list into one pattern.
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let org_domains = config
            .org_domains
            .iter()
            .map(|d| normalize_domain(d))
            .filter(|d| !d.is_empty())
            .collect();

        let mut keywords: Vec<&str> = config
            .recurrence_keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        // Longest first so "recurring series" wins over "recurring".
        keywords.sort_by_key(|k| std::cmp::Reverse(k.len()));

        let keyword_pattern = if keywords.is_empty() {
            None
        } else {
            let alternation = keywords
                .iter()
                .map(|k| regex::escape(k).replace(' ', r"\s+"))
                .collect::<Vec<_>>()
                .join("|");
            Some(
                RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
                    .case_insensitive(true)
                    .build()?,
            )
        };

        Ok(Self {
            org_domains,
            keyword_pattern,
            priorities: config.priorities,
        })
    }

    /// Classifies one meeting.
    pub fn classify(&self, meeting: DedupedMeeting) -> ClassifiedMeeting {
        let recurrence = self.detect_recurrence(&meeting.event);
        match &recurrence {
            RecurrenceDetection::Keyword { keyword } => info!(
                key = %meeting.key,
                keyword = %keyword,
                "recurring meeting detected by keyword heuristic"
            ),
            RecurrenceDetection::None => {}
            explicit => debug!(
                key = %meeting.key,
                method = %explicit.describe(),
                "recurring meeting detected"
            ),
        }

        let external_domains = self.external_domains(&meeting.event.attendees);
        let audience = if external_domains.is_empty() {
            Audience::Internal
        } else {
            Audience::ClientFacing
        };
        let priority = self.priorities.for_status(meeting.event.status);

        ClassifiedMeeting {
            meeting,
            recurrence,
            audience,
            priority,
            external_domains,
        }
    }

    /// Detects recurrence; explicit indicators take precedence over text.
    pub fn detect_recurrence(&self, event: &CalendarEvent) -> RecurrenceDetection {
        if event.recurrence.iter().any(|r| !r.trim().is_empty()) {
            return RecurrenceDetection::Rule;
        }
        if event
            .recurring_event_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
        {
            return RecurrenceDetection::Instance;
        }
        match self.match_keyword(event) {
            Some(keyword) => RecurrenceDetection::Keyword { keyword },
            None => RecurrenceDetection::None,
        }
    }

    fn match_keyword(&self, event: &CalendarEvent) -> Option<String> {
        let pattern = self.keyword_pattern.as_ref()?;
        let title = event.effective_title().unwrap_or_default();
        let body = event.body.as_deref().map(html_to_text).unwrap_or_default();
        [title, body.as_str()].into_iter().find_map(|text| {
            pattern
                .find(text)
                .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        })
    }

    /// Returns true if `domain` equals or is a subdomain of an organization
    /// domain.
    pub fn is_internal_domain(&self, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        self.org_domains.iter().any(|org| {
            domain == *org
                || domain
                    .strip_suffix(org.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    fn external_domains(&self, attendees: &[Attendee]) -> BTreeSet<String> {
        attendees
            .iter()
            .filter(|a| !a.resource)
            .filter_map(|a| match a.email_domain() {
                Some(domain) => Some(domain),
                None => {
                    debug!(email = %a.email, "ignoring attendee with unresolvable email");
                    None
                }
            })
            .filter(|domain| !domain.ends_with(RESOURCE_DOMAIN_SUFFIX))
            .filter(|domain| !self.is_internal_domain(domain))
            .collect()
    }
}

fn normalize_domain(domain: &str) -> String {
    domain
        .trim()
        .trim_start_matches('@')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, 0, 0).unwrap()
    }

    fn classifier() -> Classifier {
        Classifier::new(&ClassifierConfig::new(["mycompany.com"])).unwrap()
    }

    fn meeting(event: CalendarEvent) -> DedupedMeeting {
        let owner = event.owner.clone();
        DedupedMeeting::new(event, owner)
    }

    fn event() -> CalendarEvent {
        CalendarEvent::new(at(10), at(11), "angela@mycompany.com")
            .with_id("evt-1")
            .with_title("Planning")
    }

    mod recurrence {
        use super::*;

        #[test]
        fn explicit_rule_wins_over_text() {
            let e = event()
                .with_title("One-off weekly kickoff")
                .with_recurrence_rule("RRULE:FREQ=WEEKLY");
            let c = classifier().classify(meeting(e));
            assert_eq!(c.recurrence, RecurrenceDetection::Rule);
            assert!(!c.recurrence.is_heuristic());
        }

        #[test]
        fn instance_id_is_explicit() {
            let e = event().with_recurring_event_id("series-9");
            let c = classifier().classify(meeting(e));
            assert_eq!(c.recurrence, RecurrenceDetection::Instance);
            assert!(c.is_recurring());
        }

        #[test]
        fn keyword_in_title_is_heuristic() {
            let e = event().with_title("Weekly Sync");
            let c = classifier().classify(meeting(e));
            assert_eq!(
                c.recurrence,
                RecurrenceDetection::Keyword {
                    keyword: "weekly".into()
                }
            );
            assert!(c.recurrence.is_heuristic());
        }

        #[test]
        fn keyword_in_html_body() {
            let e = event().with_body("<p>This happens <b>every   week</b></p>");
            let c = classifier().classify(meeting(e));
            assert_eq!(
                c.recurrence,
                RecurrenceDetection::Keyword {
                    keyword: "every week".into()
                }
            );
        }

        #[test]
        fn longest_keyword_reported() {
            let e = event().with_title("Part of a recurring series");
            assert_eq!(
                classifier().detect_recurrence(&e),
                RecurrenceDetection::Keyword {
                    keyword: "recurring series".into()
                }
            );
        }

        #[test]
        fn keywords_need_word_boundaries() {
            let e = event().with_title("Biweeklyish nonrecurring thing");
            assert_eq!(classifier().detect_recurrence(&e), RecurrenceDetection::None);
        }

        #[test]
        fn no_keywords_configured() {
            let config =
                ClassifierConfig::new(["mycompany.com"]).with_recurrence_keywords(Vec::<String>::new());
            let c = Classifier::new(&config).unwrap();
            let e = event().with_title("Weekly Sync");
            assert_eq!(c.detect_recurrence(&e), RecurrenceDetection::None);
        }

        #[test]
        fn one_off() {
            let c = classifier().classify(meeting(event()));
            assert_eq!(c.recurrence, RecurrenceDetection::None);
            assert!(!c.is_recurring());
        }
    }

    mod audience {
        use super::*;

        #[test]
        fn all_internal() {
            let e = event()
                .with_attendee(Attendee::new("angela@mycompany.com").with_organizer(true))
                .with_attendee(Attendee::new("chris@MyCompany.com"));
            let c = classifier().classify(meeting(e));
            assert_eq!(c.audience, Audience::Internal);
            assert!(c.external_domains.is_empty());
        }

        #[test]
        fn one_external_flips_to_client() {
            let e = event()
                .with_attendee(Attendee::new("angela@mycompany.com"))
                .with_attendee(Attendee::new("bob@client.io"));
            let c = classifier().classify(meeting(e));
            assert!(c.is_client_facing());
            assert_eq!(c.external_domains.iter().collect::<Vec<_>>(), vec!["client.io"]);
        }

        #[test]
        fn subdomains_are_internal() {
            let c = classifier();
            assert!(c.is_internal_domain("eu.mycompany.com"));
            assert!(c.is_internal_domain("MYCOMPANY.COM"));
            assert!(!c.is_internal_domain("notmycompany.com"));
            assert!(!c.is_internal_domain("mycompany.com.evil.io"));
        }

        #[test]
        fn resources_and_malformed_emails_are_ignored() {
            let e = event()
                .with_attendee(Attendee::new("angela@mycompany.com"))
                .with_attendee(Attendee::new("room-4@vendor.com").with_resource(true))
                .with_attendee(Attendee::new(
                    "c_188@resource.calendar.google.com",
                ))
                .with_attendee(Attendee::new("not-an-email"));
            let c = classifier().classify(meeting(e));
            assert_eq!(c.audience, Audience::Internal);
        }

        #[test]
        fn no_attendees_is_internal() {
            let c = classifier().classify(meeting(event()));
            assert_eq!(c.audience, Audience::Internal);
        }
    }

    mod priority {
        use super::*;

        #[test]
        fn status_mapping() {
            let c = classifier();
            let p = |status| c.classify(meeting(event().with_status(status))).priority;
            assert_eq!(p(EventStatus::Confirmed), Priority::Urgent);
            assert_eq!(p(EventStatus::Tentative), Priority::Normal);
            assert_eq!(p(EventStatus::Cancelled), Priority::Low);
        }

        #[test]
        fn cancelled_is_lowest() {
            let map = PriorityMap::default();
            assert!(map.cancelled > map.tentative);
            assert!(map.tentative > map.confirmed);
        }

        #[test]
        fn custom_mapping() {
            let config = ClassifierConfig::new(["mycompany.com"]).with_priorities(PriorityMap {
                confirmed: Priority::High,
                ..PriorityMap::default()
            });
            let c = Classifier::new(&config).unwrap();
            assert_eq!(c.classify(meeting(event())).priority, Priority::High);
        }

        #[test]
        fn clickup_values() {
            assert_eq!(Priority::Urgent.clickup_value(), 1);
            assert_eq!(Priority::Low.clickup_value(), 4);
        }
    }
}
