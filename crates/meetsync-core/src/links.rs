//! Conference link detection.
//!
//! Calendar events do not always carry structured conference data; the
//! join link is often pasted into the location or the description instead.
//! This module finds URLs in free text and recognizes the usual
//! video-conferencing services.
//!
//! # Example
//!
//! ```
//! use meetsync_core::links::{ConferenceKind, find_conference_link};
//!
//! let text = "Dial in: https://zoom.us/j/123456789?pwd=abc123 (backup: phone)";
//! let link = find_conference_link(text).unwrap();
//! assert_eq!(link, "https://zoom.us/j/123456789?pwd=abc123");
//! assert_eq!(ConferenceKind::detect(&link), Some(ConferenceKind::Zoom));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'\)\]]+"#).expect("Invalid URL regex"));

/// Outlook SafeLinks carry the real URL in the `url` query parameter.
static SAFELINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^/]*safelinks\.protection\.outlook\.com/?\?[^?]*url=([^&]+)")
        .expect("Invalid SafeLink regex")
});

/// A recognized video-conferencing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConferenceKind {
    Meet,
    Zoom,
    Teams,
    Jitsi,
    Webex,
}

impl ConferenceKind {
    /// Identifies the service from a URL's host.
    pub fn detect(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();
        let is = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

        if host == "meet.google.com" {
            Some(Self::Meet)
        } else if is("zoom.us") || is("zoomgov.com") {
            Some(Self::Zoom)
        } else if host == "teams.microsoft.com" || host == "teams.live.com" {
            Some(Self::Teams)
        } else if host == "meet.jit.si" {
            Some(Self::Jitsi)
        } else if is("webex.com") {
            Some(Self::Webex)
        } else {
            None
        }
    }
}

/// Extracts every http(s) URL from text, SafeLinks unwrapped.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_REGEX
        .find_iter(text)
        .map(|m| unwrap_safelink(m.as_str().trim_end_matches(['.', ',', ';'])))
        .collect()
}

/// Returns the first conferencing URL found in text.
pub fn find_conference_link(text: &str) -> Option<String> {
    extract_urls(text)
        .into_iter()
        .find(|url| ConferenceKind::detect(url).is_some())
}

/// Returns true if the whole string is a single http(s) URL.
pub fn is_web_url(text: &str) -> bool {
    let text = text.trim();
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    Url::parse(text)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn unwrap_safelink(url: &str) -> String {
    SAFELINK_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|encoded| urlencoding::decode(encoded.as_str()).ok())
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_services() {
        let cases = [
            ("https://meet.google.com/abc-defg-hij", ConferenceKind::Meet),
            ("https://us02web.zoom.us/j/123", ConferenceKind::Zoom),
            ("https://zoomgov.com/j/123", ConferenceKind::Zoom),
            (
                "https://teams.microsoft.com/l/meetup-join/19%3ameeting",
                ConferenceKind::Teams,
            ),
            ("https://meet.jit.si/room", ConferenceKind::Jitsi),
            ("https://acme.webex.com/meet/bob", ConferenceKind::Webex),
        ];
        for (url, kind) in cases {
            assert_eq!(ConferenceKind::detect(url), Some(kind), "{url}");
        }
    }

    #[test]
    fn unknown_hosts_are_not_conferences() {
        assert_eq!(ConferenceKind::detect("https://docs.example.com/x"), None);
        assert_eq!(ConferenceKind::detect("https://notzoom.us.evil.io/j/1"), None);
        assert_eq!(ConferenceKind::detect("not a url"), None);
    }

    #[test]
    fn finds_first_conference_link() {
        let text = "Agenda https://docs.example.com/q3. Join https://meet.google.com/abc-defg-hij, thanks";
        assert_eq!(
            find_conference_link(text).as_deref(),
            Some("https://meet.google.com/abc-defg-hij")
        );
        assert_eq!(find_conference_link("Room 4, 2nd floor"), None);
    }

    #[test]
    fn unwraps_safelinks() {
        let text = "https://nam02.safelinks.protection.outlook.com/?url=https%3A%2F%2Fzoom.us%2Fj%2F42&data=x";
        assert_eq!(
            find_conference_link(text).as_deref(),
            Some("https://zoom.us/j/42")
        );
    }

    #[test]
    fn web_url_check() {
        assert!(is_web_url("https://meet.google.com/abc"));
        assert!(is_web_url("  http://x.com/a "));
        assert!(!is_web_url("Room 4"));
        assert!(!is_web_url("see https://x.com"));
        assert!(!is_web_url("mailto:a@x.com"));
    }
}
