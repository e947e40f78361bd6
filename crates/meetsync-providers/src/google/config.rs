//! Google Calendar source configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// Google's OAuth 2.0 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// A service-account key, as downloaded from the Google Cloud Console.
///
/// Only the fields needed to sign a token request are kept.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// The service account's email, used as JWT issuer.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    /// Key id, sent as the JWT `kid` header when present.
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// Token endpoint; Google's default when the file omits it.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// Key type; must be `service_account` when present.
    #[serde(default, rename = "type")]
    pub key_type: Option<String>,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl ServiceAccountKey {
    /// Loads a key from a service-account JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read service account file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses a key from service-account JSON.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let key: Self = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse service account JSON: {}", e))
        })?;
        key.validate()?;
        Ok(key)
    }

    fn validate(&self) -> ProviderResult<()> {
        if let Some(kind) = self.key_type.as_deref() {
            if kind != "service_account" {
                return Err(ProviderError::configuration(format!(
                    "expected a service_account key, got '{}'",
                    kind
                )));
            }
        }
        if self.client_email.trim().is_empty() {
            return Err(ProviderError::configuration("client_email is required"));
        }
        if !self.private_key.contains("PRIVATE KEY") {
            return Err(ProviderError::configuration(
                "private_key must be a PEM-encoded private key",
            ));
        }
        Ok(())
    }
}

/// Configuration for the Google Calendar source.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Credentials used to impersonate each queried user.
    pub key: ServiceAccountKey,

    /// Calendar to read for each user. Defaults to `primary`.
    pub calendar_id: String,

    /// Page size for events.list.
    pub max_results: u32,

    /// Whether to request cancelled events (`showDeleted`).
    pub include_cancelled: bool,

    /// Request timeout.
    pub timeout: Duration,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Calendar API base URL.
    pub api_base: String,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default page size.
    pub const DEFAULT_MAX_RESULTS: u32 = 250;

    /// Default OAuth scope for read-only calendar access.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";

    /// Creates a new configuration with the given key.
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            calendar_id: "primary".to_string(),
            max_results: Self::DEFAULT_MAX_RESULTS,
            include_cancelled: true,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            user_agent: format!("meetsync/{}", env!("CARGO_PKG_VERSION")),
            api_base: CALENDAR_API_BASE.to_string(),
        }
    }

    /// Sets the calendar to read.
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    /// Sets the page size.
    pub fn with_max_results(mut self, max: u32) -> Self {
        self.max_results = max;
        self
    }

    /// Sets whether cancelled events are requested.
    pub fn with_include_cancelled(mut self, include: bool) -> Self {
        self.include_cancelled = include;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the Calendar API base URL.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Sets the token endpoint, overriding the key file's `token_uri`.
    pub fn with_token_uri(mut self, uri: impl Into<String>) -> Self {
        self.key.token_uri = uri.into();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }
        if self.calendar_id.trim().is_empty() {
            return Err(ProviderError::configuration("calendar_id must not be empty"));
        }
        if !(1..=2500).contains(&self.max_results) {
            return Err(ProviderError::configuration(
                "max_results must be between 1 and 2500",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_KEY_PEM: &str = include_str!("../../tests/fixtures/test-rsa-key.pem");

    pub(crate) fn test_key() -> ServiceAccountKey {
        let json = serde_json::json!({
            "type": "service_account",
            "client_email": "sync@project.iam.gserviceaccount.com",
            "private_key": TEST_KEY_PEM,
            "private_key_id": "key-1",
        });
        ServiceAccountKey::from_json(&json.to_string()).unwrap()
    }

    #[test]
    fn key_defaults_token_uri() {
        let key = test_key();
        assert_eq!(key.token_uri, GOOGLE_TOKEN_URL);
        assert_eq!(key.private_key_id.as_deref(), Some("key-1"));
    }

    #[test]
    fn key_debug_redacts_private_key() {
        let debug = format!("{:?}", test_key());
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn key_rejects_wrong_type() {
        let json = r#"{"type": "authorized_user", "client_email": "a", "private_key": "x"}"#;
        let err = ServiceAccountKey::from_json(json).unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.message().contains("authorized_user"));
    }

    #[test]
    fn key_rejects_missing_fields() {
        assert!(ServiceAccountKey::from_json(r#"{"client_email": "a"}"#).is_err());
        assert!(ServiceAccountKey::from_json("not json").is_err());
    }

    #[test]
    fn key_from_missing_file() {
        let err = ServiceAccountKey::from_file("/nonexistent/sa.json").unwrap_err();
        assert!(err.message().contains("/nonexistent/sa.json"));
    }

    #[test]
    fn config_defaults() {
        let config = GoogleConfig::new(test_key());
        assert_eq!(config.calendar_id, "primary");
        assert_eq!(config.max_results, 250);
        assert_eq!(config.scopes, vec![GoogleConfig::DEFAULT_SCOPE.to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_validation() {
        assert!(GoogleConfig::new(test_key()).with_scopes(vec![]).validate().is_err());
        assert!(GoogleConfig::new(test_key()).with_max_results(0).validate().is_err());
        assert!(GoogleConfig::new(test_key()).with_calendar_id(" ").validate().is_err());
    }

    #[test]
    fn config_builder_methods() {
        let config = GoogleConfig::new(test_key())
            .with_api_base("http://127.0.0.1:9999")
            .with_token_uri("http://127.0.0.1:9999/token")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.api_base, "http://127.0.0.1:9999");
        assert_eq!(config.key.token_uri, "http://127.0.0.1:9999/token");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
