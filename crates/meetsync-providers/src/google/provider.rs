//! Google Calendar event source.
//!
//! This module implements [`EventSource`] for Google Calendar with a
//! service account impersonating each queried user.

use meetsync_core::{CalendarEvent, TimeWindow};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::provider::{BoxFuture, EventSource};

use super::auth::ServiceAccountAuth;
use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;

const PROVIDER_NAME: &str = "google";

/// Google Calendar source.
///
/// One instance serves every queried user; access tokens are minted and
/// cached per user.
#[derive(Debug)]
pub struct GoogleCalendarSource {
    config: GoogleConfig,
    auth: ServiceAccountAuth,
    client: GoogleCalendarClient,
}

impl GoogleCalendarSource {
    /// Creates a source from the given configuration.
    ///
    /// Fails with a configuration error if the configuration is invalid or
    /// the private key cannot be parsed.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config
            .validate()
            .map_err(|e| e.with_provider(PROVIDER_NAME))?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_provider(PROVIDER_NAME)
                    .with_source(e)
            })?;

        let auth = ServiceAccountAuth::new(&config, http_client.clone())
            .map_err(|e| e.with_provider(PROVIDER_NAME))?;
        let client = GoogleCalendarClient::new(&config, http_client);

        info!(
            service_account = %config.key.client_email,
            calendar = %config.calendar_id,
            "google calendar source ready"
        );
        Ok(Self {
            config,
            auth,
            client,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    async fn fetch(&self, user: &str, window: &TimeWindow) -> ProviderResult<Vec<CalendarEvent>> {
        let token = self.auth.access_token(user).await?;
        match self.client.list_events(&token, user, window).await {
            Err(e) if e.code() == ProviderErrorCode::AuthenticationFailed => {
                // The cached token may have been revoked; retry once with a new one
                warn!(user = %user, "access token rejected, retrying with a fresh token");
                self.auth.invalidate(user).await;
                let token = self.auth.access_token(user).await?;
                self.client.list_events(&token, user, window).await
            }
            result => result,
        }
    }
}

impl EventSource for GoogleCalendarSource {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn fetch_events<'a>(
        &'a self,
        user: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(async move {
            debug!(user = %user, start = %window.start, end = %window.end, "fetching events");
            self.fetch(user, window)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::config::tests::test_key;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn window() -> TimeWindow {
        TimeWindow::lookahead(Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap(), 14)
    }

    fn source_for(server: &MockServer) -> GoogleCalendarSource {
        let config = GoogleConfig::new(test_key())
            .with_api_base(server.uri())
            .with_token_uri(format!("{}/token", server.uri()));
        GoogleCalendarSource::new(config).unwrap()
    }

    async fn mount_token(server: &MockServer, token: &str) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                "expires_in": 3599
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fetches_events_for_user() {
        let server = MockServer::start().await;
        mount_token(&server, "tok").await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "iCalUID": "evt123",
                    "summary": "Sync",
                    "start": {"dateTime": "2025-03-10T10:00:00Z"},
                    "end": {"dateTime": "2025-03-10T11:00:00Z"}
                }]
            })))
            .mount(&server)
            .await;

        let source = source_for(&server);
        assert_eq!(source.name(), "google");
        let events = source.fetch_events("a@x.com", &window()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].owner, "a@x.com");
    }

    #[tokio::test]
    async fn refused_delegation_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"unauthorized_client"}"#))
            .mount(&server)
            .await;

        let err = source_for(&server)
            .fetch_events("a@x.com", &window())
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(err.provider(), Some("google"));
    }

    #[tokio::test]
    async fn retries_once_on_rejected_token() {
        let server = MockServer::start().await;
        mount_token(&server, "tok").await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let err = source_for(&server)
            .fetch_events("a@x.com", &window())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = GoogleConfig::new(test_key()).with_scopes(vec![]);
        let err = GoogleCalendarSource::new(config).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert_eq!(err.provider(), Some("google"));
    }
}
