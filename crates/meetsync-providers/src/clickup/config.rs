//! ClickUp sink configuration.

use std::time::Duration;

use crate::error::{SinkError, SinkResult};

/// Base URL for the ClickUp API v2.
pub const CLICKUP_API_BASE: &str = "https://api.clickup.com/api/v2";

/// Configuration for the ClickUp task sink.
#[derive(Clone)]
pub struct ClickUpConfig {
    /// Personal API token (sent as the `Authorization` header).
    pub api_key: String,
    /// Workspace ("team") id; sent with created tasks and scopes member lookup.
    pub team_id: Option<String>,
    /// Update tasks whose name and start date match instead of creating.
    pub match_existing: bool,
    /// Request timeout.
    pub timeout: Duration,
    /// API base URL.
    pub api_base: String,
    /// User agent string for API requests.
    pub user_agent: String,
}

impl std::fmt::Debug for ClickUpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickUpConfig")
            .field("api_key", &"<redacted>")
            .field("team_id", &self.team_id)
            .field("match_existing", &self.match_existing)
            .field("timeout", &self.timeout)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl ClickUpConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            team_id: None,
            match_existing: false,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            api_base: CLICKUP_API_BASE.to_string(),
            user_agent: format!("meetsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_team_id(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn with_match_existing(mut self, match_existing: bool) -> Self {
        self.match_existing = match_existing;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SinkResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(SinkError::unavailable("clickup", "api_key is required"));
        }
        if self
            .team_id
            .as_deref()
            .is_some_and(|t| t.trim().is_empty())
        {
            return Err(SinkError::unavailable("clickup", "team_id must not be empty"));
        }
        Ok(())
    }
}
