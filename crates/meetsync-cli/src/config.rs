//! Sync configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/meetsync/config.toml` by default. The parsed [`SyncConfig`] is
//! passed explicitly into the pipeline; nothing is read from globals later.
//!
//! `clickup.api_key` and `calendar.service_account_file` accept secret
//! references (see [`crate::secret`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use meetsync_core::{
    ClassifierConfig, DEFAULT_DAYS_AHEAD, PriorityMap, TracingConfig, TracingOutputFormat,
    classify::DEFAULT_RECURRENCE_KEYWORDS,
};
use meetsync_providers::clickup::ClickUpConfig;
use meetsync_providers::google::{GoogleConfig, ServiceAccountKey};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::{SyncError, SyncResult};
use crate::secret;

/// Longest supported lookahead.
pub const MAX_DAYS_AHEAD: u32 = 365;

/// Configuration for a sync run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub calendar: CalendarSettings,
    pub organization: OrganizationSettings,
    pub classification: ClassificationSettings,
    pub clickup: ClickUpSettings,
    pub logging: LoggingSettings,
}

/// Calendar source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Service-account key file (supports `pass::` and `env::` prefixes).
    pub service_account_file: Option<String>,

    /// Users whose calendars are read.
    pub users: Vec<String>,

    /// Days ahead of now to sync.
    pub days_ahead: u32,

    /// Calendar to read in each user's account.
    pub calendar_id: String,

    /// Page size for event listing.
    pub max_results: u32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Also mirror cancelled meetings.
    pub include_cancelled: bool,

    /// Fetch users concurrently.
    pub parallel_fetch: bool,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            service_account_file: None,
            users: Vec::new(),
            days_ahead: DEFAULT_DAYS_AHEAD,
            calendar_id: "primary".to_string(),
            max_results: GoogleConfig::DEFAULT_MAX_RESULTS,
            timeout_secs: 30,
            include_cancelled: true,
            parallel_fetch: false,
        }
    }
}

/// Organization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationSettings {
    /// Email domains considered internal.
    pub domains: Vec<String>,
}

/// Classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSettings {
    /// Phrases that mark a meeting as recurring when no explicit rule exists.
    pub recurrence_keywords: Vec<String>,

    /// Priority for each meeting status.
    pub priorities: PriorityMap,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            recurrence_keywords: DEFAULT_RECURRENCE_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            priorities: PriorityMap::default(),
        }
    }
}

/// ClickUp settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickUpSettings {
    /// API token (supports `pass::` and `env::` prefixes).
    pub api_key: Option<String>,

    /// Workspace id.
    pub team_id: Option<String>,

    /// Target list.
    pub list_id: Option<String>,

    /// Update tasks with the same name and start instead of creating.
    pub match_existing: bool,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClickUpSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            team_id: None,
            list_id: None,
            match_existing: false,
            timeout_secs: ClickUpConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error.
    pub level: String,

    /// pretty, compact or json.
    pub format: String,

    /// Append logs to this file as well.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            file: None,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub days: Option<u32>,
    pub users: Vec<String>,
    pub list_id: Option<String>,
    pub debug: bool,
    pub log_file: Option<PathBuf>,
}

impl SyncConfig {
    /// Loads configuration from the default path, or defaults if the file
    /// does not exist.
    pub fn load() -> SyncResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> SyncResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SyncError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| {
            SyncError::config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("meetsync")
            .join("config.toml")
    }

    /// Applies command-line overrides.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(days) = overrides.days {
            self.calendar.days_ahead = days;
        }
        if !overrides.users.is_empty() {
            self.calendar.users = overrides.users.clone();
        }
        if let Some(ref list_id) = overrides.list_id {
            self.clickup.list_id = Some(list_id.clone());
        }
        if overrides.debug {
            self.logging.level = "debug".to_string();
        }
        if let Some(ref file) = overrides.log_file {
            self.logging.file = Some(file.clone());
        }
    }

    /// Checks the settings needed for a run.
    ///
    /// Credentials are only checked for presence here; they are resolved
    /// when the source and sink are built. With `dry_run` the ClickUp key
    /// is not required.
    pub fn validate(&self, dry_run: bool) -> SyncResult<()> {
        let calendar = &self.calendar;
        if calendar.users.iter().all(|u| u.trim().is_empty()) {
            return Err(SyncError::config("calendar.users must list at least one user"));
        }
        if let Some(user) = calendar
            .users
            .iter()
            .find(|u| !u.trim().is_empty() && !u.contains('@'))
        {
            return Err(SyncError::config(format!(
                "calendar.users entry `{}` is not an email address",
                user
            )));
        }
        if !(1..=MAX_DAYS_AHEAD).contains(&calendar.days_ahead) {
            return Err(SyncError::config(format!(
                "calendar.days_ahead must be between 1 and {}",
                MAX_DAYS_AHEAD
            )));
        }
        if calendar.service_account_file.is_none() {
            return Err(SyncError::config("calendar.service_account_file is required"));
        }
        if self.organization.domains.iter().all(|d| d.trim().is_empty()) {
            return Err(SyncError::config(
                "organization.domains must list at least one domain",
            ));
        }
        if self.list_id().is_none() {
            return Err(SyncError::config("clickup.list_id is required"));
        }
        if !dry_run && self.clickup.api_key.is_none() {
            return Err(SyncError::config("clickup.api_key is required"));
        }
        let priorities = &self.classification.priorities;
        if priorities.confirmed.clickup_value() > priorities.tentative.clickup_value()
            || priorities.tentative.clickup_value() > priorities.cancelled.clickup_value()
        {
            return Err(SyncError::config(format!(
                "classification.priorities must rank confirmed >= tentative >= cancelled \
                 (got confirmed = {}, tentative = {}, cancelled = {})",
                priorities.confirmed, priorities.tentative, priorities.cancelled
            )));
        }
        self.tracing_config()?;
        Ok(())
    }

    /// Returns the users to sync, trimmed and without blanks.
    pub fn users(&self) -> Vec<String> {
        self.calendar
            .users
            .iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect()
    }

    pub fn list_id(&self) -> Option<&str> {
        self.clickup
            .list_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig::new(self.organization.domains.iter().map(|d| d.trim()))
            .with_recurrence_keywords(self.classification.recurrence_keywords.iter())
            .with_priorities(self.classification.priorities)
    }

    pub fn tracing_config(&self) -> SyncResult<TracingConfig> {
        let level: Level = self.logging.level.parse().map_err(|_| {
            SyncError::config(format!("unknown logging.level `{}`", self.logging.level))
        })?;
        let format = TracingOutputFormat::parse(&self.logging.format).ok_or_else(|| {
            SyncError::config(format!("unknown logging.format `{}`", self.logging.format))
        })?;

        let base = if level >= Level::DEBUG {
            TracingConfig::debug()
        } else {
            TracingConfig::default()
        };
        let mut config = base.with_level(level).with_format(format);
        if let Some(ref file) = self.logging.file {
            config = config.with_log_file(file);
        }
        Ok(config)
    }

    /// Resolves the key file reference and builds the Google source config.
    pub fn google_config(&self) -> SyncResult<GoogleConfig> {
        let raw = self
            .calendar
            .service_account_file
            .as_deref()
            .ok_or_else(|| SyncError::config("calendar.service_account_file is required"))?;
        let path = secret::resolve(raw).map_err(|e| {
            SyncError::config(format!("failed to resolve service_account_file: {}", e))
        })?;
        let key = ServiceAccountKey::from_file(&path)
            .map_err(|e| SyncError::config(e.to_string()))?;

        Ok(GoogleConfig::new(key)
            .with_calendar_id(&self.calendar.calendar_id)
            .with_max_results(self.calendar.max_results)
            .with_include_cancelled(self.calendar.include_cancelled)
            .with_timeout(Duration::from_secs(self.calendar.timeout_secs)))
    }

    /// Resolves the API key and builds the ClickUp sink config.
    pub fn clickup_config(&self) -> SyncResult<ClickUpConfig> {
        let raw = self
            .clickup
            .api_key
            .as_deref()
            .ok_or_else(|| SyncError::config("clickup.api_key is required"))?;
        let api_key = secret::resolve(raw)
            .map_err(|e| SyncError::config(format!("failed to resolve clickup.api_key: {}", e)))?;

        let mut config = ClickUpConfig::new(api_key)
            .with_match_existing(self.clickup.match_existing)
            .with_timeout(Duration::from_secs(self.clickup.timeout_secs));
        if let Some(ref team_id) = self.clickup.team_id {
            config = config.with_team_id(team_id);
        }
        Ok(config)
    }
}
