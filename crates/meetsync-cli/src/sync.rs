//! The sync pipeline.
//!
//! One run is a single linear pass:
//!
//! 1. Fetch each configured user's events for the lookahead window
//! 2. Merge them into unique meetings ([`meetsync_core::dedupe`])
//! 3. Classify each meeting
//! 4. Format it as a task
//! 5. Push the task to the sink
//!
//! Per-user fetch failures and per-task push failures are logged and counted
//! in the [`SyncSummary`]; the run goes on. The only fatal outcome is a
//! source that is unavailable for every user.

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use meetsync_core::{
    CalendarEvent, Classifier, FormatOptions, TaskFormatter, TimeWindow, dedupe,
};
use meetsync_providers::{EventSource, ProviderResult, TaskSink};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::summary::SyncSummary;

/// What to sync.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub users: Vec<String>,
    pub list_id: String,
    pub days_ahead: u32,
    pub parallel_fetch: bool,
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn new(users: Vec<String>, list_id: impl Into<String>) -> Self {
        Self {
            users,
            list_id: list_id.into(),
            days_ahead: meetsync_core::DEFAULT_DAYS_AHEAD,
            parallel_fetch: false,
            dry_run: false,
        }
    }

    pub fn with_days_ahead(mut self, days: u32) -> Self {
        self.days_ahead = days;
        self
    }

    pub fn with_parallel_fetch(mut self, parallel: bool) -> Self {
        self.parallel_fetch = parallel;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Calendar-to-task sync orchestrator.
pub struct SyncPipeline {
    options: SyncOptions,
    classifier: Classifier,
    formatter: TaskFormatter,
    source: Box<dyn EventSource>,
    sink: Box<dyn TaskSink>,
}

impl SyncPipeline {
    pub fn new(
        options: SyncOptions,
        classifier: Classifier,
        formatter: TaskFormatter,
        source: Box<dyn EventSource>,
        sink: Box<dyn TaskSink>,
    ) -> Self {
        Self {
            options,
            classifier,
            formatter,
            source,
            sink,
        }
    }

    /// Builds a pipeline from a validated configuration.
    pub fn from_config(
        config: &SyncConfig,
        dry_run: bool,
        source: Box<dyn EventSource>,
        sink: Box<dyn TaskSink>,
    ) -> SyncResult<Self> {
        let list_id = config
            .list_id()
            .ok_or_else(|| SyncError::config("clickup.list_id is required"))?;
        let classifier = Classifier::new(&config.classifier_config())
            .map_err(|e| SyncError::config(e.to_string()))?;

        let options = SyncOptions::new(config.users(), list_id)
            .with_days_ahead(config.calendar.days_ahead)
            .with_parallel_fetch(config.calendar.parallel_fetch)
            .with_dry_run(dry_run);

        Ok(Self::new(
            options,
            classifier,
            TaskFormatter::new(FormatOptions::default()),
            source,
            sink,
        ))
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Runs one sync for the window starting at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SourceUnavailable`] if no user's calendar could
    /// be read and at least one failure was the source being unavailable.
    pub async fn run(&self, now: DateTime<Utc>) -> SyncResult<SyncSummary> {
        let window = TimeWindow::lookahead(now, self.options.days_ahead);
        let mut summary = SyncSummary::new(self.options.users.len(), self.options.dry_run);
        info!(
            users = self.options.users.len(),
            start = %window.start,
            end = %window.end,
            source = self.source.name(),
            sink = self.sink.name(),
            "starting sync"
        );

        // 1. Fetch
        let outcomes = self.fetch_all(&window).await;
        let mut per_user = Vec::new();
        let mut unavailable = Vec::new();
        for (user, outcome) in outcomes {
            match outcome {
                Ok(events) => {
                    debug!(user = %user, count = events.len(), "fetched events");
                    summary.fetched += events.len();
                    per_user.push((user, events));
                }
                Err(e) => {
                    error!(user = %user, error = %e, "failed to fetch events, skipping user");
                    if e.is_unavailable() {
                        unavailable.push(e.to_string());
                    }
                    summary.failed_users.push(user);
                }
            }
        }

        if per_user.is_empty() && !unavailable.is_empty() {
            summary.log();
            return Err(SyncError::SourceUnavailable(unavailable.join("; ")));
        }

        // 2. Dedupe
        let meetings = dedupe(per_user);
        summary.deduped = meetings.len();
        info!(
            fetched = summary.fetched,
            meetings = summary.deduped,
            "merged events into unique meetings"
        );

        // 3-5. Classify, format, push
        for meeting in meetings {
            let classified = self.classifier.classify(meeting);
            summary.record_classified(&classified);
            let task = self.formatter.format(&classified);

            match self.sink.upsert_task(&task, &self.options.list_id).await {
                Ok(id) => {
                    debug!(key = %task.source_key, task = %id, "pushed task");
                    summary.pushed += 1;
                }
                Err(e) => {
                    warn!(
                        key = %task.source_key,
                        title = %task.title,
                        error = %e,
                        "failed to push task, skipping"
                    );
                    summary.skipped += 1;
                }
            }
        }

        summary.log();
        Ok(summary)
    }

    async fn fetch_all(
        &self,
        window: &TimeWindow,
    ) -> Vec<(String, ProviderResult<Vec<CalendarEvent>>)> {
        if self.options.parallel_fetch {
            let futures = self.options.users.iter().map(|user| async move {
                (user.clone(), self.source.fetch_events(user, window).await)
            });
            join_all(futures).await
        } else {
            let mut outcomes = Vec::with_capacity(self.options.users.len());
            for user in &self.options.users {
                outcomes.push((user.clone(), self.source.fetch_events(user, window).await));
            }
            outcomes
        }
    }
}

impl std::fmt::Debug for SyncPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPipeline")
            .field("options", &self.options)
            .field("source", &self.source.name())
            .field("sink", &self.sink.name())
            .finish_non_exhaustive()
    }
}
