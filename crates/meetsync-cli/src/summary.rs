//! Run summary.

use std::fmt;

use meetsync_core::{ClassifiedMeeting, RecurrenceDetection};
use serde::Serialize;
use tracing::info;

/// How recurring meetings were recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecurringBreakdown {
    /// Explicit recurrence rule.
    pub rule: usize,
    /// Instance of a recurring series.
    pub instance: usize,
    /// Keyword heuristic.
    pub keyword: usize,
}

impl RecurringBreakdown {
    pub fn total(&self) -> usize {
        self.rule + self.instance + self.keyword
    }
}

/// Counters for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Users queried.
    pub users: usize,
    /// Users whose calendar could not be read.
    pub failed_users: Vec<String>,
    /// Events returned across all users, before dedupe.
    pub fetched: usize,
    pub deduped: usize,
    pub classified: usize,
    pub pushed: usize,
    /// Tasks the sink did not accept.
    pub skipped: usize,
    pub recurring: RecurringBreakdown,
    pub internal: usize,
    pub client_facing: usize,
    pub dry_run: bool,
}

impl SyncSummary {
    pub fn new(users: usize, dry_run: bool) -> Self {
        Self {
            users,
            dry_run,
            ..Self::default()
        }
    }

    /// Counts a classified meeting.
    pub fn record_classified(&mut self, meeting: &ClassifiedMeeting) {
        self.classified += 1;
        match meeting.recurrence {
            RecurrenceDetection::Rule => self.recurring.rule += 1,
            RecurrenceDetection::Instance => self.recurring.instance += 1,
            RecurrenceDetection::Keyword { .. } => self.recurring.keyword += 1,
            RecurrenceDetection::None => {}
        }
        if meeting.is_client_facing() {
            self.client_facing += 1;
        } else {
            self.internal += 1;
        }
    }

    pub fn one_time(&self) -> usize {
        self.classified - self.recurring.total()
    }

    /// Logs the summary as one structured event.
    pub fn log(&self) {
        info!(
            users = self.users,
            failed_users = self.failed_users.len(),
            fetched = self.fetched,
            deduped = self.deduped,
            classified = self.classified,
            pushed = self.pushed,
            skipped = self.skipped,
            recurring_rule = self.recurring.rule,
            recurring_instance = self.recurring.instance,
            recurring_keyword = self.recurring.keyword,
            internal = self.internal,
            client_facing = self.client_facing,
            dry_run = self.dry_run,
            "sync finished"
        );
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heading = if self.dry_run {
            "Sync summary (dry run)"
        } else {
            "Sync summary"
        };
        writeln!(f, "{}", heading)?;
        writeln!(
            f,
            "  users:      {} ({} failed)",
            self.users,
            self.failed_users.len()
        )?;
        for user in &self.failed_users {
            writeln!(f, "    failed: {}", user)?;
        }
        writeln!(f, "  fetched:    {}", self.fetched)?;
        writeln!(f, "  deduped:    {}", self.deduped)?;
        writeln!(f, "  classified: {}", self.classified)?;
        writeln!(
            f,
            "    recurring: {} (rule {}, series instance {}, keyword {})",
            self.recurring.total(),
            self.recurring.rule,
            self.recurring.instance,
            self.recurring.keyword
        )?;
        writeln!(f, "    one-time:  {}", self.one_time())?;
        writeln!(
            f,
            "    internal:  {}, client: {}",
            self.internal, self.client_facing
        )?;
        writeln!(f, "  pushed:     {}", self.pushed)?;
        write!(f, "  skipped:    {}", self.skipped)
    }
}
