//! Source and sink trait definitions.
//!
//! [`EventSource`] is the read side: one call per queried user returns that
//! user's events inside a time window. [`TaskSink`] is the write side: one
//! call per formatted meeting creates or updates a task.
//!
//! Both traits return [`BoxFuture`]s so they stay object-safe and the
//! orchestrator can hold `Box<dyn EventSource>` / `Box<dyn TaskSink>`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use meetsync_core::{CalendarEvent, FormattedTask, TimeWindow};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult, SinkResult};

/// A boxed future for async trait methods.
///
/// Using boxed futures keeps the traits usable with dynamic dispatch.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Identifier of a task in the target system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read access to users' calendars.
///
/// # Implementation Notes
///
/// - Pagination is handled internally; the returned list is complete
/// - Recurrence fields must be passed through untouched
/// - Errors whose [`ProviderError::is_unavailable`] is true mean the source
///   itself cannot be used; the orchestrator aborts if every user fails
///   that way
pub trait EventSource: Send + Sync {
    /// Returns the name of this source (e.g., "google").
    fn name(&self) -> &str;

    /// Fetches the events of `user`'s calendar that overlap `window`.
    fn fetch_events<'a>(
        &'a self,
        user: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>>;
}

/// Write access to the task system.
pub trait TaskSink: Send + Sync {
    /// Returns the name of this sink (e.g., "clickup").
    fn name(&self) -> &str;

    /// Creates a task for `task` in `list_id`, or updates the matching task
    /// if the sink supports matching.
    fn upsert_task<'a>(
        &'a self,
        task: &'a FormattedTask,
        list_id: &'a str,
    ) -> BoxFuture<'a, SinkResult<TaskId>>;
}

/// A source that always returns an error.
///
/// Stands in for a source that failed to initialize, so the run still
/// produces a summary.
#[derive(Debug)]
pub struct ErrorSource {
    name: String,
    error: ProviderError,
}

impl ErrorSource {
    pub fn new(name: impl Into<String>, error: ProviderError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

impl EventSource for ErrorSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_events<'a>(
        &'a self,
        _user: &'a str,
        _window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        // ProviderError is not Clone because of its boxed source
        let error =
            ProviderError::new(self.error.code(), self.error.message()).with_provider(&self.name);
        Box::pin(async move { Err(error) })
    }
}
