//! Sink that records tasks instead of pushing them.

use std::sync::atomic::{AtomicUsize, Ordering};

use meetsync_core::FormattedTask;
use meetsync_providers::{BoxFuture, SinkError, SinkResult, TaskId, TaskSink};
use tokio::sync::Mutex;
use tracing::info;

/// A [`TaskSink`] for `--dry-run`.
///
/// Every task is logged and kept in memory; with `echo` the task is also
/// printed to stdout as JSON.
#[derive(Debug, Default)]
pub struct DryRunSink {
    echo: bool,
    counter: AtomicUsize,
    tasks: Mutex<Vec<(String, FormattedTask)>>,
}

impl DryRunSink {
    pub fn new(echo: bool) -> Self {
        Self {
            echo,
            ..Self::default()
        }
    }

    /// Returns the recorded `(list id, task)` pairs.
    pub async fn tasks(&self) -> Vec<(String, FormattedTask)> {
        self.tasks.lock().await.clone()
    }
}

impl TaskSink for DryRunSink {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn upsert_task<'a>(
        &'a self,
        task: &'a FormattedTask,
        list_id: &'a str,
    ) -> BoxFuture<'a, SinkResult<TaskId>> {
        Box::pin(async move {
            let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
            let id = TaskId(format!("dry-run-{}", n));
            info!(task = %id, list = %list_id, title = %task.title, "dry run, task not pushed");

            if self.echo {
                let json = serde_json::to_string_pretty(task).map_err(|e| {
                    SinkError::rejected("dry-run", format!("failed to serialize task: {}", e))
                })?;
                println!("{}", json);
            }

            self.tasks
                .lock()
                .await
                .push((list_id.to_string(), task.clone()));
            Ok(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use meetsync_core::{EventStatus, Priority};

    #[tokio::test]
    async fn records_tasks() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        let task = FormattedTask {
            source_key: "evt123".into(),
            title: "Sync".into(),
            description: String::new(),
            time_estimate_minutes: 60,
            tags: vec!["meeting".into()],
            priority: Priority::Urgent,
            status: EventStatus::Confirmed,
            start,
            due: start,
            assignees: vec![],
        };

        let sink = DryRunSink::new(false);
        assert_eq!(sink.upsert_task(&task, "L1").await.unwrap().as_str(), "dry-run-1");
        assert_eq!(sink.upsert_task(&task, "L1").await.unwrap().as_str(), "dry-run-2");

        let tasks = sink.tasks().await;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].0, "L1");
        assert_eq!(tasks[0].1.title, "Sync");
    }
}
