//! ClickUp task sink.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use meetsync_core::FormattedTask;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use super::client::{ClickUpClient, SINK_NAME, TaskPayload};
use super::config::ClickUpConfig;
use crate::error::SinkResult;
use crate::provider::{BoxFuture, TaskId, TaskSink};

/// Existing tasks are matched on name and start time (Unix millis).
type MatchKey = (String, i64);

/// Writes formatted meetings as ClickUp tasks.
///
/// Assignees are resolved from queried users' emails to workspace members
/// once per sink. With `match_existing`, each target list is indexed on
/// first use and tasks with the same name and start are updated instead of
/// duplicated.
#[derive(Debug)]
pub struct ClickUpSink {
    config: ClickUpConfig,
    client: ClickUpClient,
    members: OnceCell<HashMap<String, i64>>,
    existing: Mutex<HashMap<String, HashMap<MatchKey, TaskId>>>,
}

impl ClickUpSink {
    /// Creates a sink from the given configuration.
    pub fn new(config: ClickUpConfig) -> SinkResult<Self> {
        config.validate()?;
        let client = ClickUpClient::new(&config)?;
        info!(
            team = config.team_id.as_deref().unwrap_or("-"),
            match_existing = config.match_existing,
            "clickup sink ready"
        );
        Ok(Self {
            config,
            client,
            members: OnceCell::new(),
            existing: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &ClickUpConfig {
        &self.config
    }

    /// Resolves assignee emails to ClickUp user ids.
    ///
    /// A failed member lookup leaves every task unassigned rather than
    /// failing the push.
    async fn resolve_assignees(&self, task: &FormattedTask) -> Vec<i64> {
        if task.assignees.is_empty() {
            return Vec::new();
        }
        let members = self
            .members
            .get_or_init(|| async {
                self.client.team_members().await.unwrap_or_else(|e| {
                    warn!(error = %e, "could not load workspace members, tasks will be unassigned");
                    HashMap::new()
                })
            })
            .await;

        task.assignees
            .iter()
            .filter_map(|email| {
                let id = members.get(&email.to_lowercase()).copied();
                if id.is_none() {
                    debug!(email = %email, "no workspace member for attendee");
                }
                id
            })
            .collect()
    }

    async fn upsert(&self, task: &FormattedTask, list_id: &str) -> SinkResult<TaskId> {
        let payload = TaskPayload::from_task(task, self.resolve_assignees(task).await);

        if !self.config.match_existing {
            let id = self.client.create_task(list_id, &payload).await?;
            info!(task = %id, key = %task.source_key, "created task");
            return Ok(id);
        }

        let mut lists = self.existing.lock().await;
        let index = match lists.entry(list_id.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let tasks = self.client.list_tasks(list_id).await?;
                entry.insert(
                    tasks
                        .into_iter()
                        .filter_map(|t| Some(((t.name, t.start?.timestamp_millis()), t.id)))
                        .collect(),
                )
            }
        };

        let key = (payload.name.clone(), payload.start_date);
        match index.get(&key) {
            Some(existing) => {
                let id = self.client.update_task(existing, &payload).await?;
                info!(task = %id, key = %task.source_key, "updated existing task");
                Ok(id)
            }
            None => {
                let id = self.client.create_task(list_id, &payload).await?;
                info!(task = %id, key = %task.source_key, "created task");
                index.insert(key, id.clone());
                Ok(id)
            }
        }
    }
}

impl TaskSink for ClickUpSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    fn upsert_task<'a>(
        &'a self,
        task: &'a FormattedTask,
        list_id: &'a str,
    ) -> BoxFuture<'a, SinkResult<TaskId>> {
        Box::pin(self.upsert(task, list_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use meetsync_core::{EventStatus, Priority};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn task(title: &str) -> FormattedTask {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        FormattedTask {
            source_key: "evt123".into(),
            title: title.into(),
            description: String::new(),
            time_estimate_minutes: 30,
            tags: vec!["meeting".into()],
            priority: Priority::Normal,
            status: EventStatus::Tentative,
            start,
            due: start,
            assignees: vec!["a@mycompany.com".into(), "b@mycompany.com".into()],
        }
    }

    fn sink_for(server: &MockServer, match_existing: bool) -> ClickUpSink {
        let config = ClickUpConfig::new("pk_test")
            .with_team_id("9001")
            .with_match_existing(match_existing)
            .with_api_base(server.uri());
        ClickUpSink::new(config).unwrap()
    }

    async fn mount_team(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/team"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "teams": [{"id": "9001", "members": [
                    {"user": {"id": 7, "email": "a@mycompany.com"}}
                ]}]
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn rejects_invalid_config() {
        let err = ClickUpSink::new(ClickUpConfig::new("")).unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn creates_with_resolved_assignees() {
        let server = MockServer::start().await;
        mount_team(&server).await;
        Mock::given(method("POST"))
            .and(path("/list/L1/task"))
            .and(body_partial_json(json!({"assignees": [7], "priority": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t1"})))
            .expect(2)
            .mount(&server)
            .await;

        let sink = sink_for(&server, false);
        assert_eq!(sink.name(), "clickup");
        assert_eq!(sink.upsert_task(&task("Sync"), "L1").await.unwrap(), TaskId::new("t1"));
        // member lookup happens once
        sink.upsert_task(&task("Sync"), "L1").await.unwrap();
    }

    #[tokio::test]
    async fn member_lookup_failure_is_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/team"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/list/L1/task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t1"})))
            .mount(&server)
            .await;

        let id = sink_for(&server, false).upsert_task(&task("Sync"), "L1").await.unwrap();
        assert_eq!(id.as_str(), "t1");
    }

    #[tokio::test]
    async fn updates_matching_task() {
        let server = MockServer::start().await;
        mount_team(&server).await;
        Mock::given(method("GET"))
            .and(path("/list/L1/task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tasks": [{"id": "old", "name": "Sync", "start_date": "1741600800000"}],
                "last_page": true
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/task/old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "old"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/list/L1/task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new"})))
            .expect(1)
            .mount(&server)
            .await;

        let sink = sink_for(&server, true);
        assert_eq!(sink.upsert_task(&task("Sync"), "L1").await.unwrap().as_str(), "old");
        assert_eq!(sink.upsert_task(&task("Review"), "L1").await.unwrap().as_str(), "new");
    }

    #[tokio::test]
    async fn created_tasks_are_matched_later_in_the_run() {
        let server = MockServer::start().await;
        mount_team(&server).await;
        Mock::given(method("GET"))
            .and(path("/list/L1/task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tasks": []})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/list/L1/task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/task/t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t1"})))
            .expect(1)
            .mount(&server)
            .await;

        let sink = sink_for(&server, true);
        sink.upsert_task(&task("Sync"), "L1").await.unwrap();
        sink.upsert_task(&task("Sync"), "L1").await.unwrap();
    }

    #[tokio::test]
    async fn rejected_payload() {
        let server = MockServer::start().await;
        mount_team(&server).await;
        Mock::given(method("POST"))
            .and(path("/list/L1/task"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"err":"bad"}"#))
            .mount(&server)
            .await;

        let err = sink_for(&server, false)
            .upsert_task(&task("Sync"), "L1")
            .await
            .unwrap_err();
        assert!(!err.is_unavailable());
    }
}
