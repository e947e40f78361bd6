//! ClickUp REST API v2 client.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use meetsync_core::FormattedTask;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::config::ClickUpConfig;
use crate::error::{SinkError, SinkResult};
use crate::provider::TaskId;

pub(crate) const SINK_NAME: &str = "clickup";

/// Body of a task create or update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPayload {
    pub name: String,
    pub description: String,
    /// Milliseconds.
    pub time_estimate: i64,
    /// Unix milliseconds.
    pub start_date: i64,
    pub start_date_time: bool,
    /// Unix milliseconds.
    pub due_date: i64,
    pub due_date_time: bool,
    pub priority: u8,
    /// Only honoured on create; ClickUp ignores tags on update.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// ClickUp user ids. Only sent on create.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<i64>,
}

impl TaskPayload {
    /// Builds the payload for `task`, with assignees already resolved.
    pub fn from_task(task: &FormattedTask, assignees: Vec<i64>) -> Self {
        Self {
            name: task.title.clone(),
            description: task.description.clone(),
            time_estimate: task.time_estimate_minutes * 60_000,
            start_date: task.start.timestamp_millis(),
            start_date_time: true,
            due_date: task.due.timestamp_millis(),
            due_date_time: true,
            priority: task.priority.clickup_value(),
            tags: task.tags.clone(),
            assignees,
        }
    }

    /// The payload sent on update: assignees use a different shape there
    /// and are left untouched.
    fn for_update(&self) -> Self {
        Self {
            assignees: Vec::new(),
            ..self.clone()
        }
    }
}

/// A task already present in a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingTask {
    pub id: TaskId,
    pub name: String,
    pub start: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TaskCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TeamsResponse {
    #[serde(default)]
    teams: Vec<ApiTeam>,
}

#[derive(Debug, Deserialize)]
struct ApiTeam {
    id: String,
    #[serde(default)]
    members: Vec<ApiMember>,
}

#[derive(Debug, Deserialize)]
struct ApiMember {
    user: ApiUser,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: i64,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TasksResponse {
    #[serde(default)]
    tasks: Vec<ApiTask>,
    #[serde(default)]
    last_page: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ApiTask {
    id: String,
    #[serde(default)]
    name: String,
    /// Unix milliseconds as a string.
    #[serde(default)]
    start_date: Option<String>,
}

impl ApiTask {
    fn into_existing(self) -> ExistingTask {
        let start = self
            .start_date
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis);
        ExistingTask {
            id: TaskId(self.id),
            name: self.name,
            start,
        }
    }
}

/// Low-level ClickUp client.
pub struct ClickUpClient {
    http_client: reqwest::Client,
    api_key: String,
    team_id: Option<String>,
    api_base: String,
}

impl std::fmt::Debug for ClickUpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickUpClient")
            .field("team_id", &self.team_id)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl ClickUpClient {
    pub fn new(config: &ClickUpConfig) -> SinkResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                SinkError::unavailable(SINK_NAME, format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            team_id: config.team_id.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Maps workspace member emails (lowercased) to ClickUp user ids.
    ///
    /// With a team id only that workspace is considered.
    pub async fn team_members(&self) -> SinkResult<HashMap<String, i64>> {
        let url = format!("{}/team", self.api_base);
        let response: TeamsResponse = self.send(self.http_client.get(&url)).await?;

        let members = response
            .teams
            .into_iter()
            .filter(|team| self.team_id.as_deref().is_none_or(|id| id == team.id))
            .flat_map(|team| team.members)
            .filter_map(|m| Some((m.user.email?.to_lowercase(), m.user.id)))
            .collect::<HashMap<_, _>>();
        debug!(count = members.len(), "loaded workspace members");
        Ok(members)
    }

    /// Creates a task in `list_id`.
    pub async fn create_task(&self, list_id: &str, payload: &TaskPayload) -> SinkResult<TaskId> {
        let url = format!("{}/list/{}/task", self.api_base, urlencoding::encode(list_id));
        trace!(list = %list_id, name = %payload.name, "creating task");
        let mut request = self.http_client.post(&url);
        if let Some(team_id) = &self.team_id {
            request = request.query(&[("custom_task_ids", "true"), ("team_id", team_id.as_str())]);
        }
        let created: TaskCreated = self.send(request.json(payload)).await?;
        Ok(TaskId(created.id))
    }

    /// Updates an existing task.
    pub async fn update_task(&self, id: &TaskId, payload: &TaskPayload) -> SinkResult<TaskId> {
        let url = format!("{}/task/{}", self.api_base, urlencoding::encode(id.as_str()));
        trace!(task = %id, name = %payload.name, "updating task");
        let updated: TaskCreated = self
            .send(self.http_client.put(&url).json(&payload.for_update()))
            .await?;
        Ok(TaskId(updated.id))
    }

    /// Lists every task in `list_id`, closed ones included.
    pub async fn list_tasks(&self, list_id: &str) -> SinkResult<Vec<ExistingTask>> {
        let url = format!("{}/list/{}/task", self.api_base, urlencoding::encode(list_id));
        let mut tasks = Vec::new();
        let mut page = 0u32;

        loop {
            let page_param = page.to_string();
            let request = self
                .http_client
                .get(&url)
                .query(&[("page", page_param.as_str()), ("include_closed", "true")]);
            let response: TasksResponse = self.send(request).await?;

            let count = response.tasks.len();
            tasks.extend(response.tasks.into_iter().map(ApiTask::into_existing));
            if count == 0 || response.last_page.unwrap_or(true) {
                break;
            }
            page += 1;
        }

        debug!(list = %list_id, count = tasks.len(), "listed existing tasks");
        Ok(tasks)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> SinkResult<T> {
        let response = request
            .header("Authorization", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timeout".to_string()
                } else {
                    format!("request failed: {}", e)
                };
                SinkError::unavailable(SINK_NAME, message).with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            SinkError::unavailable(SINK_NAME, format!("failed to read response: {}", e))
        })?;

        if !status.is_success() {
            return Err(SinkError::from_status(
                SINK_NAME,
                status.as_u16(),
                format!("ClickUp API error ({}): {}", status, body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            SinkError::rejected(SINK_NAME, format!("invalid ClickUp response: {}", e))
                .with_source(e)
        })
    }
}
