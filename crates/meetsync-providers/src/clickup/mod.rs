//! ClickUp task sink.
//!
//! [`ClickUpSink`] pushes each formatted meeting to a ClickUp list through
//! the REST API v2, authenticated with a personal API token.
//!
//! # Example
//!
//! ```ignore
//! use meetsync_providers::clickup::{ClickUpConfig, ClickUpSink};
//!
//! let sink = ClickUpSink::new(ClickUpConfig::new(api_key).with_team_id("9001"))?;
//! let id = sink.upsert_task(&task, "901234").await?;
//! ```

mod client;
mod config;
mod sink;

pub use client::{ClickUpClient, ExistingTask, TaskPayload};
pub use config::{CLICKUP_API_BASE, ClickUpConfig};
pub use sink::ClickUpSink;
