//! Event sources and task sinks.
//!
//! This crate provides the I/O edges of a sync run:
//!
//! - [`EventSource`] - Reads one user's calendar for a time window
//! - [`TaskSink`] - Creates or updates one task per meeting
//! - [`ProviderError`] / [`SinkError`] - Error types for each side
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐              ┌─────────────────┐
//! │ Google Calendar API │              │  ClickUp API v2 │
//! └──────────┬──────────┘              └────────▲────────┘
//!            │                                  │
//!            ▼                                  │
//! ┌─────────────────────┐              ┌────────┴────────┐
//! │GoogleCalendarSource │              │   ClickUpSink   │
//! └──────────┬──────────┘              └────────▲────────┘
//!            │ EventSource                      │ TaskSink
//!            ▼                                  │
//!     ┌──────────────┐                  ┌───────┴────────┐
//!     │CalendarEvent │ ── dedupe ──▶    │ FormattedTask  │
//!     └──────────────┘   classify       └────────────────┘
//!                        format
//! ```
//!
//! # Example
//!
//! ```ignore
//! use meetsync_providers::{EventSource, TaskSink};
//!
//! async fn push_one(source: &dyn EventSource, sink: &dyn TaskSink) {
//!     let events = source.fetch_events("angela@mycompany.com", &window).await?;
//!     // dedupe, classify, format...
//!     sink.upsert_task(&task, "901234").await?;
//! }
//! ```

#[cfg(feature = "clickup")]
pub mod clickup;
pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod provider;

// Re-export main types at crate root
pub use error::{
    ProviderError, ProviderErrorCode, ProviderResult, SinkError, SinkErrorKind, SinkResult,
};
pub use provider::{BoxFuture, ErrorSource, EventSource, TaskId, TaskSink};
