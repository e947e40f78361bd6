//! meetsync command: configuration, sync pipeline, run summary.
//!
//! This crate provides the `meetsync` binary. A run reads the configured
//! users' calendars, merges and classifies their meetings and pushes one
//! task per meeting to ClickUp.

pub mod cli;
pub mod commands;
pub mod config;
pub mod dry_run;
pub mod error;
pub mod secret;
pub mod summary;
pub mod sync;

pub use cli::Cli;
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use summary::SyncSummary;
pub use sync::{SyncOptions, SyncPipeline};
