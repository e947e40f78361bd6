//! The default command: one sync run.

use chrono::Utc;
use meetsync_providers::clickup::ClickUpSink;
use meetsync_providers::google::GoogleCalendarSource;
use meetsync_providers::{ErrorSource, EventSource, ProviderError, TaskSink};
use tracing::error;

use crate::config::SyncConfig;
use crate::dry_run::DryRunSink;
use crate::error::{SyncError, SyncResult};
use crate::summary::SyncSummary;
use crate::sync::SyncPipeline;

const SOURCE_NAME: &str = "google";

/// Builds the pipeline from `config`, runs it and prints the summary.
pub async fn run(config: &SyncConfig, dry_run: bool) -> SyncResult<SyncSummary> {
    config.validate(dry_run)?;

    let source = build_source(config);
    let sink = build_sink(config, dry_run)?;
    let pipeline = SyncPipeline::from_config(config, dry_run, source, sink)?;

    let summary = pipeline.run(Utc::now()).await?;
    println!("{}", summary);
    Ok(summary)
}

/// Builds the calendar source.
///
/// A source that cannot be built still yields one, failing every fetch, so
/// each user is logged as failed and the run ends as "source unavailable".
fn build_source(config: &SyncConfig) -> Box<dyn EventSource> {
    let source = config
        .google_config()
        .map_err(|e| ProviderError::configuration(e.to_string()))
        .and_then(GoogleCalendarSource::new);

    match source {
        Ok(source) => Box::new(source),
        Err(e) => {
            error!(error = %e, "calendar source could not be initialized");
            Box::new(ErrorSource::new(SOURCE_NAME, e))
        }
    }
}

fn build_sink(config: &SyncConfig, dry_run: bool) -> SyncResult<Box<dyn TaskSink>> {
    if dry_run {
        return Ok(Box::new(DryRunSink::new(true)));
    }
    let sink = ClickUpSink::new(config.clickup_config()?)
        .map_err(|e| SyncError::config(e.to_string()))?;
    Ok(Box::new(sink))
}
