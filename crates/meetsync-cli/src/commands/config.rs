//! Configuration commands.

use meetsync_providers::google::GoogleCalendarSource;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::secret;

/// Dump the effective configuration to stdout.
///
/// Literal API keys are masked; secret references are shown as written.
pub fn dump(config: &SyncConfig) -> SyncResult<()> {
    let mut shown = config.clone();
    if let Some(ref key) = shown.clickup.api_key {
        if !secret::is_reference(key) {
            shown.clickup.api_key = Some("<redacted>".to_string());
        }
    }

    let toml_str = toml::to_string_pretty(&shown)
        .map_err(|e| SyncError::config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", SyncConfig::default_path().display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration, resolving credentials.
pub fn validate(config: &SyncConfig) -> SyncResult<()> {
    config.validate(false)?;

    let google = config.google_config()?;
    GoogleCalendarSource::new(google)
        .map_err(|e| SyncError::config(format!("invalid service account: {}", e)))?;
    println!("Service account key is valid.");

    config.clickup_config()?;
    println!("ClickUp API key resolved.");

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> SyncResult<()> {
    println!("config: {}", SyncConfig::default_path().display());
    Ok(())
}
