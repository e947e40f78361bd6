//! Google Calendar event source.
//!
//! This module provides a [`GoogleCalendarSource`] that reads each queried
//! user's calendar through the Google Calendar API.
//!
//! # Authentication
//!
//! A Google Workspace service account with domain-wide delegation
//! impersonates every user:
//!
//! 1. The service-account key file is loaded once ([`ServiceAccountKey`])
//! 2. For each user a JWT with `sub` = user is signed with the key
//! 3. The JWT is exchanged at the token endpoint for an access token
//! 4. Tokens are cached per user for the run
//!
//! # Example
//!
//! ```ignore
//! use meetsync_providers::google::{GoogleCalendarSource, GoogleConfig, ServiceAccountKey};
//!
//! let key = ServiceAccountKey::from_file("/etc/meetsync/service-account.json")?;
//! let source = GoogleCalendarSource::new(GoogleConfig::new(key))?;
//! let events = source.fetch_events("angela@mycompany.com", &window).await?;
//! ```

mod auth;
mod client;
mod config;
mod provider;

pub use auth::ServiceAccountAuth;
pub use client::GoogleCalendarClient;
pub use config::{CALENDAR_API_BASE, GOOGLE_TOKEN_URL, GoogleConfig, ServiceAccountKey};
pub use provider::GoogleCalendarSource;
