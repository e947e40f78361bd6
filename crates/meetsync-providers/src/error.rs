//! Error types for event sources and task sinks.
//!
//! [`ProviderError`] is returned by calendar sources. Its
//! [`ProviderErrorCode`] decides whether a failure means the source is
//! unavailable (auth, network, rate limit, server, configuration) or whether
//! one query went wrong (bad payload, bad request, not found).
//!
//! [`SinkError`] is returned by task sinks; both of its kinds are per-task
//! and never abort a run.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Authentication failed or credentials are invalid/expired.
    AuthenticationFailed,
    /// Authorization failed - the service account may not impersonate the user.
    AuthorizationFailed,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Rate limit exceeded - too many requests.
    RateLimited,
    /// Server returned an error (5xx status codes).
    ServerError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// Request was invalid (400) - bad parameters, malformed request.
    BadRequest,
    /// Configuration error - missing or invalid config or key file.
    ConfigurationError,
}

impl ProviderErrorCode {
    /// Returns true if the source as a whole cannot be reached or used.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed
                | Self::AuthorizationFailed
                | Self::NetworkError
                | Self::RateLimited
                | Self::ServerError
                | Self::ConfigurationError
        )
    }

    /// Returns the snake_case name used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while fetching from a calendar source.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// The provider that generated this error (e.g., "google").
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the provider name, if set.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Returns true if the source is unreachable or refuses our credentials.
    ///
    /// Other errors concern a single query and are skipped per user.
    pub fn is_unavailable(&self) -> bool {
        self.code.is_unavailable()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Why a task sink failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkErrorKind {
    /// Network failure, timeout, auth failure, rate limit or server error.
    Unavailable,
    /// The target system refused the payload.
    Rejected,
}

impl SinkErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "sink_unavailable",
            Self::Rejected => "sink_rejected",
        }
    }
}

impl fmt::Display for SinkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error that occurred while writing a task.
#[derive(Debug, Error)]
#[error("[{sink}] {kind}: {message}")]
pub struct SinkError {
    kind: SinkErrorKind,
    message: String,
    sink: String,
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SinkError {
    pub fn new(kind: SinkErrorKind, sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            sink: sink.into(),
            status: None,
            source: None,
        }
    }

    pub fn unavailable(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(SinkErrorKind::Unavailable, sink, message)
    }

    pub fn rejected(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(SinkErrorKind::Rejected, sink, message)
    }

    /// Classifies a failed HTTP status.
    ///
    /// 401, 403, 408, 429 and 5xx mean the sink is unavailable; any other
    /// status means the payload was rejected.
    pub fn from_status(sink: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 | 408 | 429 => SinkErrorKind::Unavailable,
            s if s >= 500 => SinkErrorKind::Unavailable,
            _ => SinkErrorKind::Rejected,
        };
        let mut err = Self::new(kind, sink, message);
        err.status = Some(status);
        err
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> SinkErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn sink(&self) -> &str {
        &self.sink
    }

    /// The HTTP status, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_unavailable(&self) -> bool {
        self.kind == SinkErrorKind::Unavailable
    }
}

/// A specialized Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;
