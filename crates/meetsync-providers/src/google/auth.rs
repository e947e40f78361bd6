//! Service-account token exchange with domain-wide delegation.
//!
//! For each queried user a JWT is signed with the service account's key
//! (`iss` = service account, `sub` = user) and exchanged at the token
//! endpoint for a short-lived access token. Tokens are cached per user for
//! the lifetime of the [`ServiceAccountAuth`].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::config::GoogleConfig;
use crate::error::{ProviderError, ProviderResult};

/// OAuth grant type for signed JWT assertions.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of a signed assertion; Google accepts at most one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens this close to expiry are refreshed.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Mints per-user access tokens from a service-account key.
pub struct ServiceAccountAuth {
    http_client: reqwest::Client,
    encoding_key: EncodingKey,
    key_id: Option<String>,
    client_email: String,
    token_uri: String,
    scope: String,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl std::fmt::Debug for ServiceAccountAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountAuth")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountAuth {
    /// Creates the authenticator, parsing the private key.
    pub fn new(config: &GoogleConfig, http_client: reqwest::Client) -> ProviderResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.key.private_key.as_bytes())
            .map_err(|e| {
                ProviderError::configuration(format!("invalid service account private key: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            encoding_key,
            key_id: config.key.private_key_id.clone(),
            client_email: config.key.client_email.clone(),
            token_uri: config.key.token_uri.clone(),
            scope: config.scopes.join(" "),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Returns an access token for `user`, from cache when still fresh.
    pub async fn access_token(&self, user: &str) -> ProviderResult<String> {
        let now = Utc::now();
        if let Some(cached) = self.cache.lock().await.get(user) {
            if cached.is_fresh(now) {
                return Ok(cached.access_token.clone());
            }
        }

        let token = self.request_token(user, now).await?;
        let access_token = token.access_token.clone();
        self.cache.lock().await.insert(user.to_string(), token);
        Ok(access_token)
    }

    /// Drops the cached token for `user`.
    pub async fn invalidate(&self, user: &str) {
        self.cache.lock().await.remove(user);
    }

    /// Signs the JWT assertion for `user`.
    fn sign_assertion(&self, user: &str, now: DateTime<Utc>) -> ProviderResult<String> {
        let claims = Claims {
            iss: self.client_email.clone(),
            sub: user.to_string(),
            scope: self.scope.clone(),
            aud: self.token_uri.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            ProviderError::configuration(format!("failed to sign token request: {}", e))
                .with_source(e)
        })
    }

    async fn request_token(&self, user: &str, now: DateTime<Utc>) -> ProviderResult<CachedToken> {
        let assertion = self.sign_assertion(user, now)?;
        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        debug!(user = %user, "requesting access token");
        let response = self
            .http_client
            .post(&self.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("token request timeout")
                } else {
                    ProviderError::network(format!("token request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(token_error(status, user, &body));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })?;

        let expires_in = token_response.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        info!(user = %user, "obtained access token");
        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at: now + Duration::seconds(expires_in),
        })
    }
}

fn token_error(status: reqwest::StatusCode, user: &str, body: &str) -> ProviderError {
    let message = format!("token request for {} failed ({}): {}", user, status, body);
    match status.as_u16() {
        429 => ProviderError::rate_limited(message),
        s if s >= 500 => ProviderError::server(message),
        // invalid_client: the key itself is wrong
        _ if body.contains("invalid_client") => ProviderError::authentication(message),
        // unauthorized_client / invalid_grant: delegation missing or user unknown
        _ => ProviderError::authorization(message),
    }
}
