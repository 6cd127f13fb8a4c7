//! Token manager implementation
//!
//! Holds the per-connection token cache and performs the refresh exchange.

use super::types::AccessToken;
use crate::config::Credentials;
use crate::error::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Acquires, caches and refreshes bearer credentials for one connection.
///
/// Shared mutable state is limited to the cached token; it is safe under
/// concurrent access from all tables and tenants of the connection.
pub struct TokenManager {
    credentials: Credentials,
    margin: Duration,
    cached: Arc<RwLock<Option<AccessToken>>>,
    http_client: Client,
}

impl TokenManager {
    /// Create a token manager for the given credentials
    pub fn new(credentials: Credentials, margin: Duration) -> Self {
        Self::with_client(credentials, margin, Client::new())
    }

    /// Create a token manager with a custom HTTP client
    pub fn with_client(credentials: Credentials, margin: Duration, http_client: Client) -> Self {
        Self {
            credentials,
            margin,
            cached: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Check whether this connection uses bearer auth at all
    pub fn is_authenticated(&self) -> bool {
        !matches!(self.credentials, Credentials::None)
    }

    /// Get a currently valid bearer value, refreshing when absent or near
    /// expiry.
    ///
    /// Single-flight: the write lock is held across the refresh exchange, so
    /// N concurrent callers during an expired window trigger exactly one
    /// refresh call and all receive its result.
    pub async fn get_token(&self) -> Result<String> {
        match &self.credentials {
            Credentials::StaticBearer { token } => return Ok(token.clone()),
            Credentials::None => {
                return Err(Error::auth("connection has no credentials configured"))
            }
            Credentials::RefreshToken { .. } => {}
        }

        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_stale(self.margin) {
                    return Ok(token.value.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;

        // Another task may have refreshed while we waited for the write lock
        if let Some(token) = cached.as_ref() {
            if !token.is_stale(self.margin) {
                return Ok(token.value.clone());
            }
        }

        let new_token = self.refresh().await?;
        let value = new_token.value.clone();
        *cached = Some(new_token);

        Ok(value)
    }

    /// Clear the cached token, forcing a refresh on the next call
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        *cached = None;
    }

    /// Perform one refresh exchange against the token endpoint
    async fn refresh(&self) -> Result<AccessToken> {
        let Credentials::RefreshToken {
            token_url,
            client_id,
            client_secret,
            refresh_token,
        } = &self.credentials
        else {
            return Err(Error::auth("credentials do not support refresh"));
        };

        debug!(token_url, "refreshing access token");

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
        ];

        let response = self
            .http_client
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    Error::transient(format!("token endpoint unreachable: {e}"))
                } else {
                    Error::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let status = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            // 4xx from the token endpoint means the stored credential is
            // bad or revoked; that is fatal, not retried.
            if (400..500).contains(&status) {
                return Err(Error::Auth {
                    message: format!("token endpoint returned {status}: {body}"),
                });
            }
            return Err(Error::transient(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response.json().await.map_err(Error::Http)?;
        Ok(token_response.into_access_token())
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("authenticated", &self.is_authenticated())
            .field("margin", &self.margin)
            .finish_non_exhaustive()
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_access_token(self) -> AccessToken {
        match self.expires_in {
            Some(secs) => AccessToken::expires_in(self.access_token, secs),
            None => AccessToken::new(self.access_token, None),
        }
    }
}
