//! Per-connection HTTP gateway
//!
//! Every source request routes through `ApiClient`: the rate limiter is
//! consulted before dispatch, the bearer token is applied per request, and
//! 429/5xx/timeout responses are retried in place under the connection's
//! retry policy. Permanent and auth failures abort immediately with the
//! offending request context attached.

use crate::auth::TokenManager;
use crate::config::Connection;
use crate::error::{classify_status, Error, Result};
use crate::limit::{RateLimiter, RetryPolicy};
use crate::types::JsonValue;
use reqwest::{Client, Method, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP gateway shared by all tables and tenants of one connection
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a client for a connection
    pub fn new(connection: &Connection) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            tokens: Arc::new(TokenManager::with_client(
                connection.credentials.clone(),
                connection.token_expiry_margin,
                client.clone(),
            )),
            limiter: RateLimiter::new(connection.requests_per_second, connection.burst_size),
            retry: RetryPolicy::new(
                connection.max_retries,
                connection.initial_backoff,
                connection.max_backoff,
            ),
            base_url: connection.base_url.clone(),
            client,
        }
    }

    /// The token manager backing this client
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// GET a JSON document
    pub async fn get_json(
        &self,
        path: &str,
        query: &[(String, String)],
        scope: Option<&str>,
    ) -> Result<JsonValue> {
        self.request_json(Method::GET, path, query, None, scope)
            .await
    }

    /// POST a JSON body and parse the JSON response
    pub async fn post_json(
        &self,
        path: &str,
        body: JsonValue,
        scope: Option<&str>,
    ) -> Result<JsonValue> {
        self.request_json(Method::POST, path, &[], Some(body), scope)
            .await
    }

    /// Make a request, retrying rate-limit and transient failures in place
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<JsonValue>,
        scope: Option<&str>,
    ) -> Result<JsonValue> {
        let url = self.build_url(path);
        let context = format!("{method} {url}");
        let mut attempt = 0;

        loop {
            // Backpressure before dispatch, never rejection
            self.limiter.acquire(scope).await;

            let mut req = self.client.request(method.clone(), &url);
            if !query.is_empty() {
                req = req.query(query);
            }
            if let Some(ref body) = body {
                req = req.json(body);
            }
            if self.tokens.is_authenticated() {
                let token = self.tokens.get_token().await?;
                req = req.bearer_auth(token);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = extract_retry_after(&response);
                        if self.retry.should_retry(attempt) {
                            let delay = self.retry.delay_for(attempt, retry_after);
                            warn!(
                                context,
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                "rate limited (429), backing off"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(Error::QuotaExceeded {
                            max_retries: self.retry.max_retries,
                            message: format!("still rate limited after retries: {context}"),
                        });
                    }

                    if status.is_server_error() {
                        if self.retry.should_retry(attempt) {
                            let delay = self.retry.delay_for(attempt, None);
                            warn!(
                                context,
                                status = status.as_u16(),
                                attempt,
                                "server error, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::transient(format!(
                            "HTTP {} from {context} after {} retries: {body}",
                            status.as_u16(),
                            self.retry.max_retries
                        )));
                    }

                    let status = status.as_u16();
                    let bytes = response.text().await.map_err(Error::Http)?;
                    if let Some(err) = classify_status(status, &context, truncate(&bytes)) {
                        return Err(err);
                    }

                    debug!(context, status, "request succeeded");
                    if bytes.is_empty() {
                        return Ok(JsonValue::Null);
                    }
                    return Ok(serde_json::from_str(&bytes)?);
                }
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && self.retry.should_retry(attempt) {
                        let delay = self.retry.delay_for(attempt, None);
                        warn!(context, attempt, error = %e, "network error, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    if e.is_timeout() || e.is_connect() {
                        return Err(Error::transient(format!("{context}: {e}")));
                    }
                    return Err(Error::Http(e));
                }
            }
        }
    }

    /// Build a full URL from a path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Extract a Retry-After header value as a duration
fn extract_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}

/// Keep error bodies short enough to log and carry on errors
fn truncate(body: &str) -> String {
    const MAX: usize = 512;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}
