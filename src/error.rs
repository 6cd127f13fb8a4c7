//! Error types for syncline
//!
//! This module defines the error taxonomy for the entire engine.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for syncline
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unknown option '{option}' for table '{table}' (not in the connection allow-list)")]
    UnknownOption { option: String, table: String },

    #[error("Table '{table}' is not supported by source '{source_name}'")]
    TableNotFound { table: String, source_name: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Token refresh failed: {message}")]
    TokenRefresh { message: String },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Transient failure: {message}")]
    Transient { message: String },

    #[error("HTTP {status} from {context}: {body}")]
    Permanent {
        status: u16,
        context: String,
        body: String,
    },

    #[error("Retry budget ({max_retries}) exhausted: {message}")]
    QuotaExceeded { max_retries: u32, message: String },

    // ============================================================================
    // Sync Errors
    // ============================================================================
    #[error("Cursor '{cursor}' rejected by source for table '{table}': {message}")]
    CursorExpired {
        table: String,
        cursor: String,
        message: String,
    },

    #[error("Schema validation failed for table '{table}': {message}")]
    SchemaValidation { table: String, message: String },

    #[error("State error: {message}")]
    State { message: String },

    #[error("Tenant '{tenant}' sync failed for table '{table}': {source}")]
    Tenant {
        tenant: String,
        table: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Source does not support {capability} for table '{table}'")]
    Unsupported { capability: String, table: String },
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a transient error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Create a permanent error with request context
    pub fn permanent(status: u16, context: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Permanent {
            status,
            context: context.into(),
            body: body.into(),
        }
    }

    /// Create a cursor-expired error
    pub fn cursor_expired(
        table: impl Into<String>,
        cursor: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CursorExpired {
            table: table.into(),
            cursor: cursor.into(),
            message: message.into(),
        }
    }

    /// Create a schema validation error
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create an unsupported-capability error
    pub fn unsupported(capability: impl Into<String>, table: impl Into<String>) -> Self {
        Self::Unsupported {
            capability: capability.into(),
            table: table.into(),
        }
    }

    /// Wrap an error with the tenant it occurred in
    pub fn for_tenant(self, tenant: impl Into<String>, table: impl Into<String>) -> Self {
        Self::Tenant {
            tenant: tenant.into(),
            table: table.into(),
            source: Box::new(self),
        }
    }

    /// Check if this error is retryable in place
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimited { .. } | Error::Transient { .. } => true,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Check if this error is fatal for the whole run (never retried)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Auth { .. } | Error::TokenRefresh { .. } | Error::QuotaExceeded { .. }
        )
    }
}

/// Classify an HTTP status code into the error taxonomy.
///
/// 2xx maps to `None` (success); everything else yields the error the
/// caller should surface or retry.
pub fn classify_status(status: u16, context: &str, body: String) -> Option<Error> {
    match status {
        200..=299 => None,
        401 | 403 => Some(Error::Auth {
            message: format!("HTTP {status} from {context}: {body}"),
        }),
        429 => Some(Error::RateLimited {
            retry_after_seconds: 0,
        }),
        400..=499 => Some(Error::permanent(status, context, body)),
        _ => Some(Error::Transient {
            message: format!("HTTP {status} from {context}: {body}"),
        }),
    }
}

/// Check if an HTTP status code is retryable
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500..=599)
}

/// Result type alias for syncline
pub type Result<T> = std::result::Result<T, Error>;
