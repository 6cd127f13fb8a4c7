//! Access token types

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A bearer token with its absolute expiry instant
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The bearer value
    pub value: String,
    /// When the token expires; None means it never expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Create a token with an absolute expiry
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Create a token that expires in `seconds` from now.
    ///
    /// The absolute expiry is computed from the response receipt time, per
    /// the token endpoint contract (`expires_in` is relative).
    pub fn expires_in(value: impl Into<String>, seconds: i64) -> Self {
        Self {
            value: value.into(),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(seconds)),
        }
    }

    /// Create a token without expiry (static bearer credentials)
    pub fn permanent(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    /// Check whether the token is within `margin` of its expiry.
    ///
    /// A token inside the margin is never handed to a caller; it is
    /// refreshed first.
    pub fn is_stale(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let margin = chrono::Duration::from_std(margin)
                    .unwrap_or_else(|_| chrono::Duration::seconds(60));
                Utc::now() + margin >= expires_at
            }
            None => false,
        }
    }
}
