//! Configuration types for connections and table specs
//!
//! A `Connection` is created once per registered integration and is
//! immutable afterwards (refreshed-token state lives in the TokenManager).
//! A `TableSpec` describes one logical table for the duration of a sync.

use crate::error::{Error, Result};
use crate::types::{IngestionMode, StringMap};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

// ============================================================================
// Credentials
// ============================================================================

/// Credential bundle for a connection.
///
/// Opaque to the engine beyond the refresh contract: either a long-lived
/// refresh credential exchanged at a token endpoint, or a static bearer
/// value used as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// OAuth2 refresh-token flow
    RefreshToken {
        /// Token endpoint URL
        token_url: String,
        /// OAuth client id
        client_id: String,
        /// OAuth client secret
        client_secret: String,
        /// Long-lived refresh token
        refresh_token: String,
    },
    /// Static bearer token, never refreshed
    StaticBearer {
        /// The bearer value
        token: String,
    },
    /// No authentication
    None,
}

// ============================================================================
// Connection
// ============================================================================

/// One registered integration: endpoint, credentials, and the explicit
/// allow-list of per-table option names this connection recognizes.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Base endpoint for all API requests
    pub base_url: String,
    /// Credential bundle
    pub credentials: Credentials,
    /// Recognized per-table option names; unknown options are rejected
    pub allowed_options: HashSet<String>,
    /// Steady-state request budget, per (connection, tenant-scope) pair
    pub requests_per_second: u32,
    /// Burst size for the request bucket
    pub burst_size: u32,
    /// Maximum in-place retries before surfacing a failure
    pub max_retries: u32,
    /// Initial delay for exponential backoff
    pub initial_backoff: Duration,
    /// Cap for exponential backoff
    pub max_backoff: Duration,
    /// How long before expiry a cached token is considered stale
    pub token_expiry_margin: Duration,
}

impl Connection {
    /// Create a connection with default pacing settings
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            allowed_options: HashSet::new(),
            requests_per_second: 10,
            burst_size: 10,
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            token_expiry_margin: Duration::from_secs(60),
        }
    }

    /// Declare the per-table option names this connection recognizes
    #[must_use]
    pub fn with_allowed_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Set the steady-state request budget
    #[must_use]
    pub fn with_rate(mut self, requests_per_second: u32, burst_size: u32) -> Self {
        self.requests_per_second = requests_per_second;
        self.burst_size = burst_size;
        self
    }

    /// Set the retry budget and backoff window
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, initial: Duration, max: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Set the token expiry safety margin
    #[must_use]
    pub fn with_token_margin(mut self, margin: Duration) -> Self {
        self.token_expiry_margin = margin;
        self
    }

    /// Check that the connection's endpoints parse as absolute URLs.
    ///
    /// Run before any request is issued; a malformed endpoint fails the
    /// whole run rather than producing garbled request paths.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)?;
        if let Credentials::RefreshToken { token_url, .. } = &self.credentials {
            Url::parse(token_url)?;
        }
        Ok(())
    }
}

// ============================================================================
// Table Spec
// ============================================================================

/// Specification of one logical table for a sync run. Immutable during a sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name as the source knows it
    pub name: String,

    /// How this table is ingested
    #[serde(default)]
    pub mode: IngestionMode,

    /// Primary-key field names (tenant prefix is added by the engine)
    pub primary_key: Vec<String>,

    /// Cursor field name; required for incremental modes
    #[serde(default)]
    pub cursor_field: Option<String>,

    /// Field name under which the tenant id is tagged onto records
    #[serde(default)]
    pub tenant_field: Option<String>,

    /// Tenant identifiers this table spans; empty means unscoped
    #[serde(default)]
    pub tenants: Vec<String>,

    /// Earliest cursor value a resync may start from
    #[serde(default)]
    pub cursor_floor: Option<String>,

    /// Cursor units re-fetched each run to capture late-settling data
    #[serde(default)]
    pub lookback: Option<u64>,

    /// Per-table options, restricted to the connection's allow-list
    #[serde(default)]
    pub options: StringMap,
}

impl TableSpec {
    /// Create a snapshot table spec
    pub fn snapshot(name: impl Into<String>, primary_key: Vec<String>) -> Self {
        Self {
            name: name.into(),
            mode: IngestionMode::Snapshot,
            primary_key,
            cursor_field: None,
            tenant_field: None,
            tenants: Vec::new(),
            cursor_floor: None,
            lookback: None,
            options: StringMap::new(),
        }
    }

    /// Create an incremental table spec
    pub fn incremental(
        name: impl Into<String>,
        mode: IngestionMode,
        primary_key: Vec<String>,
        cursor_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mode,
            primary_key,
            cursor_field: Some(cursor_field.into()),
            tenant_field: None,
            tenants: Vec::new(),
            cursor_floor: None,
            lookback: None,
            options: StringMap::new(),
        }
    }

    /// Scope this table across tenants
    #[must_use]
    pub fn with_tenants<I, S>(mut self, field: impl Into<String>, tenants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tenant_field = Some(field.into());
        self.tenants = tenants.into_iter().map(Into::into).collect();
        self
    }

    /// Set the lookback window
    #[must_use]
    pub fn with_lookback(mut self, lookback: u64) -> Self {
        self.lookback = Some(lookback);
        self
    }

    /// Set the resync floor
    #[must_use]
    pub fn with_floor(mut self, floor: impl Into<String>) -> Self {
        self.cursor_floor = Some(floor.into());
        self
    }

    /// Add a per-table option
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Check if this table is tenant-scoped
    pub fn is_tenant_scoped(&self) -> bool {
        !self.tenants.is_empty()
    }

    /// Validate this spec against a connection.
    ///
    /// Unknown option names are rejected rather than silently ignored, and
    /// incremental modes must declare a cursor field.
    pub fn validate(&self, connection: &Connection) -> Result<()> {
        for option in self.options.keys() {
            if !connection.allowed_options.contains(option) {
                return Err(Error::UnknownOption {
                    option: option.clone(),
                    table: self.name.clone(),
                });
            }
        }

        if self.primary_key.is_empty() {
            return Err(Error::config(format!(
                "table '{}' declares no primary key",
                self.name
            )));
        }

        if self.mode.is_incremental() && self.cursor_field.is_none() {
            return Err(Error::config(format!(
                "table '{}' uses mode {:?} but declares no cursor field",
                self.name, self.mode
            )));
        }

        if self.is_tenant_scoped() && self.tenant_field.is_none() {
            return Err(Error::config(format!(
                "table '{}' declares tenants but no tenant field",
                self.name
            )));
        }

        Ok(())
    }
}
