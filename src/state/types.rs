//! Sync state types
//!
//! Serialized and persisted by the caller between runs; the engine only
//! reads entries and advances them after the caller confirms a durable
//! write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Committed progress for one (table, tenant) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorEntry {
    /// Last committed cursor value
    pub last_cursor: String,

    /// When the last batch was committed
    pub last_synced_at: DateTime<Utc>,

    /// Lower bound below which resume points never drop.
    ///
    /// Set when a cursor is invalidated and resynced, so the lookback
    /// window cannot reach back past the point already covered by the
    /// resync.
    #[serde(default)]
    pub floor: Option<String>,
}

/// State for one table, keyed by tenant (empty key for unscoped tables)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableState {
    /// Per-tenant cursor entries
    #[serde(default)]
    pub tenants: HashMap<String, CursorEntry>,
}

/// All committed sync progress, keyed by table.
///
/// Owned by the caller's persistence layer; the engine treats it as a
/// borrowed value with read and advance operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    /// Per-table state
    #[serde(default)]
    pub tables: HashMap<String, TableState>,
}
