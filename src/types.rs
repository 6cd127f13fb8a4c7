//! Common types used throughout syncline
//!
//! Shared type definitions, type aliases, and the record/tombstone
//! shapes the engine yields to the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

// ============================================================================
// Ingestion Mode
// ============================================================================

/// How a table is ingested across runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionMode {
    /// Every run replaces the full table; no cursor is read or written
    #[default]
    Snapshot,
    /// Incremental append with a cursor field
    Append,
    /// Capture incremental changes with a cursor field (no delete support)
    Cdc,
    /// Capture incremental changes with delete support
    CdcWithDeletes,
}

impl IngestionMode {
    /// Check if this mode tracks a cursor between runs
    pub fn is_incremental(self) -> bool {
        !matches!(self, IngestionMode::Snapshot)
    }

    /// Check if this mode surfaces tombstones
    pub fn tracks_deletes(self) -> bool {
        matches!(self, IngestionMode::CdcWithDeletes)
    }
}

// ============================================================================
// Records and Tombstones
// ============================================================================

/// One synced record: raw payload plus its resolved key and cursor value.
///
/// The key tuple is tenant-prefixed for tenant-scoped tables so that it is
/// unique across the whole logical table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Resolved primary-key tuple (tenant id first when tenant-scoped)
    pub key: Vec<String>,
    /// Resolved cursor value, if the table has a cursor field
    pub cursor: Option<String>,
    /// Raw key-value payload
    pub data: JsonValue,
}

impl Record {
    /// Create a record from a payload and its resolved key/cursor
    pub fn new(key: Vec<String>, cursor: Option<String>, data: JsonValue) -> Self {
        Self { key, cursor, data }
    }
}

/// Minimal record signaling an upstream deletion.
///
/// Carries only the primary-key tuple and cursor value; it never resurrects
/// or fabricates other field values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    /// Resolved primary-key tuple (tenant id first when tenant-scoped)
    pub key: Vec<String>,
    /// Cursor value at which the deletion was observed
    pub cursor: Option<String>,
}

impl Tombstone {
    /// Create a tombstone
    pub fn new(key: Vec<String>, cursor: Option<String>) -> Self {
        Self { key, cursor }
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extract a field from a JSON record as a string.
///
/// Numbers and booleans are stringified; missing or structured values
/// return None. Supports nested fields with dot notation.
pub fn field_as_string(record: &JsonValue, field: &str) -> Option<String> {
    let mut current = record;
    for part in field.split('.') {
        current = current.get(part)?;
    }
    match current {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
