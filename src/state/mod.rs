//! Cursor store and ingestion-mode selection
//!
//! Decides whether a run is a snapshot or resumes from a cursor, computes
//! lookback-adjusted resume points, and advances cursors only after the
//! caller confirms a durable write.

mod types;

pub use types::{CursorEntry, SyncState, TableState};

use crate::config::TableSpec;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

/// Tenant key used for unscoped tables
const UNSCOPED: &str = "";

impl SyncState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the committed entry for a (table, tenant) pair
    pub fn entry(&self, table: &str, tenant: Option<&str>) -> Option<&CursorEntry> {
        self.tables
            .get(table)?
            .tenants
            .get(tenant.unwrap_or(UNSCOPED))
    }

    /// Get the committed cursor for a (table, tenant) pair
    pub fn cursor(&self, table: &str, tenant: Option<&str>) -> Option<&str> {
        self.entry(table, tenant).map(|e| e.last_cursor.as_str())
    }

    /// Advance the committed cursor after a durable write.
    ///
    /// Cursors are monotonically non-decreasing: an advance below the
    /// committed value is ignored. Returns the effective committed cursor.
    pub fn advance(&mut self, table: &str, tenant: Option<&str>, cursor: &str) -> String {
        let entry = self
            .tables
            .entry(table.to_string())
            .or_default()
            .tenants
            .entry(tenant.unwrap_or(UNSCOPED).to_string());

        match entry {
            std::collections::hash_map::Entry::Occupied(mut occupied) => {
                let current = occupied.get_mut();
                if cursor_cmp(cursor, &current.last_cursor) == std::cmp::Ordering::Less {
                    debug!(
                        table,
                        cursor,
                        committed = %current.last_cursor,
                        "ignoring cursor advance below the committed value"
                    );
                } else {
                    current.last_cursor = cursor.to_string();
                }
                current.last_synced_at = Utc::now();
                current.last_cursor.clone()
            }
            std::collections::hash_map::Entry::Vacant(vacant) => {
                vacant.insert(CursorEntry {
                    last_cursor: cursor.to_string(),
                    last_synced_at: Utc::now(),
                    floor: None,
                });
                cursor.to_string()
            }
        }
    }

    /// Discard a stored cursor after the remote rejected it.
    ///
    /// The discarded value is returned and becomes the entry's floor once
    /// the resync commits, so later lookbacks never reach below it.
    pub fn reset(&mut self, table: &str, tenant: Option<&str>) -> Option<String> {
        let entry = self
            .tables
            .get_mut(table)?
            .tenants
            .remove(tenant.unwrap_or(UNSCOPED))?;
        Some(entry.last_cursor)
    }

    /// Set the resume floor for a (table, tenant) pair
    pub fn set_floor(&mut self, table: &str, tenant: Option<&str>, floor: &str) {
        if let Some(entry) = self
            .tables
            .get_mut(table)
            .and_then(|t| t.tenants.get_mut(tenant.unwrap_or(UNSCOPED)))
        {
            entry.floor = Some(floor.to_string());
        }
    }

    /// Compute the resume point for a run of `spec` in the given tenant.
    ///
    /// Snapshot tables never resume. Incremental tables resume from
    /// `max(last_cursor - lookback, floor)` where the floor is the higher
    /// of the spec's configured floor and the entry's resync floor; the
    /// lookback re-fetches the most recent window because upstream data may
    /// still be settling there. A table with no committed cursor starts
    /// from the spec's floor.
    pub fn resume_point(&self, spec: &TableSpec, tenant: Option<&str>) -> Option<String> {
        if !spec.mode.is_incremental() {
            return None;
        }

        let Some(entry) = self.entry(&spec.name, tenant) else {
            return spec.cursor_floor.clone();
        };

        let mut resume = match spec.lookback {
            Some(units) => subtract_lookback(&entry.last_cursor, units),
            None => entry.last_cursor.clone(),
        };

        for floor in [entry.floor.as_deref(), spec.cursor_floor.as_deref()]
            .into_iter()
            .flatten()
        {
            if cursor_cmp(&resume, floor) == std::cmp::Ordering::Less {
                resume = floor.to_string();
            }
        }

        Some(resume)
    }
}

// ============================================================================
// Cursor arithmetic
// ============================================================================

/// Subtract a lookback window from a cursor value.
///
/// The cursor kind is sniffed per value: integers subtract directly,
/// RFC 3339 timestamps subtract seconds, calendar dates subtract days.
/// Opaque cursors have no meaningful arithmetic and are returned unchanged.
pub fn subtract_lookback(cursor: &str, units: u64) -> String {
    if let Ok(n) = cursor.parse::<i64>() {
        return n.saturating_sub(units as i64).max(0).to_string();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(cursor) {
        return (ts - chrono::Duration::seconds(units as i64)).to_rfc3339();
    }
    if let Ok(date) = NaiveDate::parse_from_str(cursor, "%Y-%m-%d") {
        return (date - chrono::Duration::days(units as i64))
            .format("%Y-%m-%d")
            .to_string();
    }
    cursor.to_string()
}

/// Compare two cursor values.
///
/// Both-numeric cursors compare numerically; everything else compares
/// lexicographically, which is correct for RFC 3339 timestamps and
/// ISO dates.
pub fn cursor_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// The larger of two cursor values
pub fn cursor_max(a: String, b: &str) -> String {
    if cursor_cmp(&a, b) == std::cmp::Ordering::Less {
        b.to_string()
    } else {
        a
    }
}

#[cfg(test)]
mod tests;
