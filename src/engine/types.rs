//! Sync outcome and statistics

use crate::error::Error;
use crate::state::SyncState;
use crate::types::{Record, Tombstone};
use std::time::Duration;

/// New committed cursor for one tenant scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorUpdate {
    /// Tenant this cursor belongs to, if the table is tenant-scoped
    pub tenant: Option<String>,
    /// Highest cursor value the run observed
    pub cursor: String,
    /// The run discarded the stored cursor and rebuilt from the floor
    pub resynced: bool,
}

/// Everything one sync run produced.
///
/// The engine never touches the state itself: the caller writes the
/// records and tombstones durably, then calls `apply_to` to commit the
/// cursors. A crash in between re-fetches the same window next run
/// (at-least-once).
#[derive(Debug)]
pub struct SyncOutcome {
    /// Table this run covered
    pub table: String,
    /// Fetched records across all tenant scopes, tagged and keyed
    pub records: Vec<Record>,
    /// Deletions observed across all tenant scopes
    pub tombstones: Vec<Tombstone>,
    /// Per-tenant cursor updates to commit after a durable write
    pub cursors: Vec<CursorUpdate>,
    /// Tenants whose delete history expired; their removals cannot be
    /// reconciled without a full resync
    pub delete_gaps: Vec<Option<String>>,
    /// Tenants that failed; their committed cursors are untouched
    pub failures: Vec<Error>,
    /// Run statistics
    pub stats: SyncStats,
}

impl SyncOutcome {
    /// Commit this run's cursors after the caller's durable write.
    ///
    /// A resynced tenant's old cursor is discarded and pinned as the
    /// entry's floor, so later lookbacks never reach below what was
    /// already delivered.
    pub fn apply_to(&self, state: &mut SyncState) {
        for update in &self.cursors {
            let tenant = update.tenant.as_deref();
            if update.resynced {
                let discarded = state.reset(&self.table, tenant);
                state.advance(&self.table, tenant, &update.cursor);
                if let Some(floor) = discarded {
                    state.set_floor(&self.table, tenant, &floor);
                }
            } else {
                state.advance(&self.table, tenant, &update.cursor);
            }
        }
    }

    /// Check if every tenant scope completed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One committable page of records from `SyncEngine::sync_batches`.
///
/// The caller writes the batch durably, then commits its cursor with
/// `apply_to` before pulling the next batch. A crash between the write
/// and the commit re-fetches this page's window next run.
#[derive(Debug)]
pub struct SyncBatch {
    /// Table this batch belongs to
    pub table: String,
    /// Tenant scope of this batch, if the table is tenant-scoped
    pub tenant: Option<String>,
    /// 1-based page number within the tenant's fetch
    pub page: u64,
    /// Records of this page, tagged and keyed
    pub records: Vec<Record>,
    /// Highest cursor value in this batch, if the table has a cursor field
    pub cursor: Option<String>,
}

impl SyncBatch {
    /// Commit this batch's cursor after the caller's durable write
    pub fn apply_to(&self, state: &mut SyncState) {
        if let Some(cursor) = &self.cursor {
            state.advance(&self.table, self.tenant.as_deref(), cursor);
        }
    }
}

/// Statistics for one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Pages fetched across all tenant scopes
    pub pages: u64,
    /// Records fetched
    pub records: u64,
    /// Tombstones observed
    pub tombstones: u64,
    /// Tenant scopes that completed
    pub tenants_synced: u64,
    /// Tenant scopes that failed
    pub tenants_failed: u64,
    /// Wall-clock duration of the run
    pub duration: Duration,
}
