//! Tenant fan-out
//!
//! Tenant-scoped tables (report properties, workspaces, organizations) run
//! the full fetch pipeline once per configured tenant. Every record is
//! tagged with its tenant id, primary keys are tenant-prefixed so they stay
//! unique across the whole logical table, and each tenant keeps an
//! independent cursor. One tenant's failure never blocks or rolls back the
//! others: failures are collected and surfaced alongside the successful
//! tenants' output.

use crate::client::ApiClient;
use crate::config::TableSpec;
use crate::deletes::DeleteTracker;
use crate::error::{Error, Result};
use crate::fetch::PaginatedFetcher;
use crate::schema::TableSchema;
use crate::source::Source;
use crate::state::{cursor_max, SyncState};
use crate::types::{field_as_string, JsonValue, Record, Tombstone};
use futures::TryStreamExt;
use std::sync::Arc;
use tracing::{info, warn};

/// Output of one tenant's pipeline run
#[derive(Debug, Default)]
pub struct TenantRun {
    /// Tenant this run covered, if the table is tenant-scoped
    pub tenant: Option<String>,
    /// Records fetched, tagged and keyed for this tenant
    pub records: Vec<Record>,
    /// Deletions observed for this tenant
    pub tombstones: Vec<Tombstone>,
    /// Highest cursor value observed, to commit after a durable write
    pub new_cursor: Option<String>,
    /// Pages fetched
    pub pages: u64,
    /// The stored cursor was rejected and the run restarted from the floor
    pub resynced: bool,
    /// The delete history expired; removals cannot be reconciled
    /// incrementally and only a full resync closes the gap
    pub delete_gap: bool,
}

/// Runs the fetch pipeline across a table's tenant scopes
#[derive(Debug, Clone)]
pub struct TenantFanoutCoordinator {
    fetcher: PaginatedFetcher,
    deletes: DeleteTracker,
}

impl TenantFanoutCoordinator {
    /// Create a coordinator over the given fetcher and delete tracker
    pub fn new(fetcher: PaginatedFetcher, deletes: DeleteTracker) -> Self {
        Self { fetcher, deletes }
    }

    /// Run the pipeline for every tenant scope of a table.
    ///
    /// Returns the per-tenant outputs and, separately, the failures of the
    /// tenants that did not complete. A failed tenant contributes nothing
    /// to the outputs; its committed cursor stays untouched.
    pub async fn run(
        &self,
        source: &Arc<dyn Source>,
        client: &ApiClient,
        spec: &TableSpec,
        schema: &TableSchema,
        state: &SyncState,
    ) -> (Vec<TenantRun>, Vec<Error>) {
        let mut runs = Vec::new();
        let mut failures = Vec::new();

        for tenant in scopes(spec) {
            match self
                .run_tenant(source, client, spec, schema, state, tenant.as_deref())
                .await
            {
                Ok(run) => runs.push(run),
                Err(e) => {
                    let scope = tenant.as_deref().unwrap_or("<unscoped>");
                    warn!(table = %spec.name, tenant = scope, error = %e, "tenant sync failed");
                    failures.push(e.for_tenant(scope, &spec.name));
                }
            }
        }

        (runs, failures)
    }

    /// Run the fetch and delete passes for one tenant scope
    async fn run_tenant(
        &self,
        source: &Arc<dyn Source>,
        client: &ApiClient,
        spec: &TableSpec,
        schema: &TableSchema,
        state: &SyncState,
        tenant: Option<&str>,
    ) -> Result<TenantRun> {
        let resume = state.resume_point(spec, tenant);
        let mut run = match self
            .fetch_tenant(source, client, spec, schema, tenant, resume)
            .await
        {
            Ok(run) => run,
            Err(Error::CursorExpired { cursor, .. }) => {
                // The stored cursor is older than the remote retains.
                // Restart from the configured floor and flag the resync;
                // the discarded cursor becomes the new floor on commit.
                info!(
                    table = %spec.name,
                    cursor,
                    "stored cursor rejected by source, resyncing from the floor"
                );
                let mut run = self
                    .fetch_tenant(source, client, spec, schema, tenant, spec.cursor_floor.clone())
                    .await?;
                run.resynced = true;
                run
            }
            Err(e) => return Err(e),
        };

        if spec.mode.tracks_deletes() && source.supports_deletes(&spec.name) {
            if run.resynced {
                // The old cursor was already too old for the main fetch, so
                // the matching delete history is gone with it; removals in
                // the gap cannot be reconciled incrementally.
                run.delete_gap = true;
            } else {
                match self
                    .collect_deletes(source, client, spec, tenant, state.resume_point(spec, tenant))
                    .await
                {
                    Ok(tombstones) => run.tombstones = tombstones,
                    Err(Error::CursorExpired { .. }) => {
                        warn!(
                            table = %spec.name,
                            "delete history expired, removals need a full resync"
                        );
                        run.delete_gap = true;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(run)
    }

    async fn fetch_tenant(
        &self,
        source: &Arc<dyn Source>,
        client: &ApiClient,
        spec: &TableSpec,
        schema: &TableSchema,
        tenant: Option<&str>,
        resume: Option<String>,
    ) -> Result<TenantRun> {
        let mut run = TenantRun {
            tenant: tenant.map(ToString::to_string),
            ..TenantRun::default()
        };

        let mut pages = self.fetcher.fetch(
            Arc::clone(source),
            client.clone(),
            &spec.name,
            resume,
            tenant.map(ToString::to_string),
        );

        while let Some(page) = pages.try_next().await? {
            run.pages += 1;
            for raw in page.records {
                let record = build_record(raw, spec, schema, tenant)?;
                if let Some(cursor) = &record.cursor {
                    run.new_cursor = Some(match run.new_cursor.take() {
                        Some(current) => cursor_max(current, cursor),
                        None => cursor.clone(),
                    });
                }
                run.records.push(record);
            }
        }

        Ok(run)
    }

    async fn collect_deletes(
        &self,
        source: &Arc<dyn Source>,
        client: &ApiClient,
        spec: &TableSpec,
        tenant: Option<&str>,
        resume: Option<String>,
    ) -> Result<Vec<Tombstone>> {
        let tombstones: Vec<Tombstone> = self
            .deletes
            .stream_deletes(
                Arc::clone(source),
                client.clone(),
                spec,
                resume,
                tenant.map(ToString::to_string),
            )
            .try_collect()
            .await?;

        Ok(tombstones
            .into_iter()
            .map(|t| prefix_tenant_key(t, tenant))
            .collect())
    }
}

/// The tenant scopes a table spans; a single unscoped run otherwise
pub fn scopes(spec: &TableSpec) -> Vec<Option<String>> {
    if spec.is_tenant_scoped() {
        spec.tenants.iter().cloned().map(Some).collect()
    } else {
        vec![None]
    }
}

/// Coerce, tag and key one raw record for a tenant scope.
///
/// The key tuple is the tenant id (when scoped) followed by the spec's
/// primary-key field values; a record missing a key field is an error, not
/// a silent skip.
pub fn build_record(
    raw: JsonValue,
    spec: &TableSpec,
    schema: &TableSchema,
    tenant: Option<&str>,
) -> Result<Record> {
    let mut data = schema.coerce(raw);

    if let (Some(tenant), Some(field)) = (tenant, spec.tenant_field.as_deref()) {
        if let Some(map) = data.as_object_mut() {
            map.insert(field.to_string(), JsonValue::String(tenant.to_string()));
        }
    }

    let mut key = Vec::with_capacity(spec.primary_key.len() + 1);
    if let Some(tenant) = tenant {
        key.push(tenant.to_string());
    }
    for field in &spec.primary_key {
        key.push(field_as_string(&data, field).ok_or_else(|| {
            Error::schema(&spec.name, format!("record is missing key field '{field}'"))
        })?);
    }

    let cursor = spec
        .cursor_field
        .as_deref()
        .and_then(|field| field_as_string(&data, field));

    Ok(Record::new(key, cursor, data))
}

/// Prefix the tenant id onto a tombstone's key tuple
fn prefix_tenant_key(mut tombstone: Tombstone, tenant: Option<&str>) -> Tombstone {
    if let Some(tenant) = tenant {
        tombstone.key.insert(0, tenant.to_string());
    }
    tombstone
}

#[cfg(test)]
mod tests;
