//! Sync orchestration
//!
//! `SyncEngine` ties the pipeline together for one connection and source:
//! option validation, table-existence and schema checks, tenant fan-out,
//! the delete pass, and the cursor-expired resync fallback. It reads the
//! caller's `SyncState` but never writes it; the caller commits cursors
//! with `SyncOutcome::apply_to` after its own durable write.

mod types;

pub use types::{CursorUpdate, SyncBatch, SyncOutcome, SyncStats};

use crate::client::ApiClient;
use crate::config::{Connection, TableSpec};
use crate::deletes::DeleteTracker;
use crate::error::{Error, Result};
use crate::fetch::PaginatedFetcher;
use crate::schema::{SchemaCache, TableSchema};
use crate::source::{ensure_table, Source};
use crate::state::{cursor_max, SyncState};
use crate::tenant::{build_record, scopes, TenantFanoutCoordinator};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// A stream of committable batches from `SyncEngine::sync_batches`
pub type BatchStream = BoxStream<'static, Result<SyncBatch>>;

const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_DETAIL_CONCURRENCY: usize = 5;

/// Orchestrates sync runs for one (connection, source) pair
pub struct SyncEngine {
    connection: Connection,
    client: ApiClient,
    source: Arc<dyn Source>,
    schemas: SchemaCache,
    page_size: u32,
    detail_concurrency: usize,
}

impl SyncEngine {
    /// Create an engine for a connection and source
    pub fn new(connection: Connection, source: Arc<dyn Source>) -> Self {
        let client = ApiClient::new(&connection);
        Self {
            connection,
            client,
            source,
            schemas: SchemaCache::new(),
            page_size: DEFAULT_PAGE_SIZE,
            detail_concurrency: DEFAULT_DETAIL_CONCURRENCY,
        }
    }

    /// Set the list page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the detail fan-out width for id-list tables
    #[must_use]
    pub fn with_detail_concurrency(mut self, concurrency: usize) -> Self {
        self.detail_concurrency = concurrency;
        self
    }

    /// The HTTP gateway this engine drives
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Run one sync of a table.
    ///
    /// The state is read for resume points only. On success the outcome
    /// holds everything the run produced; a tenant-scoped table with some
    /// failed tenants still returns `Ok` with the failures listed, while a
    /// run where no scope completed surfaces the first failure.
    pub async fn sync(&self, spec: &TableSpec, state: &SyncState) -> Result<SyncOutcome> {
        let started = Instant::now();
        let schema = self.prepare(spec).await?;

        info!(table = %spec.name, mode = ?spec.mode, "sync started");

        let coordinator = TenantFanoutCoordinator::new(
            PaginatedFetcher::new(self.page_size, self.detail_concurrency),
            DeleteTracker::new(self.page_size),
        );
        let (runs, failures) = coordinator
            .run(&self.source, &self.client, spec, &schema, state)
            .await;

        if runs.is_empty() && !failures.is_empty() {
            let first = failures
                .into_iter()
                .next()
                .expect("failures is non-empty");
            return Err(first);
        }

        let mut outcome = SyncOutcome {
            table: spec.name.clone(),
            records: Vec::new(),
            tombstones: Vec::new(),
            cursors: Vec::new(),
            delete_gaps: Vec::new(),
            failures,
            stats: SyncStats::default(),
        };

        for run in runs {
            outcome.stats.pages += run.pages;
            outcome.stats.tenants_synced += 1;
            if let Some(cursor) = run.new_cursor {
                outcome.cursors.push(CursorUpdate {
                    tenant: run.tenant.clone(),
                    cursor,
                    resynced: run.resynced,
                });
            }
            if run.delete_gap {
                outcome.delete_gaps.push(run.tenant.clone());
            }
            outcome.records.extend(run.records);
            outcome.tombstones.extend(run.tombstones);
        }

        outcome.stats.records = outcome.records.len() as u64;
        outcome.stats.tombstones = outcome.tombstones.len() as u64;
        outcome.stats.tenants_failed = outcome.failures.len() as u64;
        outcome.stats.duration = started.elapsed();

        info!(
            table = %spec.name,
            records = outcome.stats.records,
            tombstones = outcome.stats.tombstones,
            pages = outcome.stats.pages,
            tenants_failed = outcome.stats.tenants_failed,
            duration_ms = outcome.stats.duration.as_millis() as u64,
            "sync finished"
        );

        Ok(outcome)
    }

    /// Run one sync of a table, yielding each page as a committable batch.
    ///
    /// The page-granular counterpart to `sync`: the caller writes one
    /// batch durably and commits its cursor with `SyncBatch::apply_to`
    /// before the next page is fetched, so an abort at any point loses at
    /// most one uncommitted page (at-least-once). Tenant scopes are
    /// walked in order, each from its own resume point. This path has no
    /// automatic resync fallback and no delete pass: `CursorExpired`
    /// surfaces through the stream, and delete-tracking runs use `sync`.
    pub async fn sync_batches(&self, spec: &TableSpec, state: &SyncState) -> Result<BatchStream> {
        let schema = self.prepare(spec).await?;
        info!(table = %spec.name, mode = ?spec.mode, "batched sync started");

        let mut streams: Vec<BatchStream> = Vec::new();
        for tenant in scopes(spec) {
            let fetcher = PaginatedFetcher::new(self.page_size, self.detail_concurrency);
            let pages = fetcher.fetch(
                Arc::clone(&self.source),
                self.client.clone(),
                &spec.name,
                state.resume_point(spec, tenant.as_deref()),
                tenant.clone(),
            );

            let spec = spec.clone();
            let schema = Arc::clone(&schema);
            streams.push(
                pages
                    .map(move |page| {
                        let page = page?;
                        let mut batch = SyncBatch {
                            table: spec.name.clone(),
                            tenant: tenant.clone(),
                            page: page.number,
                            records: Vec::with_capacity(page.records.len()),
                            cursor: None,
                        };
                        for raw in page.records {
                            let record = build_record(raw, &spec, &schema, tenant.as_deref())?;
                            if let Some(cursor) = &record.cursor {
                                batch.cursor = Some(match batch.cursor.take() {
                                    Some(current) => cursor_max(current, cursor),
                                    None => cursor.clone(),
                                });
                            }
                            batch.records.push(record);
                        }
                        Ok(batch)
                    })
                    .boxed(),
            );
        }

        Ok(stream::iter(streams).flatten().boxed())
    }

    /// Validate a spec and fetch its schema before any data request
    async fn prepare(&self, spec: &TableSpec) -> Result<Arc<TableSchema>> {
        self.connection.validate()?;
        spec.validate(&self.connection)?;
        ensure_table(self.source.as_ref(), &self.client, &spec.name).await?;

        if spec.mode.tracks_deletes() && !self.source.supports_deletes(&spec.name) {
            return Err(Error::unsupported("delete tracking", &spec.name));
        }

        let schema = self
            .schemas
            .get(self.source.as_ref(), &self.client, &spec.name)
            .await?;
        schema.validate(
            spec.primary_key
                .iter()
                .map(String::as_str)
                .chain(spec.cursor_field.as_deref()),
        )?;

        Ok(schema)
    }

    /// List the tables the source supports
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        self.source.list_tables(&self.client).await
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("source", &self.source.name())
            .field("base_url", &self.connection.base_url)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}
