//! Delete reconciliation
//!
//! `DeleteTracker` walks a source's delete-history mechanism and yields
//! tombstones over the same cursor space as the main fetch. A tombstone
//! carries only the primary-key tuple and the cursor at which the deletion
//! was observed; historical field values are never fabricated. When the
//! remote's history window has expired the `CursorExpired` error surfaces
//! through the stream so the caller learns that a full resync is the only
//! way to reconcile removals.

use crate::client::ApiClient;
use crate::config::TableSpec;
use crate::error::{Error, Result};
use crate::pagination::{Continuation, PageRequest, Paginator};
use crate::source::Source;
use crate::types::{field_as_string, JsonValue, Tombstone};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::debug;

/// A finite stream of tombstones
pub type TombstoneStream = BoxStream<'static, Result<Tombstone>>;

/// Drives the delete-history walk for one (table, tenant) pair
#[derive(Debug, Clone)]
pub struct DeleteTracker {
    page_size: u32,
}

struct DeleteState {
    source: Arc<dyn Source>,
    client: ApiClient,
    spec: TableSpec,
    paginator: Box<dyn Paginator>,
    pending: Option<PageRequest>,
}

impl DeleteTracker {
    /// Create a tracker with the given history page size
    pub fn new(page_size: u32) -> Self {
        Self { page_size }
    }

    /// Stream deletions observed since the resume point.
    ///
    /// The key tuple follows the spec's primary-key fields; tenant
    /// prefixing happens in the fan-out layer.
    pub fn stream_deletes(
        &self,
        source: Arc<dyn Source>,
        client: ApiClient,
        spec: &TableSpec,
        cursor: Option<String>,
        tenant: Option<String>,
    ) -> TombstoneStream {
        let paginator = source.pagination(&spec.name).paginator();
        let first = PageRequest::first(cursor, tenant, self.page_size);
        let state = DeleteState {
            source,
            client,
            spec: spec.clone(),
            paginator,
            pending: Some(first),
        };

        stream::try_unfold(state, |mut state| async move {
            let Some(request) = state.pending.take() else {
                return Ok::<_, Error>(None);
            };

            let page = state
                .source
                .fetch_deletes_page(&state.client, &state.spec.name, &request)
                .await?;
            debug!(table = %state.spec.name, rows = page.len(), "fetched delete-history page");

            match state.paginator.next_request(&request, &page) {
                Continuation::Next(next) => state.pending = Some(next),
                Continuation::Done => state.pending = None,
            }

            let tombstones = page
                .records
                .iter()
                .map(|record| tombstone_from(record, &state.spec))
                .collect::<Result<Vec<_>>>()?;
            Ok(Some((tombstones, state)))
        })
        .map_ok(|batch| stream::iter(batch.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }
}

/// Build a tombstone from one delete-history record
fn tombstone_from(record: &JsonValue, spec: &TableSpec) -> Result<Tombstone> {
    let key = spec
        .primary_key
        .iter()
        .map(|field| {
            field_as_string(record, field).ok_or_else(|| {
                Error::schema(
                    &spec.name,
                    format!("delete record is missing key field '{field}'"),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let cursor = spec
        .cursor_field
        .as_deref()
        .and_then(|field| field_as_string(record, field));

    Ok(Tombstone::new(key, cursor))
}
