//! Source plugin boundary
//!
//! Every vendor-specific connector implements the `Source` capability set;
//! the engine is written exclusively against this trait. Adding a vendor
//! means registering a new implementation, never modifying the engine.

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::pagination::{PageRequest, PaginationMode, RawPage};
use crate::schema::FieldDescriptor;
use crate::types::JsonValue;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Capability set a vendor connector provides to the engine.
///
/// The required methods cover listing, schema and paginated reads; detail
/// fan-out and delete tracking are optional capabilities gated by the
/// `supports_*` methods.
#[async_trait]
pub trait Source: Send + Sync {
    /// Registered name of this source (e.g. "stripe")
    fn name(&self) -> &str;

    /// List the tables this source supports
    async fn list_tables(&self, client: &ApiClient) -> Result<Vec<String>>;

    /// Fetch typed field descriptors for a table
    async fn table_schema(
        &self,
        client: &ApiClient,
        table: &str,
    ) -> Result<Vec<FieldDescriptor>>;

    /// Which pagination protocol the table's list call speaks
    fn pagination(&self, table: &str) -> PaginationMode;

    /// Perform one list call.
    ///
    /// The request carries the resume cursor, tenant scope and continuation
    /// position; the source translates them into its own wire parameters.
    /// A stored cursor the remote rejects as too old must surface as
    /// `Error::CursorExpired`, distinct from ordinary request failures.
    async fn fetch_page(
        &self,
        client: &ApiClient,
        table: &str,
        request: &PageRequest,
    ) -> Result<RawPage>;

    /// Whether list calls for this table return id stubs that need a
    /// separate detail request per record
    fn supports_detail(&self, _table: &str) -> bool {
        false
    }

    /// Field of the id stub that carries the detail id
    fn detail_id_field(&self, _table: &str) -> &str {
        "id"
    }

    /// Fetch the full record for one id stub
    async fn fetch_detail(
        &self,
        _client: &ApiClient,
        table: &str,
        _id: &str,
    ) -> Result<JsonValue> {
        Err(Error::unsupported("detail fetch", table))
    }

    /// Whether the table's source exposes a delete-history mechanism
    fn supports_deletes(&self, _table: &str) -> bool {
        false
    }

    /// Perform one delete-history list call.
    ///
    /// Consumes the same cursor space as `fetch_page`; records need only
    /// the primary-key fields and cursor field populated.
    async fn fetch_deletes_page(
        &self,
        _client: &ApiClient,
        table: &str,
        _request: &PageRequest,
    ) -> Result<RawPage> {
        Err(Error::unsupported("delete tracking", table))
    }
}

/// Validate that a source supports a table before any data request
pub async fn ensure_table(source: &dyn Source, client: &ApiClient, table: &str) -> Result<()> {
    let tables = source.list_tables(client).await?;
    if tables.iter().any(|t| t == table) {
        Ok(())
    } else {
        Err(Error::TableNotFound {
            table: table.to_string(),
            source_name: source.name().to_string(),
        })
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Tagged registration of sources by name
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its declared name.
    ///
    /// Re-registering a name replaces the previous implementation.
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.name().to_string(), source);
    }

    /// Look up a source by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Source>> {
        self.sources.get(name).map(Arc::clone)
    }

    /// Names of all registered sources, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;
