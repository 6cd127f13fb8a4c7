//! Schema metadata and caching
//!
//! Sources with dynamic schemas expose typed field descriptors; the cache
//! fetches them once per table, validates requested fields before any data
//! request is made, and types raw values that arrive as strings.

mod types;

pub use types::{FieldDescriptor, FieldType, TableSchema};

use crate::client::ApiClient;
use crate::error::Result;
use crate::source::Source;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Caches per-table schemas for one source
#[derive(Debug, Default)]
pub struct SchemaCache {
    cached: RwLock<HashMap<String, Arc<TableSchema>>>,
}

impl SchemaCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the schema for a table, fetching from the source on first use
    pub async fn get(
        &self,
        source: &dyn Source,
        client: &ApiClient,
        table: &str,
    ) -> Result<Arc<TableSchema>> {
        {
            let cached = self.cached.read().await;
            if let Some(schema) = cached.get(table) {
                return Ok(Arc::clone(schema));
            }
        }

        debug!(table, "fetching schema from source");
        let fields = source.table_schema(client, table).await?;
        let schema = Arc::new(TableSchema::new(table, fields));

        let mut cached = self.cached.write().await;
        let entry = cached
            .entry(table.to_string())
            .or_insert_with(|| Arc::clone(&schema));
        Ok(Arc::clone(entry))
    }

    /// Drop a cached schema, forcing a refetch on next use
    pub async fn evict(&self, table: &str) {
        let mut cached = self.cached.write().await;
        cached.remove(table);
    }
}

#[cfg(test)]
mod tests;
