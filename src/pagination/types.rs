//! Pagination types and traits

use crate::types::JsonValue;

/// Which pagination protocol a table's list call speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationMode {
    /// Request carries (offset, limit); exhaustion inferred from row count
    #[default]
    Offset,
    /// Request carries an opaque page token echoed by the server
    Token,
}

impl PaginationMode {
    /// Build the paginator for this mode
    pub fn paginator(self) -> Box<dyn Paginator> {
        match self {
            PaginationMode::Offset => Box::new(super::OffsetPaginator),
            PaginationMode::Token => Box::new(super::TokenPaginator),
        }
    }
}

/// Parameters for one list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based row offset (offset paging)
    pub offset: u64,
    /// Opaque continuation token (token paging; absent on the first call)
    pub page_token: Option<String>,
    /// Requested page size
    pub page_size: u32,
    /// Resume point for incremental tables, passed through to the source
    pub cursor: Option<String>,
    /// Tenant scope for this request, if any
    pub tenant: Option<String>,
}

impl PageRequest {
    /// Build the first request of a fetch
    pub fn first(cursor: Option<String>, tenant: Option<String>, page_size: u32) -> Self {
        Self {
            offset: 0,
            page_token: None,
            page_size,
            cursor,
            tenant,
        }
    }
}

/// One fetched unit from a source's list call
#[derive(Debug, Clone, Default)]
pub struct RawPage {
    /// Ordered raw records (or id stubs, for detail-fetch tables)
    pub records: Vec<JsonValue>,
    /// Continuation token echoed by the server, if any
    pub next_page_token: Option<String>,
}

impl RawPage {
    /// Create a page of records with no continuation
    pub fn of(records: Vec<JsonValue>) -> Self {
        Self {
            records,
            next_page_token: None,
        }
    }

    /// Attach a continuation token
    #[must_use]
    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_page_token = Some(token.into());
        self
    }

    /// Row count of this page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the page is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Result of the next-page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// More pages available
    Next(PageRequest),
    /// Pagination is exhausted
    Done,
}

impl Continuation {
    /// Check if pagination is exhausted
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Compute the follow-up request after a page, or `Done` on exhaustion
    fn next_request(&self, prev: &PageRequest, page: &RawPage) -> Continuation;
}
