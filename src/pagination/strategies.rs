//! Pagination strategy implementations

use super::types::{Continuation, PageRequest, Paginator, RawPage};
use tracing::warn;

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset-based pagination.
///
/// The request carries `(offset, limit)`; the server echoes no continuation
/// token, so exhaustion is inferred when a page returns fewer rows than the
/// requested limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetPaginator;

impl Paginator for OffsetPaginator {
    fn next_request(&self, prev: &PageRequest, page: &RawPage) -> Continuation {
        if page.len() < prev.page_size as usize {
            return Continuation::Done;
        }

        let mut next = prev.clone();
        next.offset = prev.offset + u64::from(prev.page_size);
        Continuation::Next(next)
    }
}

// ============================================================================
// Token Pagination
// ============================================================================

/// Token-based pagination.
///
/// The request carries an opaque `page_token` (absent on the first call);
/// pagination is exhausted when the server omits the next-token field.
///
/// A server echoing the token it was just given would loop forever, so an
/// echoed token is treated as terminal even though well-behaved servers
/// never do this.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenPaginator;

impl Paginator for TokenPaginator {
    fn next_request(&self, prev: &PageRequest, page: &RawPage) -> Continuation {
        let Some(next_token) = page.next_page_token.as_ref() else {
            return Continuation::Done;
        };

        if prev.page_token.as_deref() == Some(next_token.as_str()) {
            warn!(token = %next_token, "server echoed the submitted page token; stopping");
            return Continuation::Done;
        }

        let mut next = prev.clone();
        next.page_token = Some(next_token.clone());
        next.offset = prev.offset + page.len() as u64;
        Continuation::Next(next)
    }
}
