//! Pagination strategies
//!
//! Abstracts offset-based vs. token-based paging behind one trait. A page
//! request is explicit data, not an implicit generator position, so a fetch
//! can be cancelled and restarted from the same resume point.

mod strategies;
mod types;

pub use strategies::{OffsetPaginator, TokenPaginator};
pub use types::{Continuation, PageRequest, PaginationMode, Paginator, RawPage};
