// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Syncline
//!
//! An incremental sync engine for rate-limited, paginated, OAuth-protected
//! REST APIs. The engine owns the mechanics every connector otherwise
//! reimplements; a vendor plugs in by implementing the `Source` trait.
//!
//! ## Features
//!
//! - **Token lifecycle**: proactive refresh with a safety margin, single
//!   flight under concurrency
//! - **Pagination**: offset/limit and opaque-token protocols with loop
//!   protection
//! - **Pacing**: token-bucket rate limiting per tenant scope, Retry-After
//!   aware exponential backoff
//! - **Incremental state**: per-(table, tenant) cursors, lookback windows,
//!   expired-cursor resync with an explicit signal
//! - **Deletes**: tombstone streams over the source's history mechanism
//! - **Multi-tenant**: fan-out with tenant-prefixed keys and isolated
//!   failures
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use syncline::{Connection, Credentials, SyncEngine, SyncState, TableSpec};
//! use syncline::types::IngestionMode;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> syncline::Result<()> {
//!     let connection = Connection::new("https://api.example.com", Credentials::StaticBearer {
//!         token: "...".into(),
//!     });
//!     let engine = SyncEngine::new(connection, Arc::new(MySource));
//!
//!     let spec = TableSpec::incremental(
//!         "events", IngestionMode::Append, vec!["id".into()], "updated_at",
//!     );
//!     let mut state = SyncState::new();
//!
//!     let outcome = engine.sync(&spec, &state).await?;
//!     // ... write outcome.records and outcome.tombstones durably ...
//!     outcome.apply_to(&mut state);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          SyncEngine                             │
//! │  sync(spec, state) → SyncOutcome { records, tombstones,         │
//! │                                    cursors, stats }             │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   Auth   │  Client   │     Fetch     │  Tenant   │   State     │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Refresh  │ Rate limit│ Offset pages  │ Fan-out   │ Cursors     │
//! │ Margin   │ Backoff   │ Token pages   │ Key prefix│ Lookback    │
//! │ 1-flight │ Retry-Aft.│ Detail fanout │ Isolation │ Resync floor│
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error taxonomy
pub mod error;

/// Common types and type aliases
pub mod types;

/// Connection and table configuration
pub mod config;

/// Access-token lifecycle
pub mod auth;

/// Pagination strategies
pub mod pagination;

/// Rate limiting and retry pacing
pub mod limit;

/// Per-connection HTTP gateway
pub mod client;

/// Schema metadata and caching
pub mod schema;

/// Cursor state and resume points
pub mod state;

/// Lazy page fetching
pub mod fetch;

/// Delete reconciliation
pub mod deletes;

/// Tenant fan-out
pub mod tenant;

/// Source plugin boundary
pub mod source;

/// Sync orchestration
pub mod engine;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::ApiClient;
pub use config::{Connection, Credentials, TableSpec};
pub use engine::{BatchStream, CursorUpdate, SyncBatch, SyncEngine, SyncOutcome, SyncStats};
pub use error::{Error, Result};
pub use source::{Source, SourceRegistry};
pub use state::SyncState;
pub use types::{IngestionMode, Record, Tombstone};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
