//! Incremental, paginated feed of catalog records.
//!
//! A feed is the ordered list produced by fetching pages `1, 2, 3, …` of one
//! [`QueryContext`] until an empty page arrives:
//!
//! - [`record_set`] - ordered, id-deduplicated storage with append-only merge
//! - [`query`] - the browse mode (catalog, genre filter, search)
//! - [`controller`] - the Idle/Loading/Error/Exhausted state machine
//! - [`scroll`] - near-bottom detection that asks the controller for more
//! - [`fetcher`] - the page source contract and its error taxonomy
//!
//! # Example
//!
//! ```ignore
//! use novella::feed::{FeedController, QueryContext};
//!
//! let mut feed = FeedController::new();
//! if let Some(request) = feed.set_query_context(QueryContext::Catalog) {
//!     feed.fulfil(&client, request).await;
//! }
//! ```

pub mod controller;
pub mod fetcher;
pub mod query;
pub mod record_set;
pub mod scroll;

pub use controller::{Completion, FeedController, FeedState, FeedStatus, FeedView, FetchRequest};
pub use fetcher::{ErrorKind, FetchError, PageFetcher};
pub use query::QueryContext;
pub use record_set::{Record, RecordSet};
pub use scroll::{ScrollTrigger, ViewportMetrics, DEFAULT_THRESHOLD};
