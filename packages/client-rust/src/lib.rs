//! `PageSync` Client — paginated list synchronization over a REST backend.
//!
//! One [`FetchCoordinator`] per mounted list view fetches ordered result
//! pages (offset or opaque-cursor pagination), merges them into a
//! de-duplicated append-only [`store::RecordStore`], polls while any visible
//! record is in a transient processing state, and fences superseded
//! responses so overlapping async operations never produce glitches.

pub mod config;
pub mod coordinator;
pub mod events;
pub mod http;
pub mod registry;
pub mod scroll;
pub mod store;
pub mod watcher;

pub use config::SyncConfig;
pub use coordinator::{FetchCoordinator, TransientFn};
pub use events::{CompositeEventSink, ListEventSink, NullEventSink};
pub use http::HttpPageFetcher;
pub use registry::{ListLifecycle, ViewRegistry};
pub use scroll::ScrollTrigger;
pub use store::{HasMorePolicy, KeyFn, ListSnapshot, RecordStore};
pub use watcher::{Pollable, StatusWatcher};
