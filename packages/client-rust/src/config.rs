//! Engine configuration for one list view.

use std::time::Duration;

use pagesync_core::PaginationMode;

/// Configuration handed to a `FetchCoordinator` at construction.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Pagination style of the backend endpoint.
    pub pagination: PaginationMode,
    /// Fixed interval between status polls while any visible record is in a
    /// transient processing state.
    pub poll_interval: Duration,
    /// Bounded channel capacity for scroll-trigger signals. Burst firings
    /// beyond this are coalesced.
    pub scroll_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pagination: PaginationMode::Offset,
            poll_interval: Duration::from_secs(15),
            scroll_channel_capacity: 8,
        }
    }
}
