//! Fetch-generation stamping for stale-response detection.
//!
//! Every fetch request carries the [`Session`] that issued it. When the
//! response arrives, the engine compares the stamped session against the
//! coordinator's current one; a mismatch means a newer query superseded the
//! request while it was in flight, and the response is silently discarded.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Monotonic generation stamp for one fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session(pub u64);

/// Strictly increasing session counter, incremented exactly once per reset.
///
/// Session 0 is the pre-reset state; the first `advance()` yields session 1.
#[derive(Debug, Default)]
pub struct SessionCounter {
    current: AtomicU64,
}

impl SessionCounter {
    /// Creates a counter at session 0.
    #[must_use]
    pub fn new() -> Self {
        Self { current: AtomicU64::new(0) }
    }

    /// Starts a new session and returns it.
    pub fn advance(&self) -> Session {
        Session(self.current.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// The session most recently returned by `advance`.
    #[must_use]
    pub fn current(&self) -> Session {
        Session(self.current.load(Ordering::Relaxed))
    }
}
