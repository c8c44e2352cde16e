//! Error taxonomy for fetch operations.

use serde::{Deserialize, Serialize};

/// Errors produced by page fetches.
///
/// Stale responses (session mismatch) are deliberately *not* represented
/// here: they are a normal consequence of superseded queries, handled by
/// discarding the response with a debug log, and never surface to callers.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The backend could not be reached, or the transport failed mid-flight.
    #[error("network error: {0}")]
    Network(String),

    /// The backend was reachable but returned an application-level error
    /// envelope.
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// The fetch was cancelled by a superseding reset or a dispose. Never
    /// user-visible.
    #[error("fetch cancelled")]
    Cancelled,
}

impl SyncError {
    /// Coarse classification used by presentation-facing error callbacks.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Network(_) => ErrorKind::Network,
            SyncError::Backend { .. } => ErrorKind::Backend,
            SyncError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Coarse error classification for `on_error` callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Backend,
    Cancelled,
}
