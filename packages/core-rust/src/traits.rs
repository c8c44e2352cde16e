use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::cursor::Cursor;
use crate::error::SyncError;
use crate::query::QuerySpec;
use crate::session::Session;

/// One fetched page in engine form, after adapter decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage<T> {
    /// Decoded records in result order.
    pub records: Vec<T>,
    /// Latest server-reported total, if the endpoint provides one.
    pub total: Option<u64>,
    /// Server-reported continuation flag, if the endpoint provides one.
    pub has_more: Option<bool>,
    /// Continuation token for the next fetch (token pagination only).
    pub next_cursor: Option<String>,
}

/// Backend page source.
///
/// Implementations decode wire payloads into records of type `T`. They own
/// any network timeout; the engine treats a timeout like any other failure
/// and imposes none of its own.
///
/// Cancellation contract: once `cancel` fires, the implementation must
/// return [`SyncError::Cancelled`] promptly and must not touch engine state
/// afterwards.
///
/// Used as `Arc<dyn PageFetcher<T>>`.
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    /// Fetches the page at `cursor` for `spec`, stamped with `session`.
    async fn fetch_page(
        &self,
        spec: &QuerySpec,
        cursor: &Cursor,
        session: Session,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage<T>, SyncError>;
}
