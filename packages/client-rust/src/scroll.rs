//! Scroll-trigger adapter.
//!
//! The presentation layer supplies a visibility signal (intersection
//! observer, scroll-position check, or a test harness); the engine's only
//! contract with it is "call `load_more` when it fires". Signals are
//! forwarded through a bounded channel drained by a background task, and
//! the coordinator's single-flight guard makes duplicate or burst firings
//! harmless regardless of how the signal is produced.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::coordinator::FetchCoordinator;

/// Cheap cloneable handle fired when the list's sentinel row becomes
/// visible.
#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    tx: mpsc::Sender<()>,
}

impl ScrollTrigger {
    /// Binds a trigger to a coordinator, spawning the forwarding task.
    ///
    /// The task holds only a weak reference: dropping the coordinator (or
    /// disposing it) ends forwarding.
    pub fn bind<T: Clone + Send + Sync + 'static>(
        coordinator: &Arc<FetchCoordinator<T>>,
        capacity: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<()>(capacity);
        let weak = Arc::downgrade(coordinator);

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                let Some(coordinator) = weak.upgrade() else { break };
                if coordinator.is_disposed() {
                    break;
                }
                // Failures already surfaced via on_error; nothing to do here.
                let _ = coordinator.load_more().await;
            }
            debug!("scroll forwarder stopped");
        });

        Self { tx }
    }

    /// Signals that the sentinel row became visible.
    ///
    /// Burst firings beyond the channel capacity are coalesced: a full
    /// channel means loads are already pending, so the signal is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the forwarding task has stopped (the bound
    /// coordinator was disposed or dropped).
    pub fn fire(&self) -> anyhow::Result<()> {
        match self.tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(())) => {
                Err(anyhow::anyhow!("scroll forwarder stopped"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use pagesync_core::{
        Cursor, FetchedPage, PageFetcher, QuerySpec, Session, SyncError,
    };
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::config::SyncConfig;
    use crate::coordinator::TransientFn;
    use crate::events::NullEventSink;
    use crate::store::KeyFn;

    /// Counts fetches; serves one record per page out of three.
    struct TinyBackend {
        calls: AtomicU32,
    }

    #[async_trait]
    impl PageFetcher<String> for TinyBackend {
        async fn fetch_page(
            &self,
            _spec: &QuerySpec,
            cursor: &Cursor,
            _session: Session,
            _cancel: &CancellationToken,
        ) -> Result<FetchedPage<String>, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let page = match cursor {
                Cursor::Offset { page, .. } => *page,
                Cursor::Token { .. } => 1,
            };
            Ok(FetchedPage {
                records: vec![format!("rec-{page}")],
                total: Some(3),
                has_more: None,
                next_cursor: None,
            })
        }
    }

    fn tiny_coordinator(backend: Arc<TinyBackend>) -> Arc<FetchCoordinator<String>> {
        let key_of: KeyFn<String> = Arc::new(String::clone);
        let is_transient: TransientFn<String> = Arc::new(|_| false);
        FetchCoordinator::new(
            SyncConfig::default(),
            backend,
            key_of,
            is_transient,
            Arc::new(NullEventSink),
        )
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn fire_forwards_to_load_more() {
        let backend = Arc::new(TinyBackend { calls: AtomicU32::new(0) });
        let c = tiny_coordinator(Arc::clone(&backend));
        c.reset(QuerySpec::new(1)).await.unwrap();

        let trigger = ScrollTrigger::bind(&c, 8);
        trigger.fire().unwrap();
        settle().await;

        assert_eq!(c.snapshot().records.len(), 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn burst_firings_are_harmless() {
        let backend = Arc::new(TinyBackend { calls: AtomicU32::new(0) });
        let c = tiny_coordinator(Arc::clone(&backend));
        c.reset(QuerySpec::new(1)).await.unwrap();

        let trigger = ScrollTrigger::bind(&c, 2);
        for _ in 0..20 {
            trigger.fire().unwrap();
        }
        settle().await;

        // At most the remaining two pages were fetched, never more.
        assert_eq!(c.snapshot().records.len(), 3);
        assert!(!c.has_more());
        assert!(backend.calls.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn fire_after_dispose_reports_stopped() {
        let backend = Arc::new(TinyBackend { calls: AtomicU32::new(0) });
        let c = tiny_coordinator(backend);
        c.reset(QuerySpec::new(1)).await.unwrap();

        let trigger = ScrollTrigger::bind(&c, 2);
        c.dispose();

        // First fire wakes the forwarder, which observes the disposed
        // coordinator and stops; subsequent fires report the closed channel.
        trigger.fire().unwrap();
        settle().await;
        assert!(trigger.fire().is_err());
    }
}
