//! Fetch orchestration for one paginated list view.
//!
//! [`FetchCoordinator`] owns the current query spec, session counter,
//! cursor, record store, and status watcher for a single list view, and
//! exposes the only operations the presentation layer may call: `reset`,
//! `load_more`, `refresh`, the local-mutation pair, and `dispose`.
//!
//! Correctness under overlapping async operations rests on three fences:
//!
//! - **Session**: every fetch is stamped at issue time; a response whose
//!   session no longer matches is discarded (a newer `reset` won).
//! - **Single-flight `load_more`**: a boolean guard set before the request
//!   and cleared on every exit path ensures at most one outstanding
//!   `load_more`, which also makes append ordering trivial.
//! - **Mutation epoch**: a `refresh` response issued before the latest
//!   local mutation is discarded wholesale, so local edits always win over
//!   responses that predate them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use pagesync_core::{
    Cursor, PageFetcher, PaginationMode, QuerySpec, Session, SessionCounter, SyncError,
};

use crate::config::SyncConfig;
use crate::events::ListEventSink;
use crate::registry::ListLifecycle;
use crate::store::{HasMorePolicy, KeyFn, ListSnapshot, RecordStore};
use crate::watcher::{Pollable, StatusWatcher};

/// Transient-status predicate supplied by the caller.
pub type TransientFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

struct FetchState {
    spec: QuerySpec,
    cursor: Cursor,
    /// Cancellation token covering all fetches of the current session.
    in_flight: CancellationToken,
    loading_more: bool,
    initial_loading: bool,
    /// Bumped on every local mutation; fences refresh responses.
    mutation_epoch: u64,
}

/// Orchestrator for one list view. One instance per mounted view; never a
/// process-wide singleton.
pub struct FetchCoordinator<T> {
    config: SyncConfig,
    fetcher: Arc<dyn PageFetcher<T>>,
    events: Arc<dyn ListEventSink<T>>,
    is_transient: TransientFn<T>,
    store: RecordStore<T>,
    sessions: SessionCounter,
    state: Mutex<FetchState>,
    watcher: StatusWatcher,
    /// Last published snapshot; lock-free reads for the presentation layer.
    latest: ArcSwap<ListSnapshot<T>>,
    disposed: AtomicBool,
    weak_self: Weak<FetchCoordinator<T>>,
}

impl<T: Clone + Send + Sync + 'static> FetchCoordinator<T> {
    /// Creates a coordinator for one list view.
    ///
    /// The store starts empty; no fetch is issued until the first `reset`.
    #[must_use]
    pub fn new(
        config: SyncConfig,
        fetcher: Arc<dyn PageFetcher<T>>,
        key_of: KeyFn<T>,
        is_transient: TransientFn<T>,
        events: Arc<dyn ListEventSink<T>>,
    ) -> Arc<Self> {
        let policy = match config.pagination {
            PaginationMode::Offset => HasMorePolicy::FromTotal,
            PaginationMode::Token => HasMorePolicy::ServerReported,
        };
        let watcher = StatusWatcher::new(config.poll_interval);
        let pagination = config.pagination;

        Arc::new_cyclic(|weak| Self {
            state: Mutex::new(FetchState {
                spec: QuerySpec::default(),
                cursor: Cursor::first_page(pagination, 0),
                in_flight: CancellationToken::new(),
                loading_more: false,
                initial_loading: false,
                mutation_epoch: 0,
            }),
            store: RecordStore::new(key_of, policy),
            sessions: SessionCounter::new(),
            watcher,
            latest: ArcSwap::from_pointee(ListSnapshot::default()),
            disposed: AtomicBool::new(false),
            weak_self: weak.clone(),
            config,
            fetcher,
            events,
            is_transient,
        })
    }

    /// Starts a new query: cancels any in-flight fetch, bumps the session,
    /// clears the store, and fetches page 1.
    ///
    /// Every keyword/sort/filter change goes through here — including
    /// clearing a search box back to the empty string.
    ///
    /// # Errors
    ///
    /// Returns the fetch error on failure; the store is left empty with
    /// `has_more` false, and `on_error` has been emitted.
    pub async fn reset(&self, spec: QuerySpec) -> Result<(), SyncError> {
        if self.is_disposed() {
            return Ok(());
        }

        let (session, cancel, cursor, spec_copy) = {
            let mut state = self.state.lock();
            state.in_flight.cancel();
            state.in_flight = CancellationToken::new();
            state.loading_more = false;
            state.initial_loading = true;
            state.mutation_epoch = 0;
            state.spec = spec;
            state.cursor = Cursor::first_page(self.config.pagination, state.spec.page_size);
            (
                self.sessions.advance(),
                state.in_flight.clone(),
                state.cursor.clone(),
                state.spec.clone(),
            )
        };
        self.store.clear();
        self.publish();
        self.events.on_loading_change(true, false);

        let result = self
            .fetcher
            .fetch_page(&spec_copy, &cursor, session, &cancel)
            .await;

        if session != self.sessions.current() || self.is_disposed() {
            debug!(session = session.0, "discarding superseded reset response");
            return Ok(());
        }

        match result {
            Ok(page) => {
                {
                    let mut state = self.state.lock();
                    state.initial_loading = false;
                    state.cursor.advance(page.next_cursor.clone());
                }
                self.store.replace(page.records, page.total, page.has_more);
                self.publish();
                self.events.on_loading_change(false, false);
                let snap = self.latest.load();
                self.events.on_reset(&snap.records, snap.total, snap.has_more);
                self.evaluate_watcher();
                Ok(())
            }
            Err(SyncError::Cancelled) => {
                debug!(session = session.0, "reset fetch cancelled");
                Ok(())
            }
            Err(err) => {
                self.state.lock().initial_loading = false;
                self.events.on_loading_change(false, false);
                self.events.on_error(err.kind(), &err.to_string());
                Err(err)
            }
        }
    }

    /// Fetches the next page and appends it.
    ///
    /// A no-op while another `load_more` is in flight, while the initial
    /// load is running, or once `has_more` is false — so burst firings from
    /// a scroll trigger are harmless.
    ///
    /// # Errors
    ///
    /// Returns the fetch error on failure. Previously loaded records are
    /// untouched and the in-flight guard is cleared, so a retry is possible.
    pub async fn load_more(&self) -> Result<(), SyncError> {
        if self.is_disposed() {
            return Ok(());
        }

        let issued = {
            let mut state = self.state.lock();
            if state.loading_more || state.initial_loading || !self.store.has_more() {
                None
            } else {
                state.loading_more = true;
                Some((
                    self.sessions.current(),
                    state.in_flight.clone(),
                    state.cursor.clone(),
                    state.spec.clone(),
                ))
            }
        };
        let Some((session, cancel, cursor, spec)) = issued else {
            return Ok(());
        };
        self.events.on_loading_change(false, true);

        let result = self.fetcher.fetch_page(&spec, &cursor, session, &cancel).await;

        // Clear the single-flight guard only if this session still owns the
        // flags; a concurrent reset already reclaimed them.
        if session != self.sessions.current() || self.is_disposed() {
            debug!(session = session.0, "discarding superseded load_more response");
            return Ok(());
        }
        self.state.lock().loading_more = false;

        match result {
            Ok(page) => {
                self.state.lock().cursor.advance(page.next_cursor.clone());
                self.store.append(page.records, page.total, page.has_more);
                self.publish();
                self.events.on_loading_change(false, false);
                let snap = self.latest.load();
                self.events.on_append(&snap.records, snap.total, snap.has_more);
                self.evaluate_watcher();
                Ok(())
            }
            Err(SyncError::Cancelled) => {
                debug!(session = session.0, "load_more fetch cancelled");
                Ok(())
            }
            Err(err) => {
                self.events.on_loading_change(false, false);
                self.events.on_error(err.kind(), &err.to_string());
                Err(err)
            }
        }
    }

    /// Re-fetches page 1 under the *current* session and swaps the head
    /// window, leaving the appended tail untouched.
    ///
    /// Driven by the status watcher's timer; also safe to call from a
    /// manual refresh control.
    ///
    /// # Errors
    ///
    /// Returns the fetch error on failure. Existing records are untouched;
    /// if the watcher is armed, its next tick retries.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        if self.is_disposed() {
            return Ok(());
        }

        let (session, cancel, spec, epoch) = {
            let state = self.state.lock();
            (
                self.sessions.current(),
                state.in_flight.clone(),
                state.spec.clone(),
                state.mutation_epoch,
            )
        };
        if session == Session(0) {
            // No query has been issued yet; nothing to refresh.
            return Ok(());
        }
        let head = Cursor::first_page(self.config.pagination, spec.page_size);
        let window = spec.page_size as usize;

        let result = self.fetcher.fetch_page(&spec, &head, session, &cancel).await;

        if session != self.sessions.current() || self.is_disposed() {
            debug!(session = session.0, "discarding superseded refresh response");
            return Ok(());
        }
        if self.state.lock().mutation_epoch != epoch {
            debug!("discarding refresh response superseded by a local mutation");
            return Ok(());
        }

        match result {
            Ok(page) => {
                self.store
                    .replace_head(page.records, window, page.total, page.has_more);
                self.publish();
                let snap = self.latest.load();
                self.events.on_refresh(&snap.records, snap.total, snap.has_more);
                self.evaluate_watcher();
                Ok(())
            }
            Err(SyncError::Cancelled) => Ok(()),
            Err(err) => {
                self.events.on_error(err.kind(), &err.to_string());
                Err(err)
            }
        }
    }

    /// Convenience for the search-box path: current spec with new keywords,
    /// through `reset`.
    ///
    /// # Errors
    ///
    /// Same as [`FetchCoordinator::reset`].
    pub async fn search(&self, keywords: impl Into<String> + Send) -> Result<(), SyncError> {
        let spec = { self.state.lock().spec.clone() }.with_keywords(keywords);
        self.reset(spec).await
    }

    /// Applies a synchronous local patch after a server-side action
    /// succeeded, so the UI reflects it without waiting for the next poll.
    /// Returns `false` if the key is not present.
    pub fn patch_local(&self, key: &str, patch: impl FnOnce(&mut T)) -> bool {
        if self.is_disposed() {
            return false;
        }
        let applied = self.store.patch_one(key, patch);
        if applied {
            self.state.lock().mutation_epoch += 1;
            self.publish();
            self.evaluate_watcher();
        }
        applied
    }

    /// Removes a record locally (e.g. after a delete completed server-side),
    /// decrementing `total`. The key cannot be resurrected by any response
    /// within this query lifetime. Returns `false` if the key is not present.
    pub fn remove_local(&self, key: &str) -> bool {
        if self.is_disposed() {
            return false;
        }
        let removed = self.store.remove_one(key);
        if removed {
            self.state.lock().mutation_epoch += 1;
            self.publish();
            self.evaluate_watcher();
        }
        removed
    }

    /// Tears the view down: cancels any in-flight fetch and clears the
    /// polling timer. Subsequent operations are no-ops.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.lock().in_flight.cancel();
        self.watcher.dispose();
        debug!("list coordinator disposed");
    }

    /// Whether `dispose` has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Last published snapshot. Lock-free; safe to call from render code.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ListSnapshot<T>> {
        self.latest.load_full()
    }

    /// Whether more pages can be fetched for the current query.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.store.has_more()
    }

    /// Whether the status-poll timer is armed.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.watcher.is_polling()
    }

    /// Current `(initial_loading, loading_more)` flags.
    #[must_use]
    pub fn loading_state(&self) -> (bool, bool) {
        let state = self.state.lock();
        (state.initial_loading, state.loading_more)
    }

    /// Session of the current query (0 before the first reset).
    #[must_use]
    pub fn current_session(&self) -> Session {
        self.sessions.current()
    }

    fn publish(&self) {
        self.latest.store(Arc::new(self.store.snapshot()));
    }

    fn evaluate_watcher(&self) {
        let any = self.store.any(|r| (self.is_transient)(r));
        let weak: Weak<dyn Pollable> = self.weak_self.clone();
        self.watcher.evaluate(any, weak);
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> Pollable for FetchCoordinator<T> {
    async fn poll_tick(&self) {
        // Poll failures surface via on_error; the armed timer is the retry.
        let _ = self.refresh().await;
    }
}

impl<T: Clone + Send + Sync + 'static> ListLifecycle for FetchCoordinator<T> {
    fn dispose(&self) {
        FetchCoordinator::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        FetchCoordinator::is_disposed(self)
    }
}
