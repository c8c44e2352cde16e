//! Presentation-facing event sinks.
//!
//! Defines [`ListEventSink`] for reacting to list-state transitions within a
//! `FetchCoordinator`, and [`CompositeEventSink`] which fans out
//! notifications to multiple sinks.

use std::sync::Arc;

use pagesync_core::ErrorKind;

/// Sink for list-state transitions emitted by a `FetchCoordinator`.
///
/// Implementations drive UI updates: re-rendering rows, toggling spinners,
/// showing error banners. Callbacks run on the coordinator's async context
/// and must be cheap and non-blocking.
///
/// Used as `Arc<dyn ListEventSink<T>>`.
pub trait ListEventSink<T>: Send + Sync {
    /// Called after a successful `reset` replaced the whole list.
    fn on_reset(&self, records: &[T], total: u64, has_more: bool);

    /// Called after a successful `load_more` appended a page.
    fn on_append(&self, records: &[T], total: u64, has_more: bool);

    /// Called after a successful `refresh` replaced the head window.
    fn on_refresh(&self, records: &[T], total: u64, has_more: bool);

    /// Called once per failed fetch attempt. Cancelled fetches never
    /// surface here.
    fn on_error(&self, kind: ErrorKind, message: &str);

    /// Called whenever either loading flag changes.
    fn on_loading_change(&self, initial_loading: bool, loading_more: bool);
}

/// Sink that ignores every notification. For headless or test use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl<T> ListEventSink<T> for NullEventSink {
    fn on_reset(&self, _records: &[T], _total: u64, _has_more: bool) {}
    fn on_append(&self, _records: &[T], _total: u64, _has_more: bool) {}
    fn on_refresh(&self, _records: &[T], _total: u64, _has_more: bool) {}
    fn on_error(&self, _kind: ErrorKind, _message: &str) {}
    fn on_loading_change(&self, _initial_loading: bool, _loading_more: bool) {}
}

/// Composite sink that fans out to multiple sinks in registration order.
pub struct CompositeEventSink<T> {
    sinks: Vec<Arc<dyn ListEventSink<T>>>,
}

impl<T> CompositeEventSink<T> {
    /// Creates a composite sink with the given list of sinks.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn ListEventSink<T>>>) -> Self {
        Self { sinks }
    }

    /// Adds a sink after construction.
    pub fn add(&mut self, sink: Arc<dyn ListEventSink<T>>) {
        self.sinks.push(sink);
    }
}

impl<T> Default for CompositeEventSink<T> {
    fn default() -> Self {
        Self { sinks: Vec::new() }
    }
}

impl<T> ListEventSink<T> for CompositeEventSink<T> {
    fn on_reset(&self, records: &[T], total: u64, has_more: bool) {
        for sink in &self.sinks {
            sink.on_reset(records, total, has_more);
        }
    }

    fn on_append(&self, records: &[T], total: u64, has_more: bool) {
        for sink in &self.sinks {
            sink.on_append(records, total, has_more);
        }
    }

    fn on_refresh(&self, records: &[T], total: u64, has_more: bool) {
        for sink in &self.sinks {
            sink.on_refresh(records, total, has_more);
        }
    }

    fn on_error(&self, kind: ErrorKind, message: &str) {
        for sink in &self.sinks {
            sink.on_error(kind, message);
        }
    }

    fn on_loading_change(&self, initial_loading: bool, loading_more: bool) {
        for sink in &self.sinks {
            sink.on_loading_change(initial_loading, loading_more);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Test sink that counts how many times each method is called.
    #[derive(Default)]
    pub(crate) struct CountingSink {
        pub reset_count: AtomicUsize,
        pub append_count: AtomicUsize,
        pub refresh_count: AtomicUsize,
        pub error_count: AtomicUsize,
        pub loading_count: AtomicUsize,
    }

    impl<T> ListEventSink<T> for CountingSink {
        fn on_reset(&self, _: &[T], _: u64, _: bool) {
            self.reset_count.fetch_add(1, Ordering::Relaxed);
        }
        fn on_append(&self, _: &[T], _: u64, _: bool) {
            self.append_count.fetch_add(1, Ordering::Relaxed);
        }
        fn on_refresh(&self, _: &[T], _: u64, _: bool) {
            self.refresh_count.fetch_add(1, Ordering::Relaxed);
        }
        fn on_error(&self, _: ErrorKind, _: &str) {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        fn on_loading_change(&self, _: bool, _: bool) {
            self.loading_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn empty_composite_does_not_panic() {
        let composite: CompositeEventSink<String> = CompositeEventSink::default();
        composite.on_reset(&[], 0, false);
        composite.on_append(&[], 0, false);
        composite.on_refresh(&[], 0, false);
        composite.on_error(ErrorKind::Network, "unreachable");
        composite.on_loading_change(true, false);
    }

    #[test]
    fn composite_fans_out_to_all_sinks() {
        let a = Arc::new(CountingSink::default());
        let b = Arc::new(CountingSink::default());
        let composite = CompositeEventSink::<String>::new(vec![
            Arc::clone(&a) as Arc<dyn ListEventSink<String>>,
            Arc::clone(&b) as Arc<dyn ListEventSink<String>>,
        ]);

        composite.on_reset(&["x".to_string()], 1, false);
        composite.on_append(&[], 1, false);
        composite.on_error(ErrorKind::Backend, "boom");

        for sink in [&a, &b] {
            assert_eq!(sink.reset_count.load(Ordering::Relaxed), 1);
            assert_eq!(sink.append_count.load(Ordering::Relaxed), 1);
            assert_eq!(sink.error_count.load(Ordering::Relaxed), 1);
        }
    }

    #[test]
    fn add_sink_after_construction() {
        let mut composite: CompositeEventSink<String> = CompositeEventSink::default();
        let sink = Arc::new(CountingSink::default());

        composite.on_refresh(&[], 0, false);
        assert_eq!(sink.refresh_count.load(Ordering::Relaxed), 0);

        composite.add(Arc::clone(&sink) as Arc<dyn ListEventSink<String>>);
        composite.on_refresh(&[], 0, false);
        assert_eq!(sink.refresh_count.load(Ordering::Relaxed), 1);
    }

    /// Verifies `Arc<dyn ListEventSink<T>>` compiles (object safety).
    #[test]
    fn event_sink_is_object_safe() {
        fn _assert_object_safe(_: &Arc<dyn ListEventSink<String>>) {}
    }
}
