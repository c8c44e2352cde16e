use std::sync::Arc;

use dashmap::DashMap;

/// Narrow lifecycle surface a registry needs from a coordinator, independent
/// of its record type parameter.
///
/// Used as `Arc<dyn ListLifecycle>`.
pub trait ListLifecycle: Send + Sync {
    /// Tears the view down; idempotent.
    fn dispose(&self);

    /// Whether the view has been torn down.
    fn is_disposed(&self) -> bool;
}

/// Registry of named list views, one coordinator per mounted view.
///
/// The registry owns references, not state: each coordinator remains the
/// sole owner of its store and timer. `dispose_all` is the app-shutdown
/// path that tears every view down.
pub struct ViewRegistry {
    views: DashMap<String, Arc<dyn ListLifecycle>>,
}

impl ViewRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { views: DashMap::new() }
    }

    /// Registers a view under `name`, returning the previously registered
    /// view of that name if any. The replaced view is *not* disposed; the
    /// caller decides whether it is still mounted.
    pub fn register(
        &self,
        name: impl Into<String>,
        view: Arc<dyn ListLifecycle>,
    ) -> Option<Arc<dyn ListLifecycle>> {
        self.views.insert(name.into(), view)
    }

    /// Looks up a view by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ListLifecycle>> {
        self.views.get(name).map(|entry| entry.value().clone())
    }

    /// Removes a view from the registry, returning it if found.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn ListLifecycle>> {
        self.views.remove(name).map(|(_, view)| view)
    }

    /// Number of registered views.
    #[must_use]
    pub fn count(&self) -> usize {
        self.views.len()
    }

    /// Disposes every registered view and empties the registry. Used during
    /// app shutdown.
    pub fn dispose_all(&self) {
        let names: Vec<String> = self.views.iter().map(|entry| entry.key().clone()).collect();
        for name in names {
            if let Some((_, view)) = self.views.remove(&name) {
                view.dispose();
            }
        }
    }
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new()
    }
}
