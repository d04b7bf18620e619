//! Callback registry
//!
//! Maps a category to the ordered list of callbacks registered for it.
//! Insertion order is preserved and duplicates are kept. There is no
//! unregister operation.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::category::Category;

/// Future returned by a callback
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A registered callback. Each invocation receives its own copy of the event.
pub type Callback<E> = Arc<dyn Fn(E) -> HandlerFuture + Send + Sync>;

/// Box an async function into a [`Callback`]
pub fn callback<E, F, Fut>(f: F) -> Callback<E>
where
    F: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |event| f(event).boxed())
}

/// Category → callbacks mapping owned by one dispatcher
pub struct CallbackRegistry<C, E> {
    callbacks: DashMap<C, Vec<Callback<E>>>,
}

impl<C: Category, E> CallbackRegistry<C, E> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            callbacks: DashMap::new(),
        }
    }

    /// Append a callback to the category's list
    pub fn register(&self, category: C, callback: Callback<E>) {
        self.callbacks.entry(category).or_default().push(callback);
    }

    /// Snapshot of the callbacks for a category, in registration order.
    ///
    /// Returns an empty list for a category nothing was registered under.
    /// The snapshot is detached from the map, so a callback may register
    /// further callbacks while it runs.
    pub fn callbacks(&self, category: &C) -> Vec<Callback<E>> {
        self.callbacks
            .get(category)
            .map(|list| list.value().clone())
            .unwrap_or_default()
    }

    /// Number of callbacks registered under a category
    pub fn len(&self, category: &C) -> usize {
        self.callbacks.get(category).map(|list| list.len()).unwrap_or(0)
    }

    /// Check if no callbacks are registered at all
    pub fn is_empty(&self) -> bool {
        self.callbacks.iter().all(|list| list.is_empty())
    }

    /// Categories that have at least one callback
    pub fn categories(&self) -> Vec<C> {
        self.callbacks
            .iter()
            .filter(|list| !list.is_empty())
            .map(|list| list.key().clone())
            .collect()
    }
}

impl<C: Category, E> Default for CallbackRegistry<C, E> {
    fn default() -> Self {
        Self::new()
    }
}
