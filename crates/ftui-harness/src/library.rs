#![forbid(unsafe_code)]

//! In-memory media library.
//!
//! [`FakeLibrary`] can publish from any thread. Each published [`FakeChange`]
//! carries a prepared diff for one specific fetch result and reports nothing
//! for any other, matching by identity the way a real library compares
//! result handles.

use std::sync::Arc;

use ftui_datasource::{
    FetchResult, FetchResultChanges, LibraryChange, LibraryObserver, MediaLibrary,
    SharedObservers, Subscription,
};

/// An immutable vector snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VecFetchResult<T> {
    items: Vec<T>,
}

impl<T> VecFetchResult<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// Wrap in the `Arc` a library hands out.
    #[must_use]
    pub fn shared(items: Vec<T>) -> Arc<Self> {
        Arc::new(Self::new(items))
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }
}

impl<T> From<Vec<T>> for VecFetchResult<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> FetchResult for VecFetchResult<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Item = T;

    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, index: usize) -> Option<T> {
        self.items.get(index).cloned()
    }

    fn index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }
}

/// A change that affects exactly one fetch result.
#[derive(Debug)]
pub struct FakeChange<R> {
    target: Arc<R>,
    details: FetchResultChanges<R>,
}

impl<R> FakeChange<R> {
    /// `details` describe how `target` changed.
    #[must_use]
    pub fn new(target: &Arc<R>, details: FetchResultChanges<R>) -> Self {
        Self {
            target: Arc::clone(target),
            details,
        }
    }
}

impl<R> LibraryChange<R> for FakeChange<R> {
    fn details_for(&self, result: &Arc<R>) -> Option<FetchResultChanges<R>> {
        Arc::ptr_eq(&self.target, result).then(|| self.details.clone())
    }
}

/// Cloneable, thread-safe handle to an in-memory media library.
pub struct FakeLibrary<R: 'static> {
    observers: SharedObservers<dyn LibraryChange<R>>,
}

impl<R: 'static> Clone for FakeLibrary<R> {
    fn clone(&self) -> Self {
        Self {
            observers: self.observers.clone(),
        }
    }
}

impl<R: 'static> Default for FakeLibrary<R> {
    fn default() -> Self {
        Self {
            observers: SharedObservers::new(),
        }
    }
}

impl<R: 'static> FakeLibrary<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify every observer on the calling thread.
    pub fn publish<C: LibraryChange<R> + 'static>(&self, change: &C) {
        tracing::trace!(observers = self.observers.len(), "publishing library change");
        self.observers.notify(change);
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl<R: 'static> std::fmt::Debug for FakeLibrary<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeLibrary")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<R: FetchResult> MediaLibrary<R> for FakeLibrary<R> {
    fn register_observer(&self, observer: LibraryObserver<R>) -> Subscription {
        self.observers
            .subscribe(Arc::new(move |change: &(dyn LibraryChange<R> + 'static)| {
                observer(change);
            }))
    }
}
