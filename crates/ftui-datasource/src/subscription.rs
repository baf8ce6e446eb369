#![forbid(unsafe_code)]

//! Typed observer registration with RAII teardown.
//!
//! Backends hand out a [`Subscription`] for every registered observer. The
//! data source keeps the guard for as long as it wants notifications; dropping
//! it (or calling [`Subscription::unsubscribe`]) removes the observer.
//!
//! Two observer lists are provided for backend implementors:
//!
//! - [`LocalObservers`]: single-threaded, for backends that deliver on the
//!   consuming context. Observers may fail; the first error stops delivery
//!   and is returned to the emitter.
//! - [`SharedObservers`]: `Send + Sync`, for backends that notify from worker
//!   threads. The observer list is an [`ArcSwap`] snapshot, so notification
//!   never holds a lock while observers run.
//!
//! # Invariants
//!
//! 1. Observers are notified in registration order.
//! 2. An observer removed during a notification cycle is not called for the
//!    rest of that cycle.
//! 3. Dropping the observer list while guards are alive is fine; the guards
//!    become no-ops.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak as ArcWeak};

use arc_swap::ArcSwap;

use crate::error::DataSourceError;

/// RAII guard for a registered observer.
#[must_use = "dropping a Subscription unregisters the observer"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Create a guard that runs `cancel` once, on drop or unsubscribe.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A guard with nothing to cancel.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Whether dropping this guard will still unregister something.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Unregister now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// LocalObservers: single-threaded, fallible delivery
// ---------------------------------------------------------------------------

type LocalCallback<E> = Rc<RefCell<dyn FnMut(&E) -> Result<(), DataSourceError>>>;

struct LocalInner<E: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, LocalCallback<E>)>,
}

/// Observer list for backends that deliver on the consuming context.
pub struct LocalObservers<E: ?Sized> {
    inner: Rc<RefCell<LocalInner<E>>>,
}

impl<E: ?Sized> Clone for LocalObservers<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: ?Sized + 'static> Default for LocalObservers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized + 'static> LocalObservers<E> {
    /// Create an empty observer list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(LocalInner {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register an observer.
    pub fn subscribe(
        &self,
        observer: impl FnMut(&E) -> Result<(), DataSourceError> + 'static,
    ) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            let callback: LocalCallback<E> = Rc::new(RefCell::new(observer));
            inner.entries.push((id, callback));
            id
        };
        let weak: Weak<RefCell<LocalInner<E>>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().entries.retain(|(entry, _)| *entry != id);
            }
        })
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Deliver `event` to every observer.
    ///
    /// # Errors
    ///
    /// The first observer error; later observers are not called.
    ///
    /// # Panics
    ///
    /// Panics if an observer re-enters `notify` and reaches itself again.
    pub fn notify(&self, event: &E) -> Result<(), DataSourceError> {
        let snapshot: Vec<(u64, LocalCallback<E>)> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(id, cb)| (*id, Rc::clone(cb)))
            .collect();

        for (id, callback) in snapshot {
            if !self.contains(id) {
                continue;
            }
            (&mut *callback.borrow_mut())(event)?;
        }
        Ok(())
    }

    fn contains(&self, id: u64) -> bool {
        self.inner.borrow().entries.iter().any(|(e, _)| *e == id)
    }
}

// ---------------------------------------------------------------------------
// SharedObservers: thread-safe, lock-free notification
// ---------------------------------------------------------------------------

type SharedCallback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct SharedEntry<E: ?Sized> {
    id: u64,
    callback: SharedCallback<E>,
}

impl<E: ?Sized> Clone for SharedEntry<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

struct SharedInner<E: ?Sized> {
    next_id: AtomicU64,
    entries: ArcSwap<Vec<SharedEntry<E>>>,
}

impl<E: ?Sized> SharedInner<E> {
    fn contains(&self, id: u64) -> bool {
        self.entries.load().iter().any(|e| e.id == id)
    }

    fn remove(&self, id: u64) {
        self.entries.rcu(|current| {
            current
                .iter()
                .filter(|e| e.id != id)
                .cloned()
                .collect::<Vec<_>>()
        });
    }
}

/// Observer list for backends that notify from arbitrary threads.
pub struct SharedObservers<E: ?Sized> {
    inner: Arc<SharedInner<E>>,
}

impl<E: ?Sized> Clone for SharedObservers<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: ?Sized + 'static> Default for SharedObservers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized + 'static> SharedObservers<E> {
    /// Create an empty observer list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SharedInner {
                next_id: AtomicU64::new(0),
                entries: ArcSwap::from_pointee(Vec::new()),
            }),
        }
    }

    /// Register an observer.
    pub fn subscribe(&self, observer: Arc<dyn Fn(&E) + Send + Sync>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = SharedEntry {
            id,
            callback: observer,
        };
        self.inner.entries.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(entry.clone());
            next
        });
        let weak: ArcWeak<SharedInner<E>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(id);
            }
        })
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.load().len()
    }

    /// Whether no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.load().is_empty()
    }

    /// Deliver `event` to every observer on the calling thread.
    pub fn notify(&self, event: &E) {
        let snapshot = self.inner.entries.load_full();
        for entry in snapshot.iter() {
            if self.inner.contains(entry.id) {
                (entry.callback)(event);
            }
        }
    }
}
