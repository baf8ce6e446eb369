#![forbid(unsafe_code)]

//! List data source over a media-library fetch result (snapshot-diff backends).
//!
//! A media library reports each mutation once, possibly from a worker thread,
//! and can describe it as a complete diff against a given fetch result. The
//! [`LibraryDataSource`] turns each diff into one batch synchronously on the
//! notifying thread, then hands the whole batch to its [`UiContext`] as a
//! single task.
//!
//! # Invariants
//!
//! 1. Records are built in the order removals, insertions, updates, moves.
//!    Removal indexes refer to the snapshot before the change; insertion,
//!    update and move destinations to the snapshot after it.
//! 2. A batch is one task: it is never split across contexts.
//! 3. Batches reach the sink in notification order. Diffing against
//!    `latest` and dispatching happen under one lock, and contexts are FIFO,
//!    so concurrent publishers cannot reorder chained batches.
//! 4. The visible snapshot is replaced by the delivery task, before
//!    `begin_batch`; reads from the sink during a batch see the new snapshot.
//! 5. After teardown, no sink call is made, including by tasks already queued.
//!
//! # Snapshots
//!
//! Two snapshots are tracked. `latest` advances on the notifying thread as
//! soon as a diff arrives and is what the next change is diffed against.
//! `visible` is what [`ListSurface`] reads and only moves when a batch is
//! delivered. Between the two sit batches still queued on the context.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Change does not affect the fetch result | Ignored |
//! | Diff is not incremental | One [`BatchSink::reload_data`] call, no batch |
//! | Data source dropped with tasks queued | Tasks run as no-ops |
//! | Lock poisoned by a panicking sink | Lock recovered, delivery continues |
//! | Sink publishes a library change under [`ImmediateContext`](crate::context::ImmediateContext) | Deadlock; use a queued context |

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;

use crate::backend::{FetchResult, FetchResultChanges, LibraryChange, LibraryObserver, MediaLibrary};
use crate::buffer::NotificationBuffer;
use crate::change::ChangeRecord;
use crate::config::DataSourceConfig;
use crate::context::UiContext;
use crate::error::{DataSourceError, ProtocolError};
use crate::position::Position;
use crate::sink::BatchSink;
use crate::subscription::Subscription;
use crate::surface::{ListSurface, LoadState, ObservationBridge, unsupported_removal};
use crate::translate::BatchTranslator;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Work handed to the UI context for one library change.
enum Delivery {
    Batch(Vec<ChangeRecord>),
    Reload,
}

struct LibraryShared<R, S> {
    latest: Mutex<Arc<R>>,
    visible: ArcSwap<R>,
    sink: Mutex<S>,
    context: Arc<dyn UiContext>,
    torn_down: AtomicBool,
    translator: BatchTranslator,
}

impl<R, S> LibraryShared<R, S>
where
    R: FetchResult,
    S: BatchSink + Send + 'static,
{
    /// Runs on whichever thread the library notifies from.
    fn on_change(self: &Arc<Self>, change: &dyn LibraryChange<R>) {
        if self.torn_down.load(Ordering::Acquire) {
            tracing::trace!("library data source torn down; dropping change");
            return;
        }

        // Held until the task is dispatched: diff order is queue order.
        let mut latest = lock(&self.latest);
        let Some(details) = change.details_for(&latest) else {
            tracing::trace!("library change does not affect this fetch result");
            return;
        };

        let delivery = if details.incremental {
            match collect_records(&details) {
                Ok(records) => Delivery::Batch(records),
                Err(e) => {
                    tracing::error!(error = %e, "could not buffer library change");
                    return;
                }
            }
        } else {
            tracing::debug!("library change is not incremental; reloading");
            Delivery::Reload
        };

        let after = details.after;
        if let Some(after) = &after {
            *latest = Arc::clone(after);
        }
        let weak = Arc::downgrade(self);
        self.context.dispatch(Box::new(move || match weak.upgrade() {
            Some(shared) => shared.deliver(after, delivery),
            None => tracing::trace!("library data source gone; dropping queued batch"),
        }));
        drop(latest);
    }

    /// Runs on the UI context.
    fn deliver(&self, after: Option<Arc<R>>, delivery: Delivery) {
        if self.torn_down.load(Ordering::Acquire) {
            tracing::trace!("library data source torn down; dropping queued batch");
            return;
        }
        if let Some(after) = after {
            self.visible.store(after);
        }
        let mut sink = lock(&self.sink);
        match delivery {
            Delivery::Batch(records) => {
                self.translator.translate(&records, &mut *sink);
            }
            Delivery::Reload => sink.reload_data(),
        }
    }
}

/// Buffer one diff in delivery order.
fn collect_records<R>(details: &FetchResultChanges<R>) -> Result<Vec<ChangeRecord>, ProtocolError> {
    let mut buffer = NotificationBuffer::new();
    buffer.begin_batch();
    for &index in &details.removed {
        buffer.record(ChangeRecord::ItemRemoved {
            old: Position::item(index),
        })?;
    }
    for &index in &details.inserted {
        buffer.record(ChangeRecord::ItemInserted {
            new: Position::item(index),
        })?;
    }
    for &index in &details.changed {
        buffer.record(ChangeRecord::ItemUpdated {
            at: Position::item(index),
        })?;
    }
    for &(from, to) in &details.moves {
        buffer.record(ChangeRecord::ItemMoved {
            old: Position::item(from),
            new: Position::item(to),
        })?;
    }
    Ok(buffer.drain())
}

/// Single-section, read-only list over a media-library fetch result.
///
/// Library notifications may arrive on any thread; every sink call happens
/// inside a task dispatched to the data source's [`UiContext`]. The sink must
/// not call [`with_sink`](Self::with_sink) while handling a batch.
pub struct LibraryDataSource<R: FetchResult, S> {
    shared: Arc<LibraryShared<R, S>>,
    subscription: Option<Subscription>,
    config: DataSourceConfig,
    load_state: LoadState,
}

impl<R, S> LibraryDataSource<R, S>
where
    R: FetchResult,
    S: BatchSink + Send + 'static,
{
    /// Observe `library` for changes to `fetch_result`.
    pub fn new<L>(fetch_result: Arc<R>, library: &L, context: Arc<dyn UiContext>, sink: S) -> Self
    where
        L: MediaLibrary<R> + ?Sized,
    {
        Self::with_config(
            fetch_result,
            library,
            context,
            sink,
            DataSourceConfig::default(),
        )
    }

    /// Like [`new`](Self::new) with explicit configuration.
    ///
    /// The fetch result is already materialized, so the load state is settled
    /// immediately and reported through [`BatchSink::content_loaded`].
    pub fn with_config<L>(
        fetch_result: Arc<R>,
        library: &L,
        context: Arc<dyn UiContext>,
        mut sink: S,
        config: DataSourceConfig,
    ) -> Self
    where
        L: MediaLibrary<R> + ?Sized,
    {
        if config.section_scope.is_some() {
            tracing::debug!("section scope ignored by single-section library data source");
        }
        let load_state = if fetch_result.is_empty() {
            LoadState::NoContent
        } else {
            LoadState::Loaded
        };
        sink.content_loaded(None);

        let shared = Arc::new(LibraryShared {
            latest: Mutex::new(Arc::clone(&fetch_result)),
            visible: ArcSwap::new(fetch_result),
            sink: Mutex::new(sink),
            context,
            torn_down: AtomicBool::new(false),
            translator: BatchTranslator::new(),
        });

        let weak = Arc::downgrade(&shared);
        let observer: LibraryObserver<R> =
            Arc::new(move |change: &dyn LibraryChange<R>| match weak.upgrade() {
                Some(shared) => shared.on_change(change),
                None => tracing::trace!("library data source gone; dropping change"),
            });
        let subscription = library.register_observer(observer);
        tracing::debug!(?load_state, "library data source registered");

        Self {
            shared,
            subscription: Some(subscription),
            config,
            load_state,
        }
    }
}

impl<R: FetchResult, S> LibraryDataSource<R, S> {
    /// The snapshot the list surface currently reads.
    #[must_use]
    pub fn fetch_result(&self) -> Arc<R> {
        self.shared.visible.load_full()
    }

    /// Configuration this data source was built with.
    #[must_use]
    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    /// Run `f` with the sink.
    pub fn with_sink<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        f(&mut lock(&self.shared.sink))
    }
}

impl<R: FetchResult, S> ListSurface for LibraryDataSource<R, S> {
    type Item = R::Item;

    fn section_count(&self) -> usize {
        1
    }

    fn item_count(&self, section: usize) -> usize {
        if section == 0 {
            self.shared.visible.load().len()
        } else {
            0
        }
    }

    fn item_at(&self, position: Position) -> Result<R::Item, DataSourceError> {
        if position.section != 0 {
            return Err(DataSourceError::OutOfRange { position });
        }
        self.shared
            .visible
            .load()
            .get(position.index)
            .ok_or(DataSourceError::OutOfRange { position })
    }

    fn positions_of(&self, item: &R::Item) -> Vec<Position> {
        self.shared
            .visible
            .load()
            .index_of(item)
            .map(Position::item)
            .into_iter()
            .collect()
    }

    fn remove_at(&mut self, position: Position) -> Result<(), DataSourceError> {
        tracing::debug!(%position, "rejecting removal from library data source");
        Err(unsupported_removal())
    }

    fn title(&self) -> Option<&str> {
        self.config.title.as_deref()
    }
}

impl<R: FetchResult, S> ObservationBridge for LibraryDataSource<R, S> {
    fn is_observing(&self) -> bool {
        self.subscription.is_some()
    }

    fn teardown(&mut self) {
        self.shared.torn_down.store(true, Ordering::Release);
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!("library data source unregistered");
        }
    }

    fn load_state(&self) -> LoadState {
        self.load_state.clone()
    }
}

impl<R: FetchResult, S> Drop for LibraryDataSource<R, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<R: FetchResult, S> std::fmt::Debug for LibraryDataSource<R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryDataSource")
            .field("config", &self.config)
            .field("observing", &self.subscription.is_some())
            .field("len", &self.shared.visible.load().len())
            .field("load_state", &self.load_state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_follow_removed_inserted_changed_moved_order() {
        let details = FetchResultChanges::<()>::new()
            .moves([(0, 4)])
            .changed([2])
            .inserted([5, 1])
            .removed([3]);
        let records = collect_records(&details).unwrap();
        assert_eq!(
            records,
            vec![
                ChangeRecord::ItemRemoved {
                    old: Position::item(3)
                },
                ChangeRecord::ItemInserted {
                    new: Position::item(1)
                },
                ChangeRecord::ItemInserted {
                    new: Position::item(5)
                },
                ChangeRecord::ItemUpdated {
                    at: Position::item(2)
                },
                ChangeRecord::ItemMoved {
                    old: Position::item(0),
                    new: Position::item(4)
                },
            ]
        );
    }

    #[test]
    fn empty_diff_buffers_nothing() {
        let records = collect_records(&FetchResultChanges::<()>::new()).unwrap();
        assert!(records.is_empty());
    }
}
