#![forbid(unsafe_code)]

//! List data source over a live query (buffered-notification backends).
//!
//! A [`QueryDataSource`] observes a [`ResultsController`]. The controller
//! reports one batch as many small events:
//!
//! ```text
//! Idle ──WillChange──▶ Collecting ──ObjectChanged / SectionChanged──▶ Collecting
//!   ▲                                                                    │
//!   └──────────────── drain + translate ◀──────────DidChange─────────────┘
//! ```
//!
//! Each object or section event is classified into a
//! [`ChangeRecord`](crate::ChangeRecord) as it arrives and appended to the
//! notification buffer. `DidChange` drains the buffer and replays it into the
//! sink as one batch.
//!
//! # Invariants
//!
//! 1. At most one batch is pending at a time.
//! 2. The sink sees nothing of a batch until its `DidChange`.
//! 3. A batch aborted by a fatal error is never delivered, in whole or part.
//! 4. After teardown no sink call is made, whatever the controller emits.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Unknown change kind, section move/update, missing position | Batch aborted, [`ClassifyError`](crate::ClassifyError) returned to the controller |
//! | Object/section event outside a batch | [`ProtocolError::NotOpen`] returned |
//! | `WillChange` while a batch is open | [`ProtocolError::AlreadyOpen`] returned, open batch kept |
//! | Initial fetch fails | Logged, [`LoadState::Failed`], sink told via `content_loaded`; list empty |
//!
//! # Section scope
//!
//! With [`DataSourceConfig::section_scope`] set to `s`, only backend section
//! `s` is exposed, as section 0. Changes in other sections are dropped, a move
//! that crosses the scope boundary becomes a plain insert or remove, and
//! section-level events are validated but not forwarded. The scoped index is
//! fixed for the lifetime of the data source.

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use crate::backend::{ControllerEvent, ResultsController};
use crate::buffer::NotificationBuffer;
use crate::change::{ChangeRecord, ChangeType};
use crate::config::DataSourceConfig;
use crate::error::{ClassifyError, DataSourceError, ProtocolError};
use crate::position::Position;
use crate::sink::BatchSink;
use crate::subscription::Subscription;
use crate::surface::{ListSurface, LoadState, ObservationBridge, unsupported_removal};
use crate::translate::BatchTranslator;

struct QueryState<C> {
    controller: C,
    buffer: NotificationBuffer,
    load_state: LoadState,
}

/// Shared between the data source handle and the controller's observer.
///
/// The sink lives in its own cell so that it may read back through the data
/// source while a batch is being delivered.
struct QueryShared<C, S> {
    state: RefCell<QueryState<C>>,
    sink: RefCell<S>,
    config: DataSourceConfig,
    translator: BatchTranslator,
}

impl<C: ResultsController, S: BatchSink> QueryShared<C, S> {
    fn handle(&self, event: &ControllerEvent) -> Result<(), DataSourceError> {
        match *event {
            ControllerEvent::WillChange => {
                let mut state = self.state.borrow_mut();
                if state.buffer.is_open() {
                    tracing::error!(
                        pending = state.buffer.len(),
                        "will-change received while a batch is open"
                    );
                    return Err(ProtocolError::AlreadyOpen.into());
                }
                state.buffer.begin_batch();
                Ok(())
            }
            ControllerEvent::ObjectChanged { kind, old, new } => self.collect(|| {
                let kind = ChangeType::from_raw(kind.0)?;
                ChangeRecord::from_object_change(kind, old, new)
            }),
            ControllerEvent::SectionChanged { kind, section } => self.collect(|| {
                let kind = ChangeType::from_raw(kind.0)?;
                ChangeRecord::from_section_change(kind, section)
            }),
            ControllerEvent::DidChange => {
                let records = self.state.borrow_mut().buffer.drain();
                let mut sink = self.sink.borrow_mut();
                self.translator.translate(&records, &mut *sink);
                Ok(())
            }
        }
    }

    /// Classify one event into the open batch, aborting the batch on failure.
    fn collect(
        &self,
        classify: impl FnOnce() -> Result<ChangeRecord, ClassifyError>,
    ) -> Result<(), DataSourceError> {
        let mut state = self.state.borrow_mut();
        if !state.buffer.is_open() {
            tracing::error!("change event received outside a batch");
            return Err(ProtocolError::NotOpen.into());
        }
        let record = match classify() {
            Ok(record) => record,
            Err(e) => {
                let discarded = state.buffer.len();
                state.buffer.abort();
                tracing::error!(error = %e, discarded, "aborting batch");
                return Err(e.into());
            }
        };
        match scope_record(record, self.config.section_scope) {
            Some(record) => state.buffer.record(record).map_err(Into::into),
            None => Ok(()),
        }
    }

    /// Backend position for a position in this data source's numbering.
    fn backend_position(&self, position: Position) -> Option<Position> {
        match self.config.section_scope {
            Some(scope) if position.section == 0 => Some(position.in_section(scope)),
            Some(_) => None,
            None => Some(position),
        }
    }
}

/// Map a backend record into the scoped numbering. `None` drops it.
fn scope_record(record: ChangeRecord, scope: Option<usize>) -> Option<ChangeRecord> {
    let Some(scope) = scope else {
        return Some(record);
    };
    let local = |p: Position| (p.section == scope).then(|| p.in_section(0));
    match record {
        ChangeRecord::SectionInserted(_) | ChangeRecord::SectionRemoved(_) => None,
        ChangeRecord::ItemInserted { new } => local(new).map(|new| ChangeRecord::ItemInserted { new }),
        ChangeRecord::ItemRemoved { old } => local(old).map(|old| ChangeRecord::ItemRemoved { old }),
        ChangeRecord::ItemUpdated { at } => local(at).map(|at| ChangeRecord::ItemUpdated { at }),
        ChangeRecord::ItemMoved { old, new } => match (local(old), local(new)) {
            (Some(old), Some(new)) => Some(ChangeRecord::ItemMoved { old, new }),
            (Some(old), None) => Some(ChangeRecord::ItemRemoved { old }),
            (None, Some(new)) => Some(ChangeRecord::ItemInserted { new }),
            (None, None) => None,
        },
    }
}

/// Read-only list over a [`ResultsController`], delivering batched changes
/// to a [`BatchSink`].
///
/// Lives on the consuming context; the controller must deliver events there.
pub struct QueryDataSource<C: ResultsController, S: BatchSink> {
    shared: Rc<QueryShared<C, S>>,
    subscription: Option<Subscription>,
}

impl<C, S> QueryDataSource<C, S>
where
    C: ResultsController + 'static,
    S: BatchSink + 'static,
{
    /// Observe `controller` and run its initial fetch.
    pub fn new(controller: C, sink: S) -> Self {
        Self::with_config(controller, sink, DataSourceConfig::default())
    }

    /// Like [`new`](Self::new) with explicit configuration.
    ///
    /// Never fails: a failed initial fetch is logged, recorded as
    /// [`LoadState::Failed`] and reported through
    /// [`BatchSink::content_loaded`], leaving the list empty.
    pub fn with_config(controller: C, sink: S, config: DataSourceConfig) -> Self {
        let shared = Rc::new(QueryShared {
            state: RefCell::new(QueryState {
                controller,
                buffer: NotificationBuffer::new(),
                load_state: LoadState::Initial,
            }),
            sink: RefCell::new(sink),
            config,
            translator: BatchTranslator::new(),
        });

        let weak: Weak<QueryShared<C, S>> = Rc::downgrade(&shared);
        let subscription = shared
            .state
            .borrow()
            .controller
            .observe(Box::new(move |event: &ControllerEvent| match weak.upgrade() {
                Some(shared) => shared.handle(event),
                None => {
                    tracing::trace!(?event, "query data source gone; dropping event");
                    Ok(())
                }
            }));

        let source = Self {
            shared,
            subscription: Some(subscription),
        };

        let fetched = source.shared.state.borrow_mut().controller.perform_fetch();
        let load_state = match fetched {
            Ok(()) if source.is_empty() => LoadState::NoContent,
            Ok(()) => LoadState::Loaded,
            Err(e) => {
                tracing::warn!(error = %e, "initial fetch failed; list left empty");
                LoadState::Failed(e)
            }
        };
        tracing::debug!(?load_state, "query data source loaded");
        source
            .shared
            .sink
            .borrow_mut()
            .content_loaded(load_state.error());
        source.shared.state.borrow_mut().load_state = load_state;
        source
    }
}

impl<C: ResultsController, S: BatchSink> QueryDataSource<C, S> {
    /// Configuration this data source was built with.
    #[must_use]
    pub fn config(&self) -> &DataSourceConfig {
        &self.shared.config
    }

    /// Whether a batch is currently being collected.
    #[must_use]
    pub fn is_collecting(&self) -> bool {
        self.shared.state.borrow().buffer.is_open()
    }

    /// Run `f` with the sink.
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.shared.sink.borrow_mut())
    }

    /// Borrow the observed controller.
    #[must_use]
    pub fn controller(&self) -> Ref<'_, C> {
        Ref::map(self.shared.state.borrow(), |state| &state.controller)
    }
}

impl<C: ResultsController, S: BatchSink> ListSurface for QueryDataSource<C, S> {
    type Item = C::Item;

    fn section_count(&self) -> usize {
        let count = self.shared.state.borrow().controller.section_count();
        match self.shared.config.section_scope {
            Some(scope) => usize::from(scope < count),
            None => count,
        }
    }

    fn item_count(&self, section: usize) -> usize {
        self.shared
            .backend_position(Position::new(section, 0))
            .map_or(0, |p| {
                self.shared.state.borrow().controller.item_count(p.section)
            })
    }

    fn item_at(&self, position: Position) -> Result<C::Item, DataSourceError> {
        self.shared
            .backend_position(position)
            .and_then(|p| self.shared.state.borrow().controller.object_at(p))
            .ok_or(DataSourceError::OutOfRange { position })
    }

    fn positions_of(&self, item: &C::Item) -> Vec<Position> {
        let found = self.shared.state.borrow().controller.position_of(item);
        found
            .and_then(|p| match self.shared.config.section_scope {
                Some(scope) if p.section == scope => Some(p.in_section(0)),
                Some(_) => None,
                None => Some(p),
            })
            .into_iter()
            .collect()
    }

    fn remove_at(&mut self, position: Position) -> Result<(), DataSourceError> {
        tracing::debug!(%position, "rejecting removal from query data source");
        Err(unsupported_removal())
    }

    fn title(&self) -> Option<&str> {
        self.shared.config.title.as_deref()
    }
}

impl<C: ResultsController, S: BatchSink> ObservationBridge for QueryDataSource<C, S> {
    fn is_observing(&self) -> bool {
        self.subscription.is_some()
    }

    fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            self.shared.state.borrow_mut().buffer.abort();
            tracing::debug!("query data source unregistered");
        }
    }

    fn load_state(&self) -> LoadState {
        self.shared.state.borrow().load_state.clone()
    }
}

impl<C: ResultsController, S: BatchSink> Drop for QueryDataSource<C, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<C: ResultsController, S: BatchSink> std::fmt::Debug for QueryDataSource<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("QueryDataSource")
            .field("config", &self.shared.config)
            .field("observing", &self.subscription.is_some())
            .field("collecting", &state.buffer.is_open())
            .field("load_state", &state.load_state)
            .finish()
    }
}
