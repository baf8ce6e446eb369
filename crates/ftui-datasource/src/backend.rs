#![forbid(unsafe_code)]

//! Interfaces the data sources consume from observable backends.
//!
//! Two notification shapes are supported:
//!
//! - **Results controllers** ([`ResultsController`]) emit many small
//!   [`ControllerEvent`]s between a will-change and a did-change signal, on the
//!   consuming context.
//! - **Media libraries** ([`MediaLibrary`]) emit one change per mutation, from
//!   any thread. Each change can be asked for a complete diff
//!   ([`FetchResultChanges`]) against a given [`FetchResult`].
//!
//! Query execution and pagination are the backend's business; only the
//! observation and read-through surface is described here.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::change::ChangeType;
use crate::error::{DataSourceError, QueryError};
use crate::position::Position;
use crate::subscription::Subscription;

// ---------------------------------------------------------------------------
// Results controllers (incremental notifications)
// ---------------------------------------------------------------------------

/// Backend-native change kind code, classified by the data source.
///
/// See [`ChangeType::from_raw`] for the accepted codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawChangeType(pub u64);

impl From<ChangeType> for RawChangeType {
    fn from(kind: ChangeType) -> Self {
        Self(kind.raw())
    }
}

/// One notification from a results controller.
///
/// `WillChange` always precedes the first object or section signal of a batch
/// and `DidChange` always terminates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    /// A batch of changes is about to be reported.
    WillChange,
    /// An object changed. Which positions are present depends on `kind`.
    ObjectChanged {
        kind: RawChangeType,
        old: Option<Position>,
        new: Option<Position>,
    },
    /// A section was inserted or deleted.
    SectionChanged { kind: RawChangeType, section: usize },
    /// The batch is complete.
    DidChange,
}

impl ControllerEvent {
    /// Object change with a typed kind.
    #[must_use]
    pub fn object(kind: ChangeType, old: Option<Position>, new: Option<Position>) -> Self {
        Self::ObjectChanged {
            kind: kind.into(),
            old,
            new,
        }
    }

    /// Object insertion at `new`.
    #[must_use]
    pub fn inserted(new: Position) -> Self {
        Self::object(ChangeType::Insert, None, Some(new))
    }

    /// Object deletion at `old`.
    #[must_use]
    pub fn deleted(old: Position) -> Self {
        Self::object(ChangeType::Delete, Some(old), None)
    }

    /// Object move from `old` to `new`.
    #[must_use]
    pub fn moved(old: Position, new: Position) -> Self {
        Self::object(ChangeType::Move, Some(old), Some(new))
    }

    /// In-place update of the object at `at`.
    #[must_use]
    pub fn updated(at: Position) -> Self {
        Self::object(ChangeType::Update, Some(at), None)
    }

    /// Section change with a typed kind.
    #[must_use]
    pub fn section(kind: ChangeType, section: usize) -> Self {
        Self::SectionChanged {
            kind: kind.into(),
            section,
        }
    }
}

/// Observer callback registered with a results controller.
///
/// The observer's error is returned to whoever delivered the event.
pub type ControllerObserver = Box<dyn FnMut(&ControllerEvent) -> Result<(), DataSourceError>>;

/// A live, sectioned query result set.
pub trait ResultsController {
    /// Item type produced by the query.
    type Item;

    /// Execute the query.
    ///
    /// # Errors
    ///
    /// [`QueryError`] when the query cannot run. The controller is then empty.
    fn perform_fetch(&mut self) -> Result<(), QueryError>;

    /// Register for change notifications.
    fn observe(&self, observer: ControllerObserver) -> Subscription;

    /// Number of sections in the current result.
    fn section_count(&self) -> usize;

    /// Number of items in `section`, zero if it does not exist.
    fn item_count(&self, section: usize) -> usize;

    /// Item at `position`, if any.
    fn object_at(&self, position: Position) -> Option<Self::Item>;

    /// Position of `item`, if it is part of the result.
    fn position_of(&self, item: &Self::Item) -> Option<Position>;
}

// ---------------------------------------------------------------------------
// Media libraries (snapshot diffs)
// ---------------------------------------------------------------------------

/// An immutable, single-section snapshot of library items.
pub trait FetchResult: Send + Sync + 'static {
    /// Item type of the snapshot.
    type Item;

    /// Number of items.
    fn len(&self) -> usize;

    /// Whether the snapshot is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index`, if any.
    fn get(&self, index: usize) -> Option<Self::Item>;

    /// Index of `item`, if present.
    fn index_of(&self, item: &Self::Item) -> Option<usize>;
}

/// Complete diff of one fetch result across one library change.
///
/// `removed` indexes refer to the snapshot before the change; `inserted`,
/// `changed` and move destinations refer to the snapshot after it.
#[derive(Debug)]
pub struct FetchResultChanges<R> {
    /// Indexes removed from the old snapshot.
    pub removed: BTreeSet<usize>,
    /// Indexes inserted into the new snapshot.
    pub inserted: BTreeSet<usize>,
    /// Indexes whose items changed in place.
    pub changed: BTreeSet<usize>,
    /// `(from, to)` index pairs of moved items.
    pub moves: Vec<(usize, usize)>,
    /// False when the library could not describe the change item by item.
    pub incremental: bool,
    /// Snapshot after the change, if the library provides one.
    pub after: Option<Arc<R>>,
}

impl<R> Clone for FetchResultChanges<R> {
    fn clone(&self) -> Self {
        Self {
            removed: self.removed.clone(),
            inserted: self.inserted.clone(),
            changed: self.changed.clone(),
            moves: self.moves.clone(),
            incremental: self.incremental,
            after: self.after.clone(),
        }
    }
}

impl<R> Default for FetchResultChanges<R> {
    fn default() -> Self {
        Self {
            removed: BTreeSet::new(),
            inserted: BTreeSet::new(),
            changed: BTreeSet::new(),
            moves: Vec::new(),
            incremental: true,
            after: None,
        }
    }
}

impl<R> FetchResultChanges<R> {
    /// An empty incremental diff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A diff the library could not express incrementally.
    #[must_use]
    pub fn reload(after: Option<Arc<R>>) -> Self {
        Self {
            incremental: false,
            after,
            ..Self::default()
        }
    }

    /// Set removed indexes.
    #[must_use]
    pub fn removed(mut self, indexes: impl IntoIterator<Item = usize>) -> Self {
        self.removed = indexes.into_iter().collect();
        self
    }

    /// Set inserted indexes.
    #[must_use]
    pub fn inserted(mut self, indexes: impl IntoIterator<Item = usize>) -> Self {
        self.inserted = indexes.into_iter().collect();
        self
    }

    /// Set changed indexes.
    #[must_use]
    pub fn changed(mut self, indexes: impl IntoIterator<Item = usize>) -> Self {
        self.changed = indexes.into_iter().collect();
        self
    }

    /// Set move pairs.
    #[must_use]
    pub fn moves(mut self, pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        self.moves = pairs.into_iter().collect();
        self
    }

    /// Attach the post-change snapshot.
    #[must_use]
    pub fn after(mut self, snapshot: Arc<R>) -> Self {
        self.after = Some(snapshot);
        self
    }

    /// Whether any item-level change is described.
    #[must_use]
    pub fn has_item_changes(&self) -> bool {
        !(self.removed.is_empty()
            && self.inserted.is_empty()
            && self.changed.is_empty()
            && self.moves.is_empty())
    }
}

/// One library-wide change notification.
pub trait LibraryChange<R> {
    /// Diff for `result`, or `None` if the change does not affect it.
    fn details_for(&self, result: &Arc<R>) -> Option<FetchResultChanges<R>>;
}

/// Observer callback registered with a media library.
pub type LibraryObserver<R> = Arc<dyn Fn(&dyn LibraryChange<R>) + Send + Sync>;

/// A library whose changes are reported as whole diffs, from any thread.
pub trait MediaLibrary<R: FetchResult> {
    /// Register for change notifications.
    fn register_observer(&self, observer: LibraryObserver<R>) -> Subscription;
}
