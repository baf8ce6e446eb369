#![forbid(unsafe_code)]

//! The batch-update contract implemented by list surfaces.
//!
//! A [`BatchSink`] receives one `begin_batch` … `end_batch` sequence per
//! translated batch. Everything in between is one atomic UI update: removal
//! and section-removal positions refer to the pre-batch indexing, insertion
//! and move-destination positions to the post-batch indexing.
//!
//! # Invariants
//!
//! 1. `begin_batch` and `end_batch` always come in pairs.
//! 2. No call from one data source arrives between another batch's pair.
//! 3. [`BatchSink::reload_data`] and [`BatchSink::content_loaded`] are never
//!    called inside a batch.

use crate::error::QueryError;
use crate::position::Position;

/// Summary of a batch, handed to the sink when it opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchInfo {
    /// Number of change records in the batch.
    pub len: usize,
    /// Every record is an in-place update; layout can be skipped.
    pub refresh_only: bool,
}

/// Consumer of translated batches, typically a list widget.
pub trait BatchSink {
    /// A batch opens.
    fn begin_batch(&mut self, info: &BatchInfo);

    /// The open batch closes; apply it as one update.
    fn end_batch(&mut self);

    /// Sections were inserted.
    fn sections_inserted(&mut self, sections: &[usize]);

    /// Sections were removed.
    fn sections_removed(&mut self, sections: &[usize]);

    /// Items were inserted.
    fn items_inserted(&mut self, positions: &[Position]);

    /// Items were removed.
    fn items_removed(&mut self, positions: &[Position]);

    /// Items changed in place.
    fn items_refreshed(&mut self, positions: &[Position]);

    /// An item moved.
    fn item_moved(&mut self, from: Position, to: Position);

    /// The backend could not describe its change incrementally; reload
    /// everything.
    fn reload_data(&mut self) {}

    /// The initial fetch finished. `error` is `Some` when it failed.
    fn content_loaded(&mut self, error: Option<&QueryError>) {
        let _ = error;
    }
}

impl<S: BatchSink + ?Sized> BatchSink for &mut S {
    fn begin_batch(&mut self, info: &BatchInfo) {
        (**self).begin_batch(info);
    }

    fn end_batch(&mut self) {
        (**self).end_batch();
    }

    fn sections_inserted(&mut self, sections: &[usize]) {
        (**self).sections_inserted(sections);
    }

    fn sections_removed(&mut self, sections: &[usize]) {
        (**self).sections_removed(sections);
    }

    fn items_inserted(&mut self, positions: &[Position]) {
        (**self).items_inserted(positions);
    }

    fn items_removed(&mut self, positions: &[Position]) {
        (**self).items_removed(positions);
    }

    fn items_refreshed(&mut self, positions: &[Position]) {
        (**self).items_refreshed(positions);
    }

    fn item_moved(&mut self, from: Position, to: Position) {
        (**self).item_moved(from, to);
    }

    fn reload_data(&mut self) {
        (**self).reload_data();
    }

    fn content_loaded(&mut self, error: Option<&QueryError>) {
        (**self).content_loaded(error);
    }
}

impl<S: BatchSink + ?Sized> BatchSink for Box<S> {
    fn begin_batch(&mut self, info: &BatchInfo) {
        (**self).begin_batch(info);
    }

    fn end_batch(&mut self) {
        (**self).end_batch();
    }

    fn sections_inserted(&mut self, sections: &[usize]) {
        (**self).sections_inserted(sections);
    }

    fn sections_removed(&mut self, sections: &[usize]) {
        (**self).sections_removed(sections);
    }

    fn items_inserted(&mut self, positions: &[Position]) {
        (**self).items_inserted(positions);
    }

    fn items_removed(&mut self, positions: &[Position]) {
        (**self).items_removed(positions);
    }

    fn items_refreshed(&mut self, positions: &[Position]) {
        (**self).items_refreshed(positions);
    }

    fn item_moved(&mut self, from: Position, to: Position) {
        (**self).item_moved(from, to);
    }

    fn reload_data(&mut self) {
        (**self).reload_data();
    }

    fn content_loaded(&mut self, error: Option<&QueryError>) {
        (**self).content_loaded(error);
    }
}
