#![forbid(unsafe_code)]

//! Replays a drained batch of change records into a [`BatchSink`].
//!
//! # Invariants
//!
//! 1. An empty batch touches nothing: no `begin_batch`, no `end_batch`.
//! 2. A non-empty batch produces exactly one `begin_batch` first and one
//!    `end_batch` last.
//! 3. Records are replayed in arrival order. Section and item changes are
//!    never reordered or coalesced; a remove followed by an insert stays two
//!    calls even when it describes one logical move.
//! 4. The refresh-only flag is true iff the batch is non-empty and every
//!    record is an in-place update.

use crate::change::ChangeRecord;
use crate::sink::{BatchInfo, BatchSink};

/// Whether `records` form a refresh-only batch.
///
/// An empty slice is not a batch at all, so it is not refresh-only.
#[must_use]
pub fn is_refresh_only(records: &[ChangeRecord]) -> bool {
    !records.is_empty() && records.iter().all(ChangeRecord::is_update)
}

/// Stateless translator from change records to sink calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchTranslator;

impl BatchTranslator {
    /// Create a translator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Deliver `records` to `sink` as one batch.
    ///
    /// Returns the batch summary, or `None` when `records` is empty and the
    /// sink was left untouched.
    pub fn translate<S>(&self, records: &[ChangeRecord], sink: &mut S) -> Option<BatchInfo>
    where
        S: BatchSink + ?Sized,
    {
        if records.is_empty() {
            return None;
        }

        let info = BatchInfo {
            len: records.len(),
            refresh_only: is_refresh_only(records),
        };

        let _span = tracing::debug_span!(
            "translate_batch",
            len = info.len,
            refresh_only = info.refresh_only
        )
        .entered();

        sink.begin_batch(&info);
        for record in records {
            match *record {
                ChangeRecord::SectionInserted(section) => sink.sections_inserted(&[section]),
                ChangeRecord::SectionRemoved(section) => sink.sections_removed(&[section]),
                ChangeRecord::ItemInserted { new } => sink.items_inserted(&[new]),
                ChangeRecord::ItemRemoved { old } => sink.items_removed(&[old]),
                ChangeRecord::ItemMoved { old, new } => sink.item_moved(old, new),
                ChangeRecord::ItemUpdated { at } => sink.items_refreshed(&[at]),
            }
        }
        sink.end_batch();

        Some(info)
    }
}
