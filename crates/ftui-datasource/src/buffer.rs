#![forbid(unsafe_code)]

//! Append-only buffer for one open batch of change records.
//!
//! # Invariants
//!
//! 1. Records are only accepted while a batch is open.
//! 2. The buffer is non-empty only while open.
//! 3. [`NotificationBuffer::drain`] is all-or-nothing and preserves append order.
//! 4. Draining clears the records but keeps the allocation for the next batch.

use crate::change::ChangeRecord;
use crate::error::ProtocolError;

/// Ordered change records accumulated between begin and end signals.
#[derive(Debug, Default)]
pub struct NotificationBuffer {
    records: Vec<ChangeRecord>,
    open: bool,
}

impl NotificationBuffer {
    /// Create a closed, empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a batch, discarding anything left from a previous one.
    pub fn begin_batch(&mut self) {
        self.records.clear();
        self.open = true;
    }

    /// Append a record to the open batch.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::NotOpen`] if no batch is open.
    pub fn record(&mut self, record: ChangeRecord) -> Result<(), ProtocolError> {
        if !self.open {
            return Err(ProtocolError::NotOpen);
        }
        self.records.push(record);
        Ok(())
    }

    /// Whether a batch is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Number of buffered records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is buffered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Take every buffered record in append order and close the batch.
    pub fn drain(&mut self) -> Vec<ChangeRecord> {
        self.open = false;
        self.records.drain(..).collect()
    }

    /// Close the batch and throw its records away.
    pub fn abort(&mut self) {
        self.open = false;
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    fn inserted(i: usize) -> ChangeRecord {
        ChangeRecord::ItemInserted {
            new: Position::item(i),
        }
    }

    #[test]
    fn starts_closed_and_empty() {
        let buf = NotificationBuffer::new();
        assert!(!buf.is_open());
        assert!(buf.is_empty());
    }

    #[test]
    fn record_outside_batch_is_a_protocol_error() {
        let mut buf = NotificationBuffer::new();
        assert_eq!(buf.record(inserted(0)), Err(ProtocolError::NotOpen));
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_preserves_append_order_and_closes() {
        let mut buf = NotificationBuffer::new();
        buf.begin_batch();
        buf.record(inserted(2)).unwrap();
        buf.record(ChangeRecord::SectionInserted(1)).unwrap();
        buf.record(inserted(0)).unwrap();
        assert_eq!(buf.len(), 3);

        let drained = buf.drain();
        assert_eq!(
            drained,
            vec![inserted(2), ChangeRecord::SectionInserted(1), inserted(0)]
        );
        assert!(!buf.is_open());
        assert!(buf.is_empty());
        assert_eq!(buf.record(inserted(1)), Err(ProtocolError::NotOpen));
    }

    #[test]
    fn begin_resets_leftovers() {
        let mut buf = NotificationBuffer::new();
        buf.begin_batch();
        buf.record(inserted(0)).unwrap();
        buf.begin_batch();
        assert!(buf.is_open());
        assert!(buf.is_empty());
    }

    #[test]
    fn abort_discards_open_batch() {
        let mut buf = NotificationBuffer::new();
        buf.begin_batch();
        buf.record(inserted(0)).unwrap();
        buf.abort();
        assert!(!buf.is_open());
        assert!(buf.drain().is_empty());
    }

    #[test]
    fn drain_of_empty_batch_is_empty() {
        let mut buf = NotificationBuffer::new();
        buf.begin_batch();
        assert!(buf.drain().is_empty());
        assert!(!buf.is_open());
    }

    mod property {
        use super::*;
        use proptest::collection::vec;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn drain_returns_only_the_last_batch(
                stale in vec(0..64usize, 0..8),
                fresh in vec(0..64usize, 0..8),
                aborted in any::<bool>(),
            ) {
                let mut buf = NotificationBuffer::new();
                buf.begin_batch();
                for &i in &stale {
                    buf.record(inserted(i)).unwrap();
                }
                if aborted {
                    buf.abort();
                    prop_assert_eq!(buf.record(inserted(0)), Err(ProtocolError::NotOpen));
                }
                buf.begin_batch();
                for &i in &fresh {
                    buf.record(inserted(i)).unwrap();
                }
                let expected: Vec<ChangeRecord> = fresh.iter().copied().map(inserted).collect();
                prop_assert_eq!(buf.drain(), expected);
                prop_assert!(buf.record(inserted(0)).is_err());
            }
        }
    }
}
