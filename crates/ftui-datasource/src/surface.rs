#![forbid(unsafe_code)]

//! Read-through contract of a list surface, and the bridge lifecycle.
//!
//! Every data source answers position lookups against its current snapshot.
//! Query-derived lists are read-only: their contents follow the query, so
//! [`ListSurface::remove_at`] fails with [`DataSourceError::Unsupported`] for
//! every position, including valid ones.

use crate::error::{DataSourceError, QueryError};
use crate::position::Position;

/// Positional read access to a sectioned list.
pub trait ListSurface {
    /// Item type exposed to the UI.
    type Item;

    /// Number of sections.
    fn section_count(&self) -> usize;

    /// Number of items in `section`; zero for a section that does not exist.
    fn item_count(&self, section: usize) -> usize;

    /// Item at `position`.
    ///
    /// # Errors
    ///
    /// [`DataSourceError::OutOfRange`] if the position is not in the snapshot.
    fn item_at(&self, position: Position) -> Result<Self::Item, DataSourceError>;

    /// Every position `item` occupies. Empty when absent.
    fn positions_of(&self, item: &Self::Item) -> Vec<Position>;

    /// First position of `item`, if present.
    fn first_position_of(&self, item: &Self::Item) -> Option<Position> {
        self.positions_of(item).into_iter().next()
    }

    /// Remove the item at `position` on behalf of the user.
    ///
    /// # Errors
    ///
    /// [`DataSourceError::Unsupported`] for lists whose contents are derived
    /// from a query.
    fn remove_at(&mut self, position: Position) -> Result<(), DataSourceError>;

    /// Whether every section is empty.
    fn is_empty(&self) -> bool {
        (0..self.section_count()).all(|section| self.item_count(section) == 0)
    }

    /// Display title, if configured.
    fn title(&self) -> Option<&str> {
        None
    }
}

/// Outcome of a data source's initial fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing fetched yet.
    #[default]
    Initial,
    /// Fetched, with at least one item.
    Loaded,
    /// Fetched, and empty.
    NoContent,
    /// The query failed; the list is left empty.
    Failed(QueryError),
}

impl LoadState {
    /// Whether the initial fetch has finished, successfully or not.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Initial)
    }

    /// The fetch error, if the initial fetch failed.
    #[must_use]
    pub fn error(&self) -> Option<&QueryError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Lifecycle shared by every backend bridge.
///
/// A bridge owns its registration with the backend and must release it on
/// teardown; once torn down it makes no further sink calls, whatever the
/// backend emits. Dropping a bridge tears it down.
pub trait ObservationBridge {
    /// Whether the bridge is still registered with its backend.
    fn is_observing(&self) -> bool;

    /// Unregister from the backend. Idempotent.
    fn teardown(&mut self);

    /// Outcome of the initial fetch.
    fn load_state(&self) -> LoadState;
}

/// Rejection shared by all query-derived lists.
pub(crate) fn unsupported_removal() -> DataSourceError {
    DataSourceError::Unsupported {
        operation: "remove_at",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Vec<char>>);

    impl ListSurface for Fixed {
        type Item = char;

        fn section_count(&self) -> usize {
            self.0.len()
        }

        fn item_count(&self, section: usize) -> usize {
            self.0.get(section).map_or(0, Vec::len)
        }

        fn item_at(&self, position: Position) -> Result<char, DataSourceError> {
            self.0
                .get(position.section)
                .and_then(|s| s.get(position.index))
                .copied()
                .ok_or(DataSourceError::OutOfRange { position })
        }

        fn positions_of(&self, item: &char) -> Vec<Position> {
            self.0
                .iter()
                .enumerate()
                .flat_map(|(s, items)| {
                    items
                        .iter()
                        .enumerate()
                        .filter(move |(_, c)| *c == item)
                        .map(move |(i, _)| Position::new(s, i))
                })
                .collect()
        }

        fn remove_at(&mut self, _position: Position) -> Result<(), DataSourceError> {
            Err(unsupported_removal())
        }
    }

    #[test]
    fn provided_methods() {
        let list = Fixed(vec![vec!['a', 'b'], vec![], vec!['a']]);
        assert_eq!(list.first_position_of(&'a'), Some(Position::new(0, 0)));
        assert_eq!(list.positions_of(&'a').len(), 2);
        assert_eq!(list.first_position_of(&'z'), None);
        assert!(!list.is_empty());
        assert!(Fixed(vec![vec![], vec![]]).is_empty());
        assert_eq!(list.title(), None);
    }

    #[test]
    fn load_state_helpers() {
        assert!(!LoadState::Initial.is_settled());
        assert!(LoadState::NoContent.is_settled());
        let failed = LoadState::Failed(QueryError::new("boom"));
        assert_eq!(failed.error().map(QueryError::message), Some("boom"));
        assert_eq!(LoadState::Loaded.error(), None);
    }
}
