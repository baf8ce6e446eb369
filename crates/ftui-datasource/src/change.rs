#![forbid(unsafe_code)]

//! Change records and their classification from backend signals.
//!
//! Backends describe a mutation as a change kind plus whichever positions that
//! kind needs. [`ChangeRecord`] is the classified form: each variant holds
//! exactly the fields its kind can have, so everything downstream of the bridge
//! is an exhaustive match over a closed set.
//!
//! # Invariants
//!
//! 1. [`ChangeRecord::ItemMoved`] always carries both an old and a new position.
//! 2. Section variants never carry an item position.
//! 3. Classification happens once, at the bridge boundary.
//!
//! # Failure Modes
//!
//! | Input | Result |
//! |-------|--------|
//! | Raw kind code outside 1..=4 | [`ClassifyError::UnknownChangeType`] |
//! | Section change of kind move/update | [`ClassifyError::UnexpectedSectionChange`] |
//! | Object change lacking a required position | [`ClassifyError::MissingPosition`] |

use core::fmt;

use crate::error::ClassifyError;
use crate::position::Position;

/// Kind of change reported by a backend.
///
/// Raw codes follow the common results-controller numbering:
/// insert = 1, delete = 2, move = 3, update = 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeType {
    Insert,
    Delete,
    Move,
    Update,
}

impl ChangeType {
    /// Decode a backend's numeric change kind.
    ///
    /// # Errors
    ///
    /// [`ClassifyError::UnknownChangeType`] for any code outside `1..=4`.
    pub fn from_raw(raw: u64) -> Result<Self, ClassifyError> {
        match raw {
            1 => Ok(Self::Insert),
            2 => Ok(Self::Delete),
            3 => Ok(Self::Move),
            4 => Ok(Self::Update),
            other => Err(ClassifyError::UnknownChangeType(other)),
        }
    }

    /// Numeric code for this kind.
    #[must_use]
    pub const fn raw(self) -> u64 {
        match self {
            Self::Insert => 1,
            Self::Delete => 2,
            Self::Move => 3,
            Self::Update => 4,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Move => "move",
            Self::Update => "update",
        })
    }
}

/// Which position of an object change is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectChangeField {
    /// Position before the batch.
    Old,
    /// Position after the batch.
    New,
}

impl fmt::Display for ObjectChangeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Old => "old",
            Self::New => "new",
        })
    }
}

/// One classified mutation of the observed collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeRecord {
    /// A section was inserted at this index (post-batch indexing).
    SectionInserted(usize),
    /// The section at this index was removed (pre-batch indexing).
    SectionRemoved(usize),
    /// An item appeared at `new`.
    ItemInserted { new: Position },
    /// The item at `old` went away.
    ItemRemoved { old: Position },
    /// The item at `old` now lives at `new`.
    ItemMoved { old: Position, new: Position },
    /// The item at `at` changed in place.
    ItemUpdated { at: Position },
}

impl ChangeRecord {
    /// Classify an object-change signal.
    ///
    /// insert → `ItemInserted(new)`, delete → `ItemRemoved(old)`,
    /// move → `ItemMoved(old, new)`, update → `ItemUpdated(old)`.
    /// Positions the kind does not use are ignored.
    ///
    /// # Errors
    ///
    /// [`ClassifyError::MissingPosition`] when a required position is absent.
    pub fn from_object_change(
        kind: ChangeType,
        old: Option<Position>,
        new: Option<Position>,
    ) -> Result<Self, ClassifyError> {
        let require = |pos: Option<Position>, field| {
            pos.ok_or(ClassifyError::MissingPosition { kind, field })
        };
        Ok(match kind {
            ChangeType::Insert => Self::ItemInserted {
                new: require(new, ObjectChangeField::New)?,
            },
            ChangeType::Delete => Self::ItemRemoved {
                old: require(old, ObjectChangeField::Old)?,
            },
            ChangeType::Move => Self::ItemMoved {
                old: require(old, ObjectChangeField::Old)?,
                new: require(new, ObjectChangeField::New)?,
            },
            ChangeType::Update => Self::ItemUpdated {
                at: require(old, ObjectChangeField::Old)?,
            },
        })
    }

    /// Classify a section-change signal.
    ///
    /// # Errors
    ///
    /// [`ClassifyError::UnexpectedSectionChange`] for move and update kinds.
    pub fn from_section_change(kind: ChangeType, section: usize) -> Result<Self, ClassifyError> {
        match kind {
            ChangeType::Insert => Ok(Self::SectionInserted(section)),
            ChangeType::Delete => Ok(Self::SectionRemoved(section)),
            ChangeType::Move | ChangeType::Update => {
                Err(ClassifyError::UnexpectedSectionChange(kind))
            }
        }
    }

    /// In-place update with no structural effect.
    #[inline]
    #[must_use]
    pub const fn is_update(&self) -> bool {
        matches!(self, Self::ItemUpdated { .. })
    }

    /// Changes the shape of the list (anything but an update).
    #[inline]
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        !self.is_update()
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SectionInserted(s) => write!(f, "section+ {s}"),
            Self::SectionRemoved(s) => write!(f, "section- {s}"),
            Self::ItemInserted { new } => write!(f, "item+ {new}"),
            Self::ItemRemoved { old } => write!(f, "item- {old}"),
            Self::ItemMoved { old, new } => write!(f, "item {old} -> {new}"),
            Self::ItemUpdated { at } => write!(f, "item~ {at}"),
        }
    }
}
