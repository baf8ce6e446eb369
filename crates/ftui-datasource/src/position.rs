#![forbid(unsafe_code)]

//! Item addresses within a sectioned list.

use core::fmt;

/// Location of an item as `(section, index)`.
///
/// Positions are plain values: they carry no reference to the list they came
/// from and are only meaningful against the snapshot the emitting event
/// describes (pre-batch for removals, post-batch for insertions).
///
/// Ordering is lexicographic: section first, then index.
///
/// ```
/// use ftui_datasource::Position;
///
/// let p = Position::new(1, 4);
/// assert_eq!(p.to_string(), "1.4");
/// assert!(Position::item(9) < p);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Section index.
    pub section: usize,
    /// Item index within the section.
    pub index: usize,
}

impl Position {
    /// Create a position from a section and item index.
    #[inline]
    #[must_use]
    pub const fn new(section: usize, index: usize) -> Self {
        Self { section, index }
    }

    /// Position of an item in section 0.
    #[inline]
    #[must_use]
    pub const fn item(index: usize) -> Self {
        Self { section: 0, index }
    }

    /// Same index, moved to another section.
    #[inline]
    #[must_use]
    pub const fn in_section(self, section: usize) -> Self {
        Self {
            section,
            index: self.index,
        }
    }
}

impl From<(usize, usize)> for Position {
    fn from((section, index): (usize, usize)) -> Self {
        Self::new(section, index)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_fields() {
        assert_eq!(Position::new(0, 3), Position::from((0, 3)));
        assert_ne!(Position::new(0, 3), Position::new(1, 3));
    }

    #[test]
    fn ordering_is_section_major() {
        let mut v = vec![
            Position::new(1, 0),
            Position::new(0, 5),
            Position::new(0, 1),
        ];
        v.sort();
        assert_eq!(
            v,
            vec![
                Position::new(0, 1),
                Position::new(0, 5),
                Position::new(1, 0)
            ]
        );
    }

    #[test]
    fn item_shorthand_targets_section_zero() {
        let p = Position::item(7);
        assert_eq!(p.section, 0);
        assert_eq!(p.index, 7);
        assert_eq!(p.in_section(2), Position::new(2, 7));
    }

    #[test]
    fn display_format() {
        assert_eq!(Position::new(2, 10).to_string(), "2.10");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_shape() {
        let json = serde_json::to_string(&Position::new(1, 2)).unwrap();
        assert_eq!(json, r#"{"section":1,"index":2}"#);
    }
}
