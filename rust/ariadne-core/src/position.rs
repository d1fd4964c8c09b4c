//! Source ranges as reported by an analysis engine.
//!
//! Lines are 1-based and columns 0-based, the convention most engine
//! front ends use. Protocol points (0-based lines) are converted with
//! [`SourcePosition::from_protocol_point`].

use std::cmp::Ordering;
use std::fmt;

/// Offset value used when an engine does not know a byte offset.
pub const UNKNOWN_OFFSET: i64 = -1;

/// A source range inside one document.
///
/// Ordering and equality only look at the four range coordinates. The URL
/// partitions indexes, so two positions are only ever compared when they
/// belong to the same document.
#[derive(Debug, Clone)]
pub struct SourcePosition {
    pub url: String,
    pub first_line: u32,
    pub first_col: u32,
    pub last_line: u32,
    pub last_col: u32,
    pub first_offset: i64,
    pub last_offset: i64,
}

impl SourcePosition {
    pub fn new(
        url: impl Into<String>,
        first_line: u32,
        first_col: u32,
        last_line: u32,
        last_col: u32,
    ) -> Self {
        Self {
            url: url.into(),
            first_line,
            first_col,
            last_line,
            last_col,
            first_offset: UNKNOWN_OFFSET,
            last_offset: UNKNOWN_OFFSET,
        }
    }

    /// Zero-width position at `(line, col)`.
    pub fn point(url: impl Into<String>, line: u32, col: u32) -> Self {
        Self::new(url, line, col, line, col)
    }

    /// Zero-width position from a protocol point, whose lines are 0-based.
    pub fn from_protocol_point(url: impl Into<String>, line: u32, character: u32) -> Self {
        Self::point(url, line.saturating_add(1), character)
    }

    pub fn with_offsets(mut self, first_offset: i64, last_offset: i64) -> Self {
        self.first_offset = first_offset;
        self.last_offset = last_offset;
        self
    }

    fn key(&self) -> (u32, u32, u32, u32) {
        (self.first_line, self.first_col, self.last_line, self.last_col)
    }

    /// Whether `self` spatially encloses `other` (both ends inclusive).
    pub fn encloses(&self, other: &SourcePosition) -> bool {
        let starts_before = self.first_line < other.first_line
            || (self.first_line == other.first_line && self.first_col <= other.first_col);
        let ends_after = self.last_line > other.last_line
            || (self.last_line == other.last_line && self.last_col >= other.last_col);
        starts_before && ends_after
    }

    pub fn contains_point(&self, line: u32, col: u32) -> bool {
        self.encloses(&SourcePosition::point(self.url.as_str(), line, col))
    }

    pub fn is_point(&self) -> bool {
        self.first_line == self.last_line && self.first_col == self.last_col
    }
}

impl PartialEq for SourcePosition {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for SourcePosition {}

impl PartialOrd for SourcePosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourcePosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl std::hash::Hash for SourcePosition {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:[{}:{}-{}:{}]",
            self.url, self.first_line, self.first_col, self.last_line, self.last_col
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(a: u32, b: u32, c: u32, d: u32) -> SourcePosition {
        SourcePosition::new("file:///a.py", a, b, c, d)
    }

    #[test]
    fn orders_by_start_then_end() {
        let mut positions = vec![pos(2, 0, 2, 5), pos(1, 4, 3, 0), pos(1, 4, 1, 9), pos(1, 0, 9, 0)];
        positions.sort();
        assert_eq!(
            positions,
            vec![pos(1, 0, 9, 0), pos(1, 4, 1, 9), pos(1, 4, 3, 0), pos(2, 0, 2, 5)]
        );
    }

    #[test]
    fn equality_ignores_url_and_offsets() {
        let a = pos(1, 2, 3, 4).with_offsets(10, 20);
        let b = SourcePosition::new("file:///other.py", 1, 2, 3, 4);
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn encloses_is_reflexive_and_not_symmetric() {
        let outer = pos(1, 0, 5, 10);
        let inner = pos(2, 3, 2, 8);
        assert!(outer.encloses(&outer));
        assert!(outer.encloses(&inner));
        assert!(!inner.encloses(&outer));
    }

    #[test]
    fn encloses_checks_last_line_against_the_other_range() {
        // Same last line, other range ends further right.
        assert!(!pos(1, 0, 3, 4).encloses(&pos(2, 0, 3, 6)));
        // Other range ends on a later line.
        assert!(!pos(1, 0, 3, 40).encloses(&pos(2, 0, 4, 0)));
        assert!(pos(1, 0, 4, 0).encloses(&pos(2, 0, 3, 40)));
    }

    #[test]
    fn encloses_lattice_of_overlapping_ranges() {
        let ranges = [
            pos(1, 0, 1, 10),
            pos(1, 2, 1, 6),
            pos(1, 4, 1, 12),
            pos(1, 2, 1, 2),
            pos(2, 0, 2, 0),
        ];
        for a in &ranges {
            for b in &ranges {
                let expected = (a.first_line, a.first_col) <= (b.first_line, b.first_col)
                    && (a.last_line, a.last_col) >= (b.last_line, b.last_col);
                assert_eq!(a.encloses(b), expected, "{a} encloses {b}");
            }
        }
    }

    #[test]
    fn protocol_points_shift_lines_by_one() {
        let p = SourcePosition::from_protocol_point("file:///a.py", 1, 4);
        assert_eq!(p, pos(2, 4, 2, 4));
        assert!(p.is_point());
        assert!(pos(2, 4, 2, 5).contains_point(2, 4));
        assert!(!pos(2, 4, 2, 5).contains_point(2, 6));
    }
}
