//! # Dynamic Margins
//!
//! Margins keyed by vertical ranges, so text can flow around an inline
//! image or card art that only occupies part of the element's height.

/// A half-open vertical interval `[top, bottom)` with a horizontal inset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginRange {
    pub top: f64,
    pub bottom: f64,
    pub inset: f64,
}

impl MarginRange {
    pub fn contains(&self, y: f64) -> bool {
        y >= self.top && y < self.bottom
    }
}

/// Margin ranges for one side of an element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarginRanges {
    ranges: Vec<MarginRange>,
}

impl MarginRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a range. A range with identical bounds replaces the old one;
    /// returns `true` when that happened.
    pub fn insert(&mut self, range: MarginRange) -> bool {
        if let Some(existing) = self
            .ranges
            .iter_mut()
            .find(|r| r.top == range.top && r.bottom == range.bottom)
        {
            *existing = range;
            return true;
        }
        self.ranges.push(range);
        false
    }

    /// Inset of the first range containing `y`.
    pub fn lookup(&self, y: f64) -> Option<f64> {
        self.ranges.iter().find(|r| r.contains(y)).map(|r| r.inset)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Left and right margin ranges of an element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarginTable {
    pub left: MarginRanges,
    pub right: MarginRanges,
}

impl MarginTable {
    /// Left edge at `y`; 0 when no range applies.
    pub fn left_at(&self, y: f64) -> f64 {
        self.left.lookup(y).unwrap_or(0.0)
    }

    /// Right edge at `y`; the element width when no range applies.
    pub fn right_at(&self, y: f64, width: f64) -> f64 {
        self.right.lookup(y).map_or(width, |inset| width - inset)
    }

    /// Usable `(left, right)` for a line spanning `[top, top + height]`.
    ///
    /// Both ends of the line are queried and the tighter edge wins, so a
    /// margin that starts halfway down a glyph still applies to the line.
    pub fn resolve(&self, top: f64, height: f64, width: f64) -> (f64, f64) {
        let bottom = top + height;
        let left = self.left_at(top).max(self.left_at(bottom));
        let right = self.right_at(top, width).min(self.right_at(bottom, width));
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_inside_and_outside() {
        let mut table = MarginTable::default();
        table.left.insert(MarginRange {
            top: 0.0,
            bottom: 100.0,
            inset: 20.0,
        });
        assert_eq!(table.left_at(50.0), 20.0);
        assert_eq!(table.left_at(150.0), 0.0);
        assert_eq!(table.right_at(50.0, 200.0), 200.0);
    }

    #[test]
    fn range_is_half_open() {
        let mut ranges = MarginRanges::new();
        ranges.insert(MarginRange {
            top: 10.0,
            bottom: 20.0,
            inset: 5.0,
        });
        assert_eq!(ranges.lookup(10.0), Some(5.0));
        assert_eq!(ranges.lookup(20.0), None);
    }

    #[test]
    fn duplicate_bounds_replace() {
        let mut ranges = MarginRanges::new();
        assert!(!ranges.insert(MarginRange {
            top: 0.0,
            bottom: 10.0,
            inset: 5.0,
        }));
        assert!(ranges.insert(MarginRange {
            top: 0.0,
            bottom: 10.0,
            inset: 8.0,
        }));
        assert_eq!(ranges.lookup(5.0), Some(8.0));
    }

    #[test]
    fn first_matching_range_wins() {
        let mut ranges = MarginRanges::new();
        ranges.insert(MarginRange {
            top: 0.0,
            bottom: 50.0,
            inset: 4.0,
        });
        ranges.insert(MarginRange {
            top: 0.0,
            bottom: 100.0,
            inset: 9.0,
        });
        assert_eq!(ranges.lookup(25.0), Some(4.0));
        assert_eq!(ranges.lookup(75.0), Some(9.0));
    }

    #[test]
    fn resolve_takes_tighter_edge() {
        let mut table = MarginTable::default();
        table.left.insert(MarginRange {
            top: 10.0,
            bottom: 30.0,
            inset: 15.0,
        });
        table.right.insert(MarginRange {
            top: 0.0,
            bottom: 5.0,
            inset: 40.0,
        });
        // Line from 0 to 12: bottom end hits the left range, top end the right.
        let (left, right) = table.resolve(0.0, 12.0, 100.0);
        assert_eq!(left, 15.0);
        assert_eq!(right, 60.0);
    }
}
