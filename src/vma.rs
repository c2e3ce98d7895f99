//! Virtual-memory-address intervals and interval sets.
//!
//! Every scope in a recovered structure tree carries a [`VmaIntervalSet`]
//! describing the machine code it represents. The set is a plain value type —
//! a sorted sequence of disjoint half-open `[begin, end)` ranges — and supports
//! the three operations structure recovery needs: insertion (with coalescing of
//! touching ranges), erasure of a sub-range (used when code is relocated out of
//! a procedure), and union-merge of two sets (used when duplicate statements
//! are coalesced).

use std::fmt;

/// A virtual memory address.
pub type Vma = u64;

/// A half-open address range `[begin, end)`.
///
/// An interval is never empty: `begin < end` is asserted at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VmaInterval {
    begin: Vma,
    end: Vma,
}

impl VmaInterval {
    /// Creates a new interval covering `[begin, end)`.
    ///
    /// # Panics
    ///
    /// Panics if `end <= begin`; an inverted or empty range indicates corrupted
    /// binary-analysis input and is treated as unrecoverable.
    #[must_use]
    pub fn new(begin: Vma, end: Vma) -> Self {
        assert!(begin < end, "invalid VMA interval [{begin:#x}, {end:#x})");
        Self { begin, end }
    }

    /// Returns the inclusive lower bound.
    #[must_use]
    #[inline]
    pub const fn begin(&self) -> Vma {
        self.begin
    }

    /// Returns the exclusive upper bound.
    #[must_use]
    #[inline]
    pub const fn end(&self) -> Vma {
        self.end
    }

    /// Returns the number of addresses covered.
    #[must_use]
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.begin
    }

    /// Returns `true` if `vma` lies inside this interval.
    #[must_use]
    #[inline]
    pub const fn contains(&self, vma: Vma) -> bool {
        self.begin <= vma && vma < self.end
    }

    /// Returns `true` if the two intervals share at least one address.
    #[must_use]
    #[inline]
    pub const fn overlaps(&self, other: &VmaInterval) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// Returns `true` if the intervals overlap or are directly adjacent, i.e.
    /// their union is itself a single interval.
    #[must_use]
    #[inline]
    const fn touches(&self, other: &VmaInterval) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }
}

impl fmt::Display for VmaInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}-{:#x})", self.begin, self.end)
    }
}

/// A set of disjoint, sorted [`VmaInterval`]s.
///
/// This is the ownership-free value type threading through every scope node.
/// All mutating operations preserve the two representation invariants: the
/// intervals are sorted by `begin`, and no two intervals touch (touching
/// intervals are coalesced on insertion).
///
/// # Examples
///
/// ```rust
/// use binscope::vma::VmaIntervalSet;
///
/// let mut set = VmaIntervalSet::new();
/// set.insert(0x1000, 0x1010);
/// set.insert(0x1010, 0x1020); // adjacent: coalesced
/// assert_eq!(set.interval_count(), 1);
///
/// set.erase(0x1004, 0x1008); // splits the range
/// assert_eq!(set.interval_count(), 2);
/// assert!(set.contains(0x1002));
/// assert!(!set.contains(0x1004));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmaIntervalSet {
    intervals: Vec<VmaInterval>,
}

impl VmaIntervalSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    /// Creates a set containing the single interval `[begin, end)`.
    ///
    /// # Panics
    ///
    /// Panics if `end <= begin`.
    #[must_use]
    pub fn from_range(begin: Vma, end: Vma) -> Self {
        Self {
            intervals: vec![VmaInterval::new(begin, end)],
        }
    }

    /// Returns `true` if the set covers no addresses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Returns the number of disjoint intervals in the set.
    #[must_use]
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// Returns the total number of addresses covered.
    #[must_use]
    pub fn coverage(&self) -> u64 {
        self.intervals.iter().map(VmaInterval::len).sum()
    }

    /// Returns the smallest single interval containing every member interval,
    /// or `None` if the set is empty.
    #[must_use]
    pub fn span(&self) -> Option<VmaInterval> {
        match (self.intervals.first(), self.intervals.last()) {
            (Some(first), Some(last)) => Some(VmaInterval::new(first.begin, last.end)),
            _ => None,
        }
    }

    /// Returns `true` if `vma` is covered by some interval in the set.
    #[must_use]
    pub fn contains(&self, vma: Vma) -> bool {
        self.intervals
            .binary_search_by(|iv| {
                if iv.contains(vma) {
                    std::cmp::Ordering::Equal
                } else if iv.end <= vma {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Greater
                }
            })
            .is_ok()
    }

    /// Returns `true` if any interval of `self` shares an address with any
    /// interval of `other`.
    #[must_use]
    pub fn overlaps(&self, other: &VmaIntervalSet) -> bool {
        // Linear merge walk over the two sorted sequences.
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let a = &self.intervals[i];
            let b = &other.intervals[j];
            if a.overlaps(b) {
                return true;
            }
            if a.end <= b.begin {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    /// Inserts `[begin, end)`, coalescing with any overlapping or adjacent
    /// intervals already present.
    ///
    /// # Panics
    ///
    /// Panics if `end <= begin`.
    pub fn insert(&mut self, begin: Vma, end: Vma) {
        let mut new = VmaInterval::new(begin, end);

        // Position of the first interval that could touch the new one.
        let start = self.intervals.partition_point(|iv| iv.end < new.begin);
        let mut stop = start;
        while stop < self.intervals.len() && self.intervals[stop].touches(&new) {
            new.begin = new.begin.min(self.intervals[stop].begin);
            new.end = new.end.max(self.intervals[stop].end);
            stop += 1;
        }
        self.intervals.splice(start..stop, std::iter::once(new));
    }

    /// Erases the addresses in `[begin, end)` from the set, splitting any
    /// interval that partially overlaps the erased range.
    ///
    /// Addresses of the erased range not present in the set are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `end <= begin`.
    pub fn erase(&mut self, begin: Vma, end: Vma) {
        assert!(begin < end, "invalid VMA erase range [{begin:#x}, {end:#x})");

        let start = self.intervals.partition_point(|iv| iv.end <= begin);
        let mut replacement: Vec<VmaInterval> = Vec::new();
        let mut stop = start;
        while stop < self.intervals.len() && self.intervals[stop].begin < end {
            let iv = self.intervals[stop];
            if iv.begin < begin {
                replacement.push(VmaInterval::new(iv.begin, begin));
            }
            if end < iv.end {
                replacement.push(VmaInterval::new(end, iv.end));
            }
            stop += 1;
        }
        self.intervals.splice(start..stop, replacement);
    }

    /// Unions every interval of `other` into `self` (`other` is unchanged).
    pub fn merge(&mut self, other: &VmaIntervalSet) {
        for iv in &other.intervals {
            self.insert(iv.begin, iv.end);
        }
    }

    /// Iterates over the disjoint intervals in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = &VmaInterval> {
        self.intervals.iter()
    }
}

impl fmt::Display for VmaIntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, iv) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{iv}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_basics() {
        let iv = VmaInterval::new(0x100, 0x200);
        assert_eq!(iv.len(), 0x100);
        assert!(iv.contains(0x100));
        assert!(iv.contains(0x1ff));
        assert!(!iv.contains(0x200));
    }

    #[test]
    #[should_panic(expected = "invalid VMA interval")]
    fn test_interval_inverted_panics() {
        let _ = VmaInterval::new(0x200, 0x100);
    }

    #[test]
    fn test_insert_disjoint() {
        let mut set = VmaIntervalSet::new();
        set.insert(0x300, 0x400);
        set.insert(0x100, 0x200);
        assert_eq!(set.interval_count(), 2);
        assert_eq!(set.coverage(), 0x200);
        let begins: Vec<Vma> = set.iter().map(|iv| iv.begin()).collect();
        assert_eq!(begins, vec![0x100, 0x300]);
    }

    #[test]
    fn test_insert_coalesces_adjacent() {
        let mut set = VmaIntervalSet::new();
        set.insert(0x100, 0x200);
        set.insert(0x200, 0x300);
        assert_eq!(set.interval_count(), 1);
        assert_eq!(set.span().unwrap(), VmaInterval::new(0x100, 0x300));
    }

    #[test]
    fn test_insert_coalesces_overlapping_span() {
        let mut set = VmaIntervalSet::new();
        set.insert(0x100, 0x180);
        set.insert(0x200, 0x280);
        set.insert(0x300, 0x380);
        // Bridges all three.
        set.insert(0x150, 0x350);
        assert_eq!(set.interval_count(), 1);
        assert_eq!(set.span().unwrap(), VmaInterval::new(0x100, 0x380));
    }

    #[test]
    fn test_erase_middle_splits() {
        let mut set = VmaIntervalSet::from_range(0x100, 0x200);
        set.erase(0x140, 0x160);
        assert_eq!(set.interval_count(), 2);
        assert!(set.contains(0x13f));
        assert!(!set.contains(0x140));
        assert!(!set.contains(0x15f));
        assert!(set.contains(0x160));
    }

    #[test]
    fn test_erase_whole_and_partial() {
        let mut set = VmaIntervalSet::new();
        set.insert(0x100, 0x200);
        set.insert(0x300, 0x400);
        set.erase(0x180, 0x380);
        assert_eq!(set.interval_count(), 2);
        assert_eq!(set.coverage(), 0x80 + 0x80);
    }

    #[test]
    fn test_erase_untouched_range_is_noop() {
        let mut set = VmaIntervalSet::from_range(0x100, 0x200);
        let before = set.clone();
        set.erase(0x400, 0x500);
        assert_eq!(set, before);
    }

    #[test]
    fn test_merge_is_union() {
        let mut a = VmaIntervalSet::from_range(0x100, 0x200);
        let mut b = VmaIntervalSet::from_range(0x180, 0x280);
        b.insert(0x400, 0x500);
        a.merge(&b);
        assert_eq!(a.interval_count(), 2);
        assert_eq!(a.coverage(), 0x180 + 0x100);
    }

    #[test]
    fn test_overlaps() {
        let a = VmaIntervalSet::from_range(0x100, 0x200);
        let b = VmaIntervalSet::from_range(0x1ff, 0x280);
        let c = VmaIntervalSet::from_range(0x200, 0x280);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&VmaIntervalSet::new()));
    }

    #[test]
    fn test_contains_binary_search() {
        let mut set = VmaIntervalSet::new();
        for i in 0..16u64 {
            set.insert(i * 0x100, i * 0x100 + 0x10);
        }
        assert!(set.contains(0x700));
        assert!(set.contains(0x70f));
        assert!(!set.contains(0x710));
    }
}
