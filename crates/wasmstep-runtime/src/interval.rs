//! Half-open byte range `[start, end)`.
//!
//! Observers receive an `Interval` describing the bytes about to change;
//! containment and intersection let them decide whether a write is relevant
//! to a region they watch.

/// A closed-open byte range `[start, end)` with `start <= end`.
///
/// Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    start: usize,
    end: usize,
}

impl Interval {
    /// Create an interval from its start and (exclusive) end offset.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn with_end(start: usize, end: usize) -> Self {
        assert!(start <= end, "interval start must not exceed end");
        Self { start, end }
    }

    /// First byte offset covered by the interval.
    #[inline(always)]
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last byte offset covered by the interval.
    #[inline(always)]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of bytes covered.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True when the interval covers no bytes.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `pos` lies inside the interval.
    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos < self.end
    }

    /// True when the two intervals share at least one byte.
    /// Empty intervals intersect nothing.
    pub fn intersects(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_end_orders() {
        let iv = Interval::with_end(4, 8);
        assert_eq!(iv.start(), 4);
        assert_eq!(iv.end(), 8);
        assert_eq!(iv.len(), 4);
        assert!(!iv.is_empty());
    }

    #[test]
    #[should_panic]
    fn with_end_rejects_reversed() {
        let _ = Interval::with_end(8, 4);
    }

    #[test]
    fn empty_interval() {
        let iv = Interval::with_end(3, 3);
        assert!(iv.is_empty());
        assert_eq!(iv.len(), 0);
        assert!(!iv.contains(3));
    }

    #[test]
    fn contains_is_half_open() {
        let iv = Interval::with_end(2, 6);
        assert!(!iv.contains(1));
        assert!(iv.contains(2));
        assert!(iv.contains(5));
        assert!(!iv.contains(6));
    }

    #[test]
    fn intersects_shared_bytes() {
        let a = Interval::with_end(0, 4);
        let b = Interval::with_end(3, 8);
        let c = Interval::with_end(4, 8);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        // Touching endpoints share no byte in half-open ranges.
        assert!(!a.intersects(&c));
    }

    #[test]
    fn empty_intersects_nothing() {
        let empty = Interval::with_end(2, 2);
        let full = Interval::with_end(0, 8);
        assert!(!empty.intersects(&full));
        assert!(!full.intersects(&empty));
    }
}
