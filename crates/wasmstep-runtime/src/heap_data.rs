//! Heap-initialization descriptor — what a module contributes to memory.
//!
//! A module declares an initial heap size and an ordered list of data
//! segments. The heap is zero-filled to `start_size` and the segments are
//! copied in order; later segments overwrite earlier ones on overlap.

use alloc::vec::Vec;

/// An `(offset, bytes)` pair copied into the heap at initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapSegment {
    /// Byte offset into the heap where `data` is placed.
    pub offset: usize,
    /// Raw bytes to copy.
    pub data: Vec<u8>,
}

impl HeapSegment {
    pub fn new(offset: usize, data: Vec<u8>) -> Self {
        Self { offset, data }
    }
}

/// Initial heap size plus ordered data segments.
///
/// A `start_size` of zero means the module declares no heap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeapData {
    /// Initial heap size in bytes.
    pub start_size: usize,
    /// Segments applied in order after zero-fill.
    pub segments: Vec<HeapSegment>,
}

impl HeapData {
    /// Descriptor for a module without a heap.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(start_size: usize, segments: Vec<HeapSegment>) -> Self {
        Self {
            start_size,
            segments,
        }
    }

    /// True when the module declares no heap.
    pub fn is_empty(&self) -> bool {
        self.start_size == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn empty_descriptor() {
        let data = HeapData::empty();
        assert!(data.is_empty());
        assert_eq!(data.start_size, 0);
        assert!(data.segments.is_empty());
    }

    #[test]
    fn sized_descriptor_is_not_empty() {
        let data = HeapData::new(16, vec![HeapSegment::new(4, vec![1, 2, 3, 4])]);
        assert!(!data.is_empty());
        assert_eq!(data.segments[0].offset, 4);
    }
}
