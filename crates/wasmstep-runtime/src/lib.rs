//! `wasmstep-runtime` — linear memory core for the wasmstep interpreter.
//!
//! This crate is `#![no_std]` (plus `alloc`). It provides:
//! - [`Heap`] — growable, size-capped linear memory with overflow-safe
//!   typed access and initialization from data segments
//! - [`Interval`] / [`HeapObserver`] — pre-write notification on a byte range
//! - [`WasmTrap`] / [`WasmResult`] for Wasm trap handling
//! - [`ByteInputStream`] / [`ByteOutputStream`] for heap state snapshots

#![no_std]

extern crate alloc;

/// WebAssembly page size: 64 KiB per the Wasm specification.
pub const PAGE_SIZE: usize = 65536;

/// Upper bound on heap size in bytes: 1 GiB.
pub const MAX_HEAP_SIZE: usize = 1073741824;

mod heap;
pub use heap::{Heap, HeapError, HeapValue};

mod heap_data;
pub use heap_data::{HeapData, HeapSegment};

mod interval;
pub use interval::Interval;

mod observer;
pub use observer::HeapObserver;

mod stream;
pub use stream::{ByteInputStream, ByteOutputStream, StreamError};

/// Wasm execution errors — sticky runtime faults, no panics, no unwinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasmTrap {
    /// Memory access out of bounds (includes address-computation overflow).
    OutOfBounds,
    /// Integer division by zero.
    DivisionByZero,
    /// Integer overflow (e.g. `i32.div_s` on `i32::MIN / -1`).
    IntegerOverflow,
    /// Unreachable instruction executed.
    Unreachable,
    /// Call depth limit exceeded.
    CallStackExhausted,
    /// Call to a function index outside the module's function table.
    UndefinedFunction,
    /// The interpreter hit ill-formed bytecode (operand stack underflow,
    /// bad local index, branch target past the end of the function).
    MalformedBytecode,
}

impl WasmTrap {
    /// Human-readable trap reason, stable across releases.
    pub fn reason(&self) -> &'static str {
        match self {
            WasmTrap::OutOfBounds => "memory access out of bounds",
            WasmTrap::DivisionByZero => "integer division by zero",
            WasmTrap::IntegerOverflow => "integer overflow",
            WasmTrap::Unreachable => "unreachable instruction executed",
            WasmTrap::CallStackExhausted => "call stack exhausted",
            WasmTrap::UndefinedFunction => "undefined function",
            WasmTrap::MalformedBytecode => "malformed bytecode",
        }
    }
}

impl core::fmt::Display for WasmTrap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.reason())
    }
}

/// Result type for Wasm operations — `Result<T, WasmTrap>`.
pub type WasmResult<T> = Result<T, WasmTrap>;

/// Errors that occur while constructing a [`Heap`].
///
/// These are programming errors in the embedder, not runtime Wasm traps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionError {
    /// Requested size exceeds [`MAX_HEAP_SIZE`].
    SizeExceedsMax { size: usize, max: usize },
    /// A data segment does not fit inside the initial heap size.
    SegmentOutOfRange {
        offset: usize,
        len: usize,
        heap_size: usize,
    },
}

impl core::fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConstructionError::SizeExceedsMax { size, max } => {
                write!(f, "heap size {size} exceeds maximum {max}")
            }
            ConstructionError::SegmentOutOfRange {
                offset,
                len,
                heap_size,
            } => {
                write!(
                    f,
                    "segment at offset {offset} with length {len} does not fit in heap of size {heap_size}"
                )
            }
        }
    }
}
