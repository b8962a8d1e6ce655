//! wasmstep — step-granular WebAssembly interpreter core.
//!
//! The crate advances a compiled module one instruction at a time: a
//! [`VmState`] owns a linear memory [`Heap`], an [`InstructionCounter`],
//! and one [`VmThread`], and exposes `step` / `step_debug` /
//! `step_until_finished`. Breakpoint-aware stepping and the pre-write heap
//! observer (see [`wasmstep_runtime`]) are the primitives reverse
//! debugging builds on.

pub mod bytecode;
pub mod counter;
pub mod module;
pub mod thread;
pub mod vm;
pub mod vm_state;

// Re-export key types for convenience
pub use anyhow::{Context, Result};
pub use bytecode::{CompiledFunction, Instruction, Value, ValueType};
pub use counter::InstructionCounter;
pub use module::{heap_data_from_wasm, Module};
pub use thread::VmThread;
pub use vm::Vm;
pub use vm_state::VmState;
pub use wasmstep_runtime::{Heap, HeapData, HeapObserver, HeapSegment, Interval, WasmTrap};

use bytecode::ValueType as Vt;
use wasmstep_runtime::ConstructionError;

/// Errors raised when binding modules or entering functions.
///
/// These are embedder-facing faults; faults of the executing program are
/// traps on the thread instead.
#[derive(Debug, Clone, PartialEq)]
pub enum VmError {
    /// Arguments mismatch the entered function's signature.
    InvalidCallParameters {
        function: String,
        expected: Vec<Vt>,
        got: Vec<Vt>,
    },
    /// Function index outside the module's function table.
    UndefinedFunction { index: usize },
    /// A second module with a non-empty initial heap was offered.
    MultipleHeapModules,
    /// The module's heap data could not seed a heap.
    HeapConstruction(ConstructionError),
}

impl std::fmt::Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VmError::InvalidCallParameters {
                function,
                expected,
                got,
            } => {
                write!(
                    f,
                    "invalid call parameters for '{function}': expected ({}), got ({})",
                    format_types(expected),
                    format_types(got)
                )
            }
            VmError::UndefinedFunction { index } => {
                write!(f, "no function at index {index}")
            }
            VmError::MultipleHeapModules => {
                f.write_str("only one module with heap supported at the moment")
            }
            VmError::HeapConstruction(err) => write!(f, "heap construction failed: {err}"),
        }
    }
}

impl std::error::Error for VmError {}

fn format_types(types: &[Vt]) -> String {
    let names: Vec<String> = types.iter().map(|t| t.to_string()).collect();
    names.join(", ")
}
