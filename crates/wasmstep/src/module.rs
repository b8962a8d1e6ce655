//! Module container — heap-initialization data plus a function table.
//!
//! The VM consumes a module through two interfaces: `heap_data()` seeds a
//! fresh `Heap` (see `VmState::use_module`), and the function table is what
//! `VmThread::enter_function` indexes into. Function bodies arrive already
//! compiled; decoding Wasm function bodies is the bytecode compiler's job,
//! not this crate's. What IS decoded here, via `wasmparser`, is the memory
//! declaration and the active data segments of a binary — exactly the part
//! of a `.wasm` file the heap lifecycle needs.

use anyhow::{Context, Result};
use wasmparser::{Parser, Payload};
use wasmstep_runtime::{HeapData, HeapSegment, PAGE_SIZE};

use crate::bytecode::CompiledFunction;

/// A module bound to the VM: initial heap layout and compiled functions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    heap_data: HeapData,
    functions: Vec<CompiledFunction>,
}

impl Module {
    /// A module with no heap and no functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// A module with the given heap layout.
    pub fn with_heap_data(heap_data: HeapData) -> Self {
        Self {
            heap_data,
            functions: Vec::new(),
        }
    }

    /// Append a compiled function, returning its index.
    pub fn add_function(&mut self, function: CompiledFunction) -> usize {
        self.functions.push(function);
        self.functions.len() - 1
    }

    pub fn heap_data(&self) -> &HeapData {
        &self.heap_data
    }

    pub fn function(&self, index: usize) -> Option<&CompiledFunction> {
        self.functions.get(index)
    }

    /// Look up a function index by name.
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    pub fn functions(&self) -> &[CompiledFunction] {
        &self.functions
    }
}

/// Extract the heap-initialization descriptor from a Wasm binary:
/// the memory section's initial page count (times the 64 KiB page size)
/// and every active data segment with its `i32.const` offset.
///
/// Passive data segments (used with `memory.init`) are skipped. Multiple
/// memories are not supported.
pub fn heap_data_from_wasm(wasm_bytes: &[u8]) -> Result<HeapData> {
    let mut start_size = 0usize;
    let mut segments = Vec::new();

    let parser = Parser::new(0);
    for payload in parser.parse_all(wasm_bytes) {
        match payload.context("reading wasm payload")? {
            Payload::MemorySection(reader) => {
                // Wasm MVP: at most one memory (index 0)
                if let Some(mem) = reader.into_iter().next() {
                    let memory_type = mem.context("reading memory type")?;
                    start_size = (memory_type.initial as usize)
                        .checked_mul(PAGE_SIZE)
                        .context("initial memory size overflows")?;
                }
            }

            Payload::DataSection(reader) => {
                for data in reader {
                    let data = data.context("reading data segment")?;
                    if let Some(segment) = parse_data_segment(data)? {
                        segments.push(segment);
                    }
                }
            }

            _ => {}
        }
    }

    Ok(HeapData::new(start_size, segments))
}

/// Parse an active data segment, or return None for passive segments.
fn parse_data_segment(data: wasmparser::Data) -> Result<Option<HeapSegment>> {
    match data.kind {
        wasmparser::DataKind::Active {
            memory_index: 0,
            offset_expr,
        } => {
            let mut reader = offset_expr.get_operators_reader();
            let op = reader.read().context("reading data segment offset")?;
            let offset = match op {
                wasmparser::Operator::I32Const { value } => value as u32 as usize,
                other => anyhow::bail!("data segment offset must be i32.const, got {other:?}"),
            };
            Ok(Some(HeapSegment::new(offset, data.data.to_vec())))
        }
        wasmparser::DataKind::Passive => Ok(None),
        wasmparser::DataKind::Active { memory_index, .. } => {
            anyhow::bail!(
                "multi-memory data segments not supported (memory_index={})",
                memory_index
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Instruction;

    fn nop_function(name: &str) -> CompiledFunction {
        CompiledFunction {
            name: name.to_string(),
            params: vec![],
            result: None,
            locals: vec![],
            code: vec![Instruction::End],
        }
    }

    #[test]
    fn function_lookup_by_name_and_index() {
        let mut module = Module::new();
        let main = module.add_function(nop_function("main"));
        let helper = module.add_function(nop_function("helper"));
        assert_eq!(main, 0);
        assert_eq!(helper, 1);
        assert_eq!(module.function_index("helper"), Some(1));
        assert_eq!(module.function_index("missing"), None);
        assert_eq!(module.function(0).unwrap().name, "main");
        assert!(module.function(2).is_none());
    }

    #[test]
    fn empty_module_has_no_heap() {
        let module = Module::new();
        assert!(module.heap_data().is_empty());
    }

    #[test]
    fn heap_data_from_wat_binary() {
        let wasm = wat::parse_str(
            r#"
            (module
                (memory 1)
                (data (i32.const 4) "\01\02\03\04")
            )
            "#,
        )
        .unwrap();

        let heap_data = heap_data_from_wasm(&wasm).unwrap();
        assert_eq!(heap_data.start_size, PAGE_SIZE);
        assert_eq!(heap_data.segments.len(), 1);
        assert_eq!(heap_data.segments[0].offset, 4);
        assert_eq!(heap_data.segments[0].data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn memoryless_binary_yields_empty_heap_data() {
        let wasm = wat::parse_str("(module)").unwrap();
        let heap_data = heap_data_from_wasm(&wasm).unwrap();
        assert!(heap_data.is_empty());
    }
}
