//! Compiled bytecode — the executable form a function takes inside the VM.
//!
//! The bytecode compiler (an external collaborator of this crate) lowers a
//! parsed Wasm function into a flat instruction sequence with resolved
//! branch targets. The interpreter in [`crate::thread`] executes that form
//! directly: no structured control flow remains, `Branch` / `BranchIf`
//! carry absolute instruction indices within the function.

use core::fmt;

/// The four Wasm value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// A runtime value on the operand stack or in a local slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    /// The zero value used to initialize local slots.
    pub fn zero_of(value_type: ValueType) -> Value {
        match value_type {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{v}"),
            Value::I64(v) => write!(f, "i64:{v}"),
            Value::F32(v) => write!(f, "f32:{v}"),
            Value::F64(v) => write!(f, "f64:{v}"),
        }
    }
}

/// One executable instruction.
///
/// Memory instructions carry the static offset immediate from the source
/// load/store; the dynamic address comes off the operand stack and the heap
/// checks the sum with overflow-safe arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    // Constants
    I32Const(i32),
    I64Const(i64),
    F32Const(f32),
    F64Const(f64),

    // Locals
    LocalGet(u32),
    LocalSet(u32),

    // i32 arithmetic and comparison (wrapping where Wasm wraps)
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32Eqz,
    I32LtU,
    I64Add,

    // Memory access; `offset` is the static offset immediate
    I32Load { offset: u32 },
    I32Store { offset: u32 },
    I64Load { offset: u32 },
    I64Store { offset: u32 },
    I32Load8U { offset: u32 },
    I32Store8 { offset: u32 },

    // Memory sizing (page-granular, Wasm protocol)
    CurrentMemory,
    GrowMemory,

    // Control; branch targets are absolute instruction indices
    Branch { target: u32 },
    BranchIf { target: u32 },
    Call { function: u32 },
    Return,
    End,
    Drop,
    Nop,
    Unreachable,
}

/// A function lowered to executable bytecode.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    /// Export or debug name.
    pub name: String,
    /// Parameter types, in order.
    pub params: Vec<ValueType>,
    /// Result type, if the function returns a value.
    pub result: Option<ValueType>,
    /// Declared (non-parameter) locals, zero-initialized on entry.
    pub locals: Vec<ValueType>,
    /// The instruction sequence.
    pub code: Vec<Instruction>,
}

impl CompiledFunction {
    /// True when `args` matches the parameter list in arity and types.
    pub fn accepts(&self, args: &[Value]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| *param == arg.value_type())
    }
}
