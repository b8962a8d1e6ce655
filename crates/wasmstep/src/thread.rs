//! The executing thread — call stack, operand stacks, trap state.
//!
//! A `VmThread` holds a shared handle to the [`Vm`] for code lookup and
//! borrows the heap mutably for exactly one instruction at a time. A heap
//! bounds or overflow failure surfaces as the sticky
//! `WasmTrap::OutOfBounds` trap ("memory access out of bounds"); once any
//! trap is set the thread reports `finished()` so driving loops terminate,
//! and further steps are no-ops.

use std::collections::BTreeSet;
use std::rc::Rc;

use wasmstep_runtime::{Heap, WasmResult, WasmTrap, PAGE_SIZE};

use crate::bytecode::{CompiledFunction, Instruction, Value};
use crate::vm::Vm;
use crate::VmError;

/// Maximum call stack depth before `CallStackExhausted`.
pub const MAX_CALL_DEPTH: usize = 1024;

/// One activation record.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Index of the executing function.
    pub function: usize,
    /// Index of the next instruction to execute.
    pub pc: usize,
    locals: Vec<Value>,
    stack: Vec<Value>,
}

impl Frame {
    fn enter(function: usize, func: &CompiledFunction, args: Vec<Value>) -> Self {
        let mut locals = args;
        locals.extend(func.locals.iter().map(|ty| Value::zero_of(*ty)));
        Self {
            function,
            pc: 0,
            locals,
            stack: Vec::new(),
        }
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> WasmResult<Value> {
        self.stack.pop().ok_or(WasmTrap::MalformedBytecode)
    }

    fn pop_i32(&mut self) -> WasmResult<i32> {
        match self.pop()? {
            Value::I32(v) => Ok(v),
            _ => Err(WasmTrap::MalformedBytecode),
        }
    }

    fn pop_i64(&mut self) -> WasmResult<i64> {
        match self.pop()? {
            Value::I64(v) => Ok(v),
            _ => Err(WasmTrap::MalformedBytecode),
        }
    }

    fn local(&self, index: u32) -> WasmResult<Value> {
        self.locals
            .get(index as usize)
            .copied()
            .ok_or(WasmTrap::MalformedBytecode)
    }

    fn set_local(&mut self, index: u32, value: Value) -> WasmResult<()> {
        let slot = self
            .locals
            .get_mut(index as usize)
            .ok_or(WasmTrap::MalformedBytecode)?;
        if slot.value_type() != value.value_type() {
            return Err(WasmTrap::MalformedBytecode);
        }
        *slot = value;
        Ok(())
    }
}

/// The single logical thread of a VM.
///
/// Value-equality compares program state: call stack, trap status, and the
/// final result. The code handle and breakpoint set are identity/debug
/// configuration and do not participate.
#[derive(Debug)]
pub struct VmThread {
    vm: Rc<Vm>,
    frames: Vec<Frame>,
    trap: Option<WasmTrap>,
    result: Option<Value>,
    breakpoints: BTreeSet<(usize, usize)>,
}

impl VmThread {
    pub fn new(vm: Rc<Vm>) -> Self {
        Self {
            vm,
            frames: Vec::new(),
            trap: None,
            result: None,
            breakpoints: BTreeSet::new(),
        }
    }

    /// Prepare a call to function `index` with the given arguments.
    ///
    /// Clears any previous trap, frames, and result.
    ///
    /// # Errors
    /// `VmError::UndefinedFunction` for a bad index;
    /// `VmError::InvalidCallParameters` when `args` mismatches the
    /// function's signature in arity or types.
    pub fn enter_function(&mut self, index: usize, args: &[Value]) -> Result<(), VmError> {
        let func = self
            .vm
            .function(index)
            .ok_or(VmError::UndefinedFunction { index })?;
        if !func.accepts(args) {
            return Err(VmError::InvalidCallParameters {
                function: func.name.clone(),
                expected: func.params.clone(),
                got: args.iter().map(Value::value_type).collect(),
            });
        }
        self.frames = vec![Frame::enter(index, func, args.to_vec())];
        self.trap = None;
        self.result = None;
        Ok(())
    }

    /// True when there is nothing left to execute: the call stack is empty
    /// or a trap is set.
    pub fn finished(&self) -> bool {
        self.trap.is_some() || self.frames.is_empty()
    }

    /// Execute one instruction against `heap`. No-op when finished.
    pub fn step(&mut self, heap: &mut Heap) {
        if self.finished() {
            return;
        }
        if let Err(trap) = self.execute_one(heap) {
            self.trap = Some(trap);
        }
    }

    /// As [`step`](Self::step), additionally reporting whether the thread
    /// now sits at a registered breakpoint.
    pub fn step_debug(&mut self, heap: &mut Heap) -> bool {
        self.step(heap);
        if self.trap.is_some() {
            return false;
        }
        match self.frames.last() {
            Some(frame) => self.breakpoints.contains(&(frame.function, frame.pc)),
            None => false,
        }
    }

    /// True once a trap occurred. Traps are sticky.
    pub fn got_trap(&self) -> bool {
        self.trap.is_some()
    }

    pub fn trap(&self) -> Option<WasmTrap> {
        self.trap
    }

    /// Human-readable trap reason; empty when no trap occurred.
    pub fn trap_reason(&self) -> &'static str {
        match self.trap {
            Some(trap) => trap.reason(),
            None => "",
        }
    }

    /// The value returned by the entered function, once it finished
    /// without trapping.
    pub fn result(&self) -> Option<Value> {
        self.result
    }

    /// Register a breakpoint at `(function index, instruction index)`.
    pub fn add_breakpoint(&mut self, function: usize, pc: usize) {
        self.breakpoints.insert((function, pc));
    }

    pub fn remove_breakpoint(&mut self, function: usize, pc: usize) {
        self.breakpoints.remove(&(function, pc));
    }

    /// Current call stack, innermost frame last.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    fn execute_one(&mut self, heap: &mut Heap) -> WasmResult<()> {
        let Some(frame) = self.frames.last_mut() else {
            return Ok(());
        };
        let func = self
            .vm
            .function(frame.function)
            .ok_or(WasmTrap::UndefinedFunction)?;
        let Some(&instr) = func.code.get(frame.pc) else {
            return Err(WasmTrap::MalformedBytecode);
        };
        frame.pc += 1;

        match instr {
            Instruction::I32Const(v) => frame.push(Value::I32(v)),
            Instruction::I64Const(v) => frame.push(Value::I64(v)),
            Instruction::F32Const(v) => frame.push(Value::F32(v)),
            Instruction::F64Const(v) => frame.push(Value::F64(v)),

            Instruction::LocalGet(index) => {
                let value = frame.local(index)?;
                frame.push(value);
            }
            Instruction::LocalSet(index) => {
                let value = frame.pop()?;
                frame.set_local(index, value)?;
            }

            Instruction::I32Add => {
                let (b, a) = (frame.pop_i32()?, frame.pop_i32()?);
                frame.push(Value::I32(a.wrapping_add(b)));
            }
            Instruction::I32Sub => {
                let (b, a) = (frame.pop_i32()?, frame.pop_i32()?);
                frame.push(Value::I32(a.wrapping_sub(b)));
            }
            Instruction::I32Mul => {
                let (b, a) = (frame.pop_i32()?, frame.pop_i32()?);
                frame.push(Value::I32(a.wrapping_mul(b)));
            }
            Instruction::I32DivS => {
                let (b, a) = (frame.pop_i32()?, frame.pop_i32()?);
                if b == 0 {
                    return Err(WasmTrap::DivisionByZero);
                }
                if a == i32::MIN && b == -1 {
                    return Err(WasmTrap::IntegerOverflow);
                }
                frame.push(Value::I32(a.wrapping_div(b)));
            }
            Instruction::I32Eqz => {
                let v = frame.pop_i32()?;
                frame.push(Value::I32((v == 0) as i32));
            }
            Instruction::I32LtU => {
                let (b, a) = (frame.pop_i32()?, frame.pop_i32()?);
                frame.push(Value::I32(((a as u32) < (b as u32)) as i32));
            }
            Instruction::I64Add => {
                let (b, a) = (frame.pop_i64()?, frame.pop_i64()?);
                frame.push(Value::I64(a.wrapping_add(b)));
            }

            Instruction::I32Load { offset } => {
                let addr = frame.pop_i32()? as u32 as usize;
                let value: i32 = heap.get_static_offset(addr, offset as usize)?;
                frame.push(Value::I32(value));
            }
            Instruction::I32Store { offset } => {
                let value = frame.pop_i32()?;
                let addr = frame.pop_i32()? as u32 as usize;
                heap.set_static_offset(offset as usize, addr, value)?;
            }
            Instruction::I64Load { offset } => {
                let addr = frame.pop_i32()? as u32 as usize;
                let value: i64 = heap.get_static_offset(addr, offset as usize)?;
                frame.push(Value::I64(value));
            }
            Instruction::I64Store { offset } => {
                let value = frame.pop_i64()?;
                let addr = frame.pop_i32()? as u32 as usize;
                heap.set_static_offset(offset as usize, addr, value)?;
            }
            Instruction::I32Load8U { offset } => {
                let addr = frame.pop_i32()? as u32 as usize;
                let value: u8 = heap.get_static_offset(addr, offset as usize)?;
                frame.push(Value::I32(value as i32));
            }
            Instruction::I32Store8 { offset } => {
                let value = frame.pop_i32()?;
                let addr = frame.pop_i32()? as u32 as usize;
                heap.set_static_offset(offset as usize, addr, value as u8)?;
            }

            Instruction::CurrentMemory => {
                frame.push(Value::I32((heap.size() / PAGE_SIZE) as i32));
            }
            Instruction::GrowMemory => {
                let delta = frame.pop_i32()?;
                let old_pages = (heap.size() / PAGE_SIZE) as i32;
                let grown = u32::try_from(delta)
                    .ok()
                    .and_then(|pages| (pages as usize).checked_mul(PAGE_SIZE))
                    .map(|bytes| heap.grow(bytes))
                    .unwrap_or(false);
                frame.push(Value::I32(if grown { old_pages } else { -1 }));
            }

            Instruction::Branch { target } => {
                frame.pc = target as usize;
            }
            Instruction::BranchIf { target } => {
                if frame.pop_i32()? != 0 {
                    frame.pc = target as usize;
                }
            }
            Instruction::Call { function } => {
                self.call(function as usize)?;
            }
            Instruction::Return | Instruction::End => {
                self.ret()?;
            }

            Instruction::Drop => {
                frame.pop()?;
            }
            Instruction::Nop => {}
            Instruction::Unreachable => {
                return Err(WasmTrap::Unreachable);
            }
        }
        Ok(())
    }

    fn call(&mut self, index: usize) -> WasmResult<()> {
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(WasmTrap::CallStackExhausted);
        }
        let func = self.vm.function(index).ok_or(WasmTrap::UndefinedFunction)?;
        let caller = self.frames.last_mut().ok_or(WasmTrap::MalformedBytecode)?;
        let arity = func.params.len();
        if caller.stack.len() < arity {
            return Err(WasmTrap::MalformedBytecode);
        }
        let args = caller.stack.split_off(caller.stack.len() - arity);
        if !func.accepts(&args) {
            return Err(WasmTrap::MalformedBytecode);
        }
        self.frames.push(Frame::enter(index, func, args));
        Ok(())
    }

    fn ret(&mut self) -> WasmResult<()> {
        let mut frame = self.frames.pop().ok_or(WasmTrap::MalformedBytecode)?;
        let func = self
            .vm
            .function(frame.function)
            .ok_or(WasmTrap::UndefinedFunction)?;
        let result = match func.result {
            Some(ty) => {
                let value = frame.pop()?;
                if value.value_type() != ty {
                    return Err(WasmTrap::MalformedBytecode);
                }
                Some(value)
            }
            None => None,
        };
        match self.frames.last_mut() {
            Some(caller) => {
                if let Some(value) = result {
                    caller.push(value);
                }
            }
            None => self.result = result,
        }
        Ok(())
    }
}

impl Default for VmThread {
    fn default() -> Self {
        Self::new(Vm::new(crate::module::Module::new()))
    }
}

impl PartialEq for VmThread {
    fn eq(&self, other: &Self) -> bool {
        self.frames == other.frames
            && self.trap == other.trap
            && self.result == other.result
    }
}
