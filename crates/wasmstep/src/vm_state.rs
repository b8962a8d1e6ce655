//! The VM state: heap, instruction counter, and thread, stepped together.
//!
//! `VmState` owns the three pieces of a running machine and advances them
//! one instruction per `step` call. The counter is pre-incremented on every
//! attempt, even when the thread is already finished, so it records step
//! attempts rather than executed instructions. The thread then borrows the
//! heap mutably for exactly one instruction.

use std::rc::Rc;

use wasmstep_runtime::Heap;

use crate::bytecode::Value;
use crate::counter::InstructionCounter;
use crate::module::Module;
use crate::thread::VmThread;
use crate::vm::Vm;
use crate::VmError;

/// Heap + instruction counter + thread.
#[derive(Debug, Default, PartialEq)]
pub struct VmState {
    heap: Heap,
    instruction_counter: InstructionCounter,
    thread: VmThread,
}

impl VmState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a module's heap contribution to this state.
    ///
    /// A module without heap data is a no-op (call it as often as you
    /// like). A module with heap data seeds the heap — once: offering a
    /// second heap-carrying module fails.
    ///
    /// # Errors
    /// `VmError::MultipleHeapModules` when the heap is already seeded;
    /// `VmError::HeapConstruction` when a segment does not fit.
    pub fn use_module(&mut self, module: &Module) -> Result<(), VmError> {
        if module.heap_data().is_empty() {
            return Ok(());
        }
        if !self.heap.is_empty() {
            return Err(VmError::MultipleHeapModules);
        }
        self.heap = Heap::from_data(module.heap_data()).map_err(VmError::HeapConstruction)?;
        Ok(())
    }

    /// Replace the thread with a fresh one entered at function `index`.
    /// The instruction counter is NOT reset.
    pub fn start_at_function(
        &mut self,
        vm: &Rc<Vm>,
        index: usize,
    ) -> Result<&mut VmThread, VmError> {
        self.start_at_function_with(vm, index, &[])
    }

    /// As [`start_at_function`](Self::start_at_function), pushing the given
    /// arguments.
    pub fn start_at_function_with(
        &mut self,
        vm: &Rc<Vm>,
        index: usize,
        args: &[Value],
    ) -> Result<&mut VmThread, VmError> {
        let mut thread = VmThread::new(vm.clone());
        thread.enter_function(index, args)?;
        self.thread = thread;
        Ok(&mut self.thread)
    }

    /// Advance one instruction. Returns `false` when the thread was
    /// already finished; the counter advances either way.
    pub fn step(&mut self) -> bool {
        self.instruction_counter.increment();
        if !self.thread.finished() {
            self.thread.step(&mut self.heap);
            return true;
        }
        false
    }

    /// As [`step`](Self::step), with breakpoint checking.
    pub fn step_debug(&mut self) -> bool {
        self.instruction_counter.increment();
        if !self.thread.finished() {
            self.thread.step_debug(&mut self.heap);
            return true;
        }
        false
    }

    /// Run until the thread finishes. With `check_breakpoints`, each
    /// iteration uses `step_debug` and stops early on a breakpoint hit.
    pub fn step_until_finished(&mut self, check_breakpoints: bool) {
        if check_breakpoints {
            while !self.thread.finished() {
                self.instruction_counter.increment();
                if self.thread.step_debug(&mut self.heap) {
                    break;
                }
            }
        } else {
            while !self.thread.finished() {
                self.instruction_counter.increment();
                self.thread.step(&mut self.heap);
            }
        }
    }

    pub fn got_trap(&self) -> bool {
        self.thread.got_trap()
    }

    pub fn trap_reason(&self) -> &'static str {
        self.thread.trap_reason()
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn thread(&self) -> &VmThread {
        &self.thread
    }

    pub fn thread_mut(&mut self) -> &mut VmThread {
        &mut self.thread
    }

    pub fn instruction_counter(&self) -> InstructionCounter {
        self.instruction_counter
    }

    /// Restore the counter from a saved value (reverse-debugging rewind).
    pub fn set_instruction_counter(&mut self, counter: InstructionCounter) {
        self.instruction_counter = counter;
    }
}
