//! The VM — the immutable code container threads execute against.
//!
//! A `Vm` wraps a bound [`Module`] and is shared as `Rc<Vm>`: every
//! `VmThread` keeps a non-owning handle for code lookup while the heap and
//! counter live in `VmState`. The core is single-threaded, so `Rc` (not
//! `Arc`) is the right sharing primitive.

use std::rc::Rc;

use crate::bytecode::CompiledFunction;
use crate::module::Module;

/// Executable code for one bound module.
#[derive(Debug, Default, PartialEq)]
pub struct Vm {
    module: Module,
}

impl Vm {
    pub fn new(module: Module) -> Rc<Self> {
        Rc::new(Self { module })
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn function(&self, index: usize) -> Option<&CompiledFunction> {
        self.module.function(index)
    }
}
