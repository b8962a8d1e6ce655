//! Monotone instruction counter — the timestamp reverse debugging keys on.

use core::fmt;

/// Counts step attempts. Pre-incremented on every `VmState::step` /
/// `step_debug` call, including calls where the thread is already
/// finished, so the counter advances even when nothing executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstructionCounter(u64);

impl InstructionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a counter from a saved value (reverse-debugging rewind).
    pub fn from_value(value: u64) -> Self {
        Self(value)
    }

    #[inline(always)]
    pub fn increment(&mut self) {
        self.0 += 1;
    }

    #[inline(always)]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstructionCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
