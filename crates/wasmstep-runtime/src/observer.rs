//! Pre-write notification on heap mutations.
//!
//! A debugger attaches an observer to snapshot the bytes a store is about
//! to overwrite, which is what an undo log for reverse execution needs.
//! The callback receives the pre-mutation bytes by value-slice rather than
//! a live reference to the heap, so the observer cannot alias the buffer
//! that is about to be written.

use crate::Interval;

/// Capability to observe typed heap writes before they happen.
///
/// The heap notifies exactly once per successful typed `set` /
/// `set_static_offset`, strictly before the bytes change. Raw byte writes,
/// growth zero-fill, and segment initialization are not observed.
pub trait HeapObserver {
    /// `old_bytes` is the current content of `changed` — the bytes that the
    /// imminent write will replace. `old_bytes.len() == changed.len()`.
    fn pre_changed(&mut self, old_bytes: &[u8], changed: Interval);
}
