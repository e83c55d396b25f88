//! PinSet: strong handles to recently read values.

use std::collections::VecDeque;
use std::rc::Rc;
use tracing::trace;

/// Fixed-capacity FIFO of strong handles, most recent read at the head.
///
/// A value read twice is pinned twice. Deduplicating would need a scan or
/// an auxiliary index per read; duplicates instead cost at most `capacity`
/// extra handles.
pub(crate) struct PinSet<V> {
    pins: VecDeque<Rc<V>>,
    capacity: usize,
}

impl<V> PinSet<V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            pins: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.pins.len()
    }

    /// Push `value` at the head and drop the tail past capacity.
    pub(crate) fn pin(&mut self, value: &Rc<V>) {
        if self.capacity == 0 {
            return;
        }
        self.pins.push_front(Rc::clone(value));
        if self.pins.len() > self.capacity {
            self.pins.pop_back();
            trace!(capacity = self.capacity, "Unpinned oldest value.");
        }
    }

    pub(crate) fn contains(&self, value: &Rc<V>) -> bool {
        self.pins.iter().any(|p| Rc::ptr_eq(p, value))
    }

    pub(crate) fn clear(&mut self) {
        self.pins.clear();
    }
}
