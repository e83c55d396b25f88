//! ReclaimQueue: clear notices from the collector to one cache.

use crate::collector::Listener;
use crate::slot::Slot;
use crate::slot_table::Handle;
use core::cell::RefCell;
use hashbrown::HashSet;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// A value behind `handle`'s slot was reclaimed.
pub(crate) struct Notice<V> {
    pub(crate) handle: Handle,
    pub(crate) slot: Weak<V>,
}

struct Inner<V> {
    notices: VecDeque<Notice<V>>,
    // (entry, allocation) pairs with a listener that has not fired yet.
    armed: HashSet<(Handle, usize)>,
}

/// Queue the collector pushes notices into and the cache polls.
///
/// Listeners hold the queue weakly: a dropped cache leaves nothing behind
/// for its pending listeners to grow. At most one listener is armed per
/// entry and allocation, so storing the same value again does not stack
/// listeners or notices.
pub(crate) struct ReclaimQueue<V> {
    inner: Rc<RefCell<Inner<V>>>,
}

impl<V> ReclaimQueue<V> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                notices: VecDeque::new(),
                armed: HashSet::new(),
            })),
        }
    }

    /// Non-blocking poll.
    pub(crate) fn poll(&self) -> Option<Notice<V>> {
        self.inner.borrow_mut().notices.pop_front()
    }

    pub(crate) fn pending(&self) -> usize {
        self.inner.borrow().notices.len()
    }

    #[cfg(test)]
    fn armed(&self) -> usize {
        self.inner.borrow().armed.len()
    }
}

impl<V: 'static> ReclaimQueue<V> {
    /// Listener that reports `slot` of the entry at `handle` as cleared.
    ///
    /// Returns `None` when one is already armed for the same entry and
    /// allocation.
    pub(crate) fn listener(&self, handle: Handle, slot: &Slot<V>) -> Option<Listener> {
        let slot = slot.downgrade();
        let armed = (handle, slot.as_ptr() as usize);
        if !self.inner.borrow_mut().armed.insert(armed) {
            return None;
        }
        let inner = Rc::downgrade(&self.inner);
        Some(Box::new(move || {
            if let Some(inner) = inner.upgrade() {
                let mut inner = inner.borrow_mut();
                inner.armed.remove(&armed);
                inner.notices.push_back(Notice { handle, slot });
            }
        }))
    }
}
