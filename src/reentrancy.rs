//! Debug-only reentrancy guard.
//!
//! The slot table calls into user code (`K: Eq/Hash`) while its index is
//! mid-probe, and the collector drops user values (`V: Drop`) while it is
//! sweeping. Either one re-entering the same structure would observe a
//! half-updated state. In debug builds a nested `enter` panics with the
//! name of the structure; in release builds the guard is a zero-sized no-op.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-instance reentrancy tracker. Guard entry-points with
/// `let _g = self.reentrancy.enter();`.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    depth: Cell<u32>,
    #[cfg(debug_assertions)]
    name: &'static str,
    // Rc-style single-threaded marker.
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    #[allow(unused_variables)]
    pub(crate) const fn new(name: &'static str) -> Self {
        Self {
            #[cfg(debug_assertions)]
            depth: Cell::new(0),
            #[cfg(debug_assertions)]
            name,
            _nosend: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let d = self.depth.get();
            assert!(d == 0, "reentrancy detected: nested entry into {}", self.name);
            self.depth.set(d + 1);
            ReentrancyGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            ReentrancyGuard { _z: PhantomData }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_entered(&self) -> bool {
        #[cfg(debug_assertions)]
        {
            self.depth.get() > 0
        }
        #[cfg(not(debug_assertions))]
        {
            false
        }
    }
}

/// RAII guard returned by [`DebugReentrancy::enter`].
pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let d = self.owner.depth.get();
            debug_assert!(d > 0);
            self.owner.depth.set(d - 1);
        }
    }
}
