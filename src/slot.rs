//! Slot: a weak holder for one reclaimable value.

use std::fmt;
use std::rc::{Rc, Weak};

/// A weak handle to a value owned elsewhere.
///
/// A slot never keeps its value alive. Once the last strong holder (the
/// collector's soft retention, a pin, or a caller) lets go, the slot reads
/// as cleared from then on; it cannot become occupied again.
pub struct Slot<V> {
    value: Weak<V>,
}

impl<V> Slot<V> {
    pub fn new(value: &Rc<V>) -> Self {
        Self {
            value: Rc::downgrade(value),
        }
    }

    /// The value, or `None` once it has been reclaimed.
    pub fn get(&self) -> Option<Rc<V>> {
        self.value.upgrade()
    }

    pub fn is_cleared(&self) -> bool {
        self.value.strong_count() == 0
    }

    /// True when both refer to the same allocation, cleared or not.
    pub fn same_as(&self, other: &Weak<V>) -> bool {
        Weak::ptr_eq(&self.value, other)
    }

    pub(crate) fn downgrade(&self) -> Weak<V> {
        self.value.clone()
    }
}

impl<V> Clone for Slot<V> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<V> fmt::Debug for Slot<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_cleared() {
            f.write_str("Slot(cleared)")
        } else {
            f.write_str("Slot(occupied)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn clears_when_last_strong_holder_drops() {
        let v = Rc::new(7);
        let slot = Slot::new(&v);
        assert_eq!(slot.get().as_deref(), Some(&7));
        assert!(!slot.is_cleared());

        drop(v);
        assert!(slot.is_cleared());
        assert!(slot.get().is_none());
    }

    #[test]
    fn identity_survives_clearing() {
        let v = Rc::new("x".to_string());
        let slot = Slot::new(&v);
        let weak = Rc::downgrade(&v);
        let other = Rc::new("x".to_string());

        assert!(slot.same_as(&weak));
        assert!(!slot.same_as(&Rc::downgrade(&other)));

        drop(v);
        assert!(slot.same_as(&weak), "identity must not depend on liveness");
    }
}
