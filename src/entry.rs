//! Point-in-time entry snapshots with write-back.

use crate::slot_table::Handle;
use core::fmt;
use std::rc::Rc;

/// Map that can replace the value behind an entry snapshot.
pub trait WriteBack<V> {
    /// Install `value` in a fresh slot for the entry at `handle`. Returns
    /// false when the entry is gone.
    fn write_back(&mut self, handle: Handle, value: Rc<V>) -> bool;
}

/// A live `(key, value)` pair copied out of a map by `entries()`.
///
/// The snapshot is detached from the map except through
/// [`Entry::set_value`], which writes into the backing slot. Holding an
/// `Entry` keeps its value alive.
pub struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: Rc<V>,
    pub(crate) handle: Handle,
}

impl<K, V> Entry<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &Rc<V> {
        &self.value
    }

    /// Replace the value in `map` and in this snapshot.
    ///
    /// Returns the snapshot's previous value. An absent `value` is ignored,
    /// and so is an entry that has since been removed from `map`; both
    /// return `None` and change nothing. Pin status is not affected.
    pub fn set_value<M>(&mut self, map: &mut M, value: impl Into<Option<Rc<V>>>) -> Option<Rc<V>>
    where
        M: WriteBack<V>,
    {
        let value = value.into()?;
        if !map.write_back(self.handle, Rc::clone(&value)) {
            return None;
        }
        Some(core::mem::replace(&mut self.value, value))
    }
}

impl<K: Clone, V> Clone for Entry<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: Rc::clone(&self.value),
            handle: self.handle,
        }
    }
}

/// Entries are equal when they name the same map entry with the same key
/// and the same value allocation.
impl<K: PartialEq, V> PartialEq for Entry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
            && self.key == other.key
            && Rc::ptr_eq(&self.value, &other.value)
    }
}

impl<K: Eq, V> Eq for Entry<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}
