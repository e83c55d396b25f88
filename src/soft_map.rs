//! SoftMap: a map view over reclaimable slots, with no pinning.
//!
//! Cleared slots are only noticed when an operation touches their key
//! (`get`, `remove`, `put_if_absent`) or when `entries` walks the table.
//! `len` is the raw entry count and may include reclaimed entries that
//! nothing has touched yet.

use crate::collector::Collector;
use crate::entry::{Entry, WriteBack};
use crate::slot::Slot;
use crate::slot_table::{Handle, SlotTable};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;
use std::rc::Rc;
use tracing::trace;

pub struct SoftMap<K, V, S = RandomState> {
    table: SlotTable<K, Slot<V>, S>,
    collector: Collector<V>,
}

impl<K, V> SoftMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_collector(Collector::new())
    }

    pub fn with_collector(collector: Collector<V>) -> Self {
        Self::with_collector_and_hasher(collector, RandomState::new())
    }
}

impl<K, V> Default for SoftMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> SoftMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_collector_and_hasher(collector: Collector<V>, hasher: S) -> Self {
        Self {
            table: SlotTable::with_hasher(hasher),
            collector,
        }
    }

    pub fn collector(&self) -> &Collector<V> {
        &self.collector
    }

    /// Associate `key` with `value`, returning the previous live value. An
    /// absent `value` is ignored.
    pub fn put(&mut self, key: K, value: impl Into<Option<Rc<V>>>) -> Option<Rc<V>> {
        let Some(value) = value.into() else {
            trace!("Ignored put of absent value.");
            return None;
        };
        self.install(key, value)
    }

    pub fn put_if_absent(&mut self, key: K, value: impl Into<Option<Rc<V>>>) -> Option<Rc<V>> {
        let value = value.into()?;
        if let Some(handle) = self.table.find(&key) {
            match self.table.value(handle).and_then(Slot::get) {
                Some(existing) => return Some(existing),
                None => {
                    self.table.remove(handle);
                }
            }
        }
        self.install(key, value);
        None
    }

    /// Look up `key`. A reclaimed value reads as absent and its entry is
    /// removed.
    pub fn get<Q>(&mut self, key: &Q) -> Option<Rc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let handle = self.table.find(key)?;
        let value = self.table.value(handle).and_then(Slot::get);
        if value.is_none() {
            self.table.remove(handle);
            trace!("Dropped reclaimed entry on read.");
        }
        value
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table
            .find(key)
            .and_then(|h| self.table.value(h))
            .is_some_and(|slot| !slot.is_cleared())
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<Rc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let handle = self.table.find(key)?;
        self.table.remove(handle).and_then(|(_, slot)| slot.get())
    }

    /// Raw entry count, reclaimed-but-untouched entries included.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Snapshot of the live entries. Entries found cleared along the way
    /// are removed.
    pub fn entries(&mut self) -> Vec<Entry<K, V>>
    where
        K: Clone,
    {
        let mut live = Vec::with_capacity(self.table.len());
        let mut cleared = Vec::new();
        for (handle, key, slot) in self.table.iter() {
            match slot.get() {
                Some(value) => live.push(Entry {
                    key: key.clone(),
                    value,
                    handle,
                }),
                None => cleared.push(handle),
            }
        }
        if !cleared.is_empty() {
            trace!(reaped = cleared.len(), "Dropped reclaimed entries in snapshot.");
            for handle in cleared {
                self.table.remove(handle);
            }
        }
        live
    }

    fn install(&mut self, key: K, value: Rc<V>) -> Option<Rc<V>> {
        let (_, prev) = self.table.upsert(key, Slot::new(&value));
        self.collector.track(&value, None);
        prev.and_then(|s| s.get())
    }
}

impl<K, V, S> WriteBack<V> for SoftMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn write_back(&mut self, handle: Handle, value: Rc<V>) -> bool {
        match self.table.value_mut(handle) {
            Some(current) => *current = Slot::new(&value),
            None => return false,
        }
        self.collector.track(&value, None);
        true
    }
}

impl<K, V, S> fmt::Debug for SoftMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftMap")
            .field("len", &self.table.len())
            .finish_non_exhaustive()
    }
}
