//! TwoTierCache: reclaimable storage for every entry, plus a FIFO pin set
//! that shields recently read values from reclamation.
//!
//! Policy
//! - `get` pins what it returns. Values that have not been read recently
//!   are held only softly and are the first to go under pressure.
//! - The pin set is FIFO with duplicates: one push per successful read,
//!   tail dropped past capacity.
//! - Dead entries are reaped lazily. The collector notifies this cache's
//!   queue when a value dies; the queue is drained at the start of `put`,
//!   `put_if_absent`, `remove`, `clear`, `len`, and `entries`. A read that
//!   lands on a cleared slot removes that entry on the spot.

use crate::collector::Collector;
use crate::config::CacheConfig;
use crate::entry::{Entry, WriteBack};
use crate::notifier::ReclaimQueue;
use crate::pin_set::PinSet;
use crate::slot::Slot;
use crate::slot_table::{Handle, SlotTable};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;
use std::rc::Rc;
use tracing::trace;

pub struct TwoTierCache<K, V, S = RandomState> {
    table: SlotTable<K, Slot<V>, S>,
    pins: PinSet<V>,
    notices: ReclaimQueue<V>,
    collector: Collector<V>,
}

impl<K, V> TwoTierCache<K, V>
where
    K: Eq + Hash,
    V: 'static,
{
    /// Cache with the default pin capacity and its own collector.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_collector(Collector::new(), config)
    }

    pub fn with_collector(collector: Collector<V>, config: CacheConfig) -> Self {
        Self::with_collector_and_hasher(collector, config, RandomState::new())
    }
}

impl<K, V> Default for TwoTierCache<K, V>
where
    K: Eq + Hash,
    V: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> TwoTierCache<K, V, S>
where
    K: Eq + Hash,
    V: 'static,
    S: BuildHasher,
{
    pub fn with_collector_and_hasher(collector: Collector<V>, config: CacheConfig, hasher: S) -> Self {
        Self {
            table: SlotTable::with_hasher(hasher),
            pins: PinSet::new(config.pin_capacity),
            notices: ReclaimQueue::new(),
            collector,
        }
    }

    pub fn collector(&self) -> &Collector<V> {
        &self.collector
    }

    pub fn pin_capacity(&self) -> usize {
        self.pins.capacity()
    }

    /// Number of pins held, duplicates included.
    pub fn pinned_len(&self) -> usize {
        self.pins.len()
    }

    /// Whether this exact allocation is currently pinned.
    pub fn is_pinned(&self, value: &Rc<V>) -> bool {
        self.pins.contains(value)
    }

    /// Clear notices delivered but not yet drained.
    pub fn pending_reclaims(&self) -> usize {
        self.notices.pending()
    }

    /// Associate `key` with `value`, replacing any previous entry.
    ///
    /// Returns the previous value if it was still live. An absent `value`
    /// is ignored and leaves the map untouched. The new value is not
    /// pinned.
    pub fn put(&mut self, key: K, value: impl Into<Option<Rc<V>>>) -> Option<Rc<V>> {
        let Some(value) = value.into() else {
            trace!("Ignored put of absent value.");
            return None;
        };
        self.drain();
        self.install(key, value)
    }

    /// Associate `key` with `value` unless it already has a live value,
    /// which is returned instead.
    pub fn put_if_absent(&mut self, key: K, value: impl Into<Option<Rc<V>>>) -> Option<Rc<V>> {
        let value = value.into()?;
        self.drain();
        let existing = self
            .table
            .find(&key)
            .and_then(|h| self.table.value(h))
            .and_then(Slot::get);
        if existing.is_some() {
            return existing;
        }
        self.install(key, value);
        None
    }

    /// Look up `key`, pinning the value on a hit.
    ///
    /// A reclaimed value reads as absent and its entry is removed.
    pub fn get<Q>(&mut self, key: &Q) -> Option<Rc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let handle = self.table.find(key)?;
        match self.table.value(handle).and_then(Slot::get) {
            Some(value) => {
                self.pins.pin(&value);
                Some(value)
            }
            None => {
                self.table.remove(handle);
                trace!("Dropped reclaimed entry on read.");
                None
            }
        }
    }

    /// Whether `key` has a live value. Neither pins nor reaps.
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

    /// Remove `key`, returning its value if it was live.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<Rc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.drain();
        let handle = self.table.find(key)?;
        self.table.remove(handle).and_then(|(_, slot)| slot.get())
    }

    /// Entry count after reaping delivered notices.
    ///
    /// A value that died outside a collection (its soft retention was
    /// released by a budget and its last handle dropped later) is counted
    /// until a budget sweep or the next `collect` reports it.
    pub fn len(&mut self) -> usize {
        self.drain();
        self.table.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Unpin everything and remove every entry.
    pub fn clear(&mut self) {
        self.pins.clear();
        self.drain();
        self.table.clear();
    }

    /// Snapshot of the live entries.
    pub fn entries(&mut self) -> Vec<Entry<K, V>>
    where
        K: Clone,
    {
        self.drain();
        self.table
            .iter()
            .filter_map(|(handle, key, slot)| {
                slot.get().map(|value| Entry {
                    key: key.clone(),
                    value,
                    handle,
                })
            })
            .collect()
    }

    fn install(&mut self, key: K, value: Rc<V>) -> Option<Rc<V>> {
        let slot = Slot::new(&value);
        let (handle, prev) = self.table.upsert(key, slot.clone());
        self.collector
            .track(&value, self.notices.listener(handle, &slot));
        prev.and_then(|s| s.get())
    }

    /// Reap entries whose values the collector reported as reclaimed.
    ///
    /// A notice only reaps its entry if the entry still holds the slot that
    /// was cleared; a later `put` under the same key is left alone.
    fn drain(&mut self) {
        let mut reaped = 0usize;
        while let Some(notice) = self.notices.poll() {
            let current = self
                .table
                .value(notice.handle)
                .is_some_and(|slot| slot.same_as(&notice.slot));
            if current {
                self.table.remove(notice.handle);
                reaped += 1;
            }
        }
        if reaped > 0 {
            trace!(reaped, "Reaped reclaimed entries.");
        }
    }
}

impl<K, V, S> WriteBack<V> for TwoTierCache<K, V, S>
where
    K: Eq + Hash,
    V: 'static,
    S: BuildHasher,
{
    fn write_back(&mut self, handle: Handle, value: Rc<V>) -> bool {
        let slot = Slot::new(&value);
        match self.table.value_mut(handle) {
            Some(current) => *current = slot.clone(),
            None => return false,
        }
        self.collector
            .track(&value, self.notices.listener(handle, &slot));
        true
    }
}

impl<K, V, S> fmt::Debug for TwoTierCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoTierCache")
            .field("pinned", &self.pins.len())
            .field("pin_capacity", &self.pins.capacity())
            .field("pending_reclaims", &self.notices.pending())
            .finish_non_exhaustive()
    }
}
