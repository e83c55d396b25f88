//! SlotTable: the structural map behind `TwoTierCache` and `SoftMap`.
//!
//! Entries live in a generational slotmap and a hashbrown `HashTable`
//! indexes them by key hash. Each entry stores its hash, so removal by
//! handle never calls back into `K: Hash`. Handles are generational: once
//! an entry is removed, its handle never resolves again, even if the
//! storage is reused. Reclaim notices rely on that to stay harmless after
//! their entry is gone.

use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_table;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Stable, generational reference to one table entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    fn raw(self) -> DefaultKey {
        self.0
    }
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
}

pub(crate) struct SlotTable<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
    reentrancy: DebugReentrancy,
}

impl<K, V, S> SlotTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::new(),
            slots: SlotMap::with_key(),
            reentrancy: DebugReentrancy::new("slot table"),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn value(&self, handle: Handle) -> Option<&V> {
        self.slots.get(handle.raw()).map(|e| &e.value)
    }

    pub(crate) fn value_mut(&mut self, handle: Handle) -> Option<&mut V> {
        self.slots.get_mut(handle.raw()).map(|e| &mut e.value)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Handle, &K, &V)> {
        self.slots
            .iter()
            .map(|(k, e)| (Handle(k), &e.key, &e.value))
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub(crate) fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(q);
        self.index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .is_some_and(|e| e.key.borrow() == q)
            })
            .map(|&k| Handle(k))
    }

    /// Insert `key -> value`, or replace the value of an existing entry.
    ///
    /// A replaced entry keeps its original key and handle; the previous
    /// value is returned.
    pub(crate) fn upsert(&mut self, key: K, value: V) -> (Handle, Option<V>) {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(&key);
        match self.index.entry(
            hash,
            |&k| self.slots.get(k).is_some_and(|e| e.key == key),
            |&k| self.slots.get(k).map_or(0, |e| e.hash),
        ) {
            hash_table::Entry::Occupied(o) => {
                let k = *o.get();
                let prev = self
                    .slots
                    .get_mut(k)
                    .map(|e| core::mem::replace(&mut e.value, value));
                (Handle(k), prev)
            }
            hash_table::Entry::Vacant(v) => {
                let k = self.slots.insert(Entry { key, value, hash });
                let _ = v.insert(k);
                (Handle(k), None)
            }
        }
    }

    pub(crate) fn remove(&mut self, handle: Handle) -> Option<(K, V)> {
        let _g = self.reentrancy.enter();
        let k = handle.raw();
        let entry = self.slots.remove(k)?;
        if let Ok(o) = self.index.find_entry(entry.hash, |&kk| kk == k) {
            let _ = o.remove();
        }
        Some((entry.key, entry.value))
    }

    pub(crate) fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.index.clear();
        self.slots.clear();
    }
}

impl<K, V, S> Default for SlotTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::hash::Hasher;
    use test_log::test;

    type Table<V> = SlotTable<String, V>;

    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        }
    }

    /// Invariant: upserting an existing key replaces the value in place and
    /// keeps the handle; the table does not grow.
    #[test]
    fn upsert_replaces_in_place() {
        let mut m: Table<i32> = SlotTable::default();
        let (h1, prev) = m.upsert("k".to_string(), 1);
        assert!(prev.is_none());
        let (h2, prev) = m.upsert("k".to_string(), 2);
        assert_eq!(prev, Some(1));
        assert_eq!(h1, h2);
        assert_eq!(m.len(), 1);
        assert_eq!(m.value(h1), Some(&2));
    }

    /// Invariant: borrowed lookup works (store `String`, query with `&str`).
    #[test]
    fn borrowed_lookup_with_str() {
        let mut m: Table<i32> = SlotTable::default();
        m.upsert("hello".to_string(), 1);
        assert!(m.find("hello").is_some());
        assert!(m.find("world").is_none());
    }

    /// Invariant: a removed entry's handle never resolves again, even when
    /// the storage is reused by a later insert.
    #[test]
    fn stale_handle_does_not_alias_new_entry() {
        let mut m: Table<i32> = SlotTable::default();
        let (h1, _) = m.upsert("old".to_string(), 1);
        assert_eq!(m.remove(h1), Some(("old".to_string(), 1)));
        let (h2, _) = m.upsert("new".to_string(), 2);

        assert_ne!(h1, h2, "handles must differ across generations");
        assert!(m.value(h1).is_none());
        assert!(m.remove(h1).is_none());
        assert_eq!(m.len(), 1);
    }

    /// Invariant: `value_mut` writes are observed by later lookups.
    #[test]
    fn value_mut_updates_entry() {
        let mut m: Table<i32> = SlotTable::default();
        let (h, _) = m.upsert("k".to_string(), 10);
        if let Some(v) = m.value_mut(h) {
            *v += 5;
        }
        let found = m.find("k").expect("present");
        assert_eq!(m.value(found), Some(&15));
        assert_eq!(found, h);
    }

    /// Invariant: iteration yields each live entry exactly once.
    #[test]
    fn iteration_yields_live_entries() {
        let mut m: Table<usize> = SlotTable::default();
        for (i, k) in ["a", "b", "c"].iter().enumerate() {
            m.upsert((*k).to_string(), i);
        }
        let (hb, _) = m.upsert("b".to_string(), 9);
        m.remove(hb);

        let seen: BTreeSet<String> = m.iter().map(|(_, k, _)| k.clone()).collect();
        let expected: BTreeSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(seen, expected);
    }

    /// Invariant: lookups and removals stay correct when every key shares a
    /// hash bucket.
    #[test]
    fn collision_handling_with_const_hasher() {
        let mut m: SlotTable<String, i32, ConstBuildHasher> =
            SlotTable::with_hasher(ConstBuildHasher);
        let (ha, _) = m.upsert("a".to_string(), 1);
        let (hb, _) = m.upsert("b".to_string(), 2);
        assert_ne!(ha, hb);

        assert_eq!(m.find("a"), Some(ha));
        assert_eq!(m.find("b"), Some(hb));
        m.remove(ha);
        assert!(m.find("a").is_none());
        assert_eq!(m.find("b"), Some(hb));
    }

    /// Invariant: `clear` empties the table and invalidates all handles.
    #[test]
    fn clear_invalidates_handles() {
        let mut m: Table<i32> = SlotTable::default();
        let (h, _) = m.upsert("a".to_string(), 1);
        m.upsert("b".to_string(), 2);
        m.clear();
        assert_eq!(m.len(), 0);
        assert!(m.value(h).is_none());
        assert!(m.find("a").is_none());
        let (h2, prev) = m.upsert("a".to_string(), 3);
        assert!(prev.is_none());
        assert_ne!(h, h2);
    }

    /// Invariant (debug-only): re-entering the table from `K: Eq` during a
    /// probe panics.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_eq_during_find() {
        struct ReentryKey {
            id: &'static str,
            map: *const SlotTable<ReentryKey, i32, ConstBuildHasher>,
        }
        impl PartialEq for ReentryKey {
            fn eq(&self, other: &Self) -> bool {
                if !other.map.is_null() {
                    // Probe the same table again while it is mid-probe.
                    let m = unsafe { &*other.map };
                    let _ = m.find(self);
                }
                self.id == other.id
            }
        }
        impl Eq for ReentryKey {}
        impl Hash for ReentryKey {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        let mut m: SlotTable<ReentryKey, i32, ConstBuildHasher> =
            SlotTable::with_hasher(ConstBuildHasher);
        m.upsert(
            ReentryKey {
                id: "a",
                map: core::ptr::null(),
            },
            1,
        );

        let query = ReentryKey {
            id: "b",
            map: &m as *const _,
        };
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = m.find(&query);
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }
}
