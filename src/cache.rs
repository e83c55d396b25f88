//! Cache facade: `cache` / `get_cached` over any reclaimable map.

use crate::collector::Collector;
use crate::soft_map::SoftMap;
use crate::two_tier::TwoTierCache;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::rc::Rc;

/// Write-once cache contract.
///
/// `cache` never replaces a live value. `get_cached` returns whatever the
/// backing container still holds; a miss does not say whether the value was
/// never cached or has been reclaimed.
pub trait Cache<K, V> {
    fn cache(&mut self, key: K, value: Rc<V>);

    fn get_cached(&mut self, key: &K) -> Option<Rc<V>>;
}

impl<K, V, S> Cache<K, V> for TwoTierCache<K, V, S>
where
    K: Eq + Hash,
    V: 'static,
    S: BuildHasher,
{
    fn cache(&mut self, key: K, value: Rc<V>) {
        self.put_if_absent(key, value);
    }

    fn get_cached(&mut self, key: &K) -> Option<Rc<V>> {
        self.get(key)
    }
}

impl<K, V, S> Cache<K, V> for SoftMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn cache(&mut self, key: K, value: Rc<V>) {
        self.put_if_absent(key, value);
    }

    fn get_cached(&mut self, key: &K) -> Option<Rc<V>> {
        self.get(key)
    }
}

/// Ready-made cache over a [`SoftMap`].
pub struct SoftCache<K, V> {
    values: SoftMap<K, V>,
}

impl<K, V> SoftCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            values: SoftMap::new(),
        }
    }

    pub fn with_collector(collector: Collector<V>) -> Self {
        Self {
            values: SoftMap::with_collector(collector),
        }
    }

    pub fn collector(&self) -> &Collector<V> {
        self.values.collector()
    }
}

impl<K, V> Default for SoftCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for SoftCache<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftCache").field("values", &self.values).finish()
    }
}

impl<K, V> Cache<K, V> for SoftCache<K, V>
where
    K: Eq + Hash,
{
    fn cache(&mut self, key: K, value: Rc<V>) {
        self.values.cache(key, value);
    }

    fn get_cached(&mut self, key: &K) -> Option<Rc<V>> {
        self.values.get_cached(key)
    }
}
