//! Collector: an explicit, deterministic stand-in for a garbage collector
//! that clears soft references under memory pressure.
//!
//! Containers store only [`Slot`](crate::Slot)s (weak handles). Whatever
//! keeps a value alive lives elsewhere:
//! - soft retention: the collector holds one strong handle per tracked
//!   value, so values survive while memory is plentiful;
//! - pins and callers: any other `Rc` the program still holds.
//!
//! Memory pressure is a call rather than an opaque runtime decision:
//! [`Collector::collect`] drops every soft retention at once,
//! [`Collector::reclaim`] drops a single one, and an optional soft budget
//! releases the oldest retention whenever too many values are tracked.
//! Each value that dies as a result is forgotten and its clear-listeners run
//! synchronously, after the collector's own state is consistent again.
//!
//! Values released from retention by the budget can die later, when their
//! last pin or caller handle goes away. Under a budget, registrations sweep
//! for such values once registrations since the last sweep reach half the
//! registry, so finding them costs amortized O(1) per registration.

use crate::config::CollectorConfig;
use crate::reentrancy::DebugReentrancy;
use core::cell::RefCell;
use core::fmt;
use core::mem;
use hashbrown::HashMap;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

/// Callback run once when a tracked value is reclaimed.
pub type Listener = Box<dyn FnOnce()>;

struct Tracked<V> {
    value: Weak<V>,
    // Registration order; the most recent registration wins.
    seq: u64,
    retained: bool,
    listeners: Vec<Listener>,
}

struct Heap<V> {
    config: CollectorConfig,
    // Keyed by allocation address. The `Weak` in each record keeps the
    // allocation (not the value) alive, so addresses are not reused while
    // tracked.
    tracked: HashMap<usize, Tracked<V>>,
    retained: VecDeque<Rc<V>>,
    next_seq: u64,
    since_sweep: usize,
}

impl<V> Heap<V> {
    /// Pop retentions beyond the soft budget, oldest first.
    fn over_budget(&mut self) -> Vec<Rc<V>> {
        let mut released = Vec::new();
        if let Some(budget) = self.config.soft_budget {
            while self.retained.len() > budget {
                match self.retained.pop_front() {
                    Some(v) => released.push(v),
                    None => break,
                }
            }
        }
        released
    }

    fn sweep_due(&self) -> bool {
        match self.config.soft_budget {
            Some(budget) => self.since_sweep >= budget.max(self.tracked.len() / 2).max(1),
            None => false,
        }
    }

    /// Forget every record whose value has died, returning their listeners.
    fn sweep(&mut self) -> Vec<Vec<Listener>> {
        self.since_sweep = 0;
        let dead: Vec<usize> = self
            .tracked
            .iter()
            .filter(|(_, t)| t.value.strong_count() == 0)
            .map(|(&a, _)| a)
            .collect();
        let mut fired = Vec::with_capacity(dead.len());
        for a in dead {
            if let Some(t) = self.tracked.remove(&a) {
                fired.push(t.listeners);
            }
        }
        fired
    }
}

struct Shared<V> {
    heap: RefCell<Heap<V>>,
    sweeping: DebugReentrancy,
}

/// Shared handle to an emulated memory manager for values of type `V`.
///
/// Cloning yields another handle to the same collector, so several
/// containers can be reclaimed by one `collect` call.
pub struct Collector<V> {
    shared: Rc<Shared<V>>,
}

fn address<V>(value: &Rc<V>) -> usize {
    Rc::as_ptr(value) as usize
}

fn notify(fired: Vec<Vec<Listener>>) {
    for listeners in fired {
        for listener in listeners {
            listener();
        }
    }
}

impl<V> Collector<V> {
    pub fn new() -> Self {
        Self::with_config(CollectorConfig::default())
    }

    pub fn with_config(config: CollectorConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                heap: RefCell::new(Heap {
                    config,
                    tracked: HashMap::new(),
                    retained: VecDeque::new(),
                    next_seq: 0,
                    since_sweep: 0,
                }),
                sweeping: DebugReentrancy::new("collector"),
            }),
        }
    }

    pub fn config(&self) -> CollectorConfig {
        self.shared.heap.borrow().config
    }

    /// Number of values that are tracked and not known to be reclaimed.
    pub fn tracked_len(&self) -> usize {
        self.shared.heap.borrow().tracked.len()
    }

    /// Number of values currently kept alive by soft retention.
    pub fn retained_len(&self) -> usize {
        self.shared.heap.borrow().retained.len()
    }

    /// Register `value` for soft retention.
    ///
    /// Tracking the same allocation again refreshes its registration order
    /// and adds `listener`; it does not duplicate the retention.
    pub fn track(&self, value: &Rc<V>, listener: Option<Listener>) {
        let (released, swept) = {
            let mut heap = self.shared.heap.borrow_mut();
            let heap = &mut *heap;
            let seq = heap.next_seq;
            heap.next_seq += 1;
            let tracked = heap
                .tracked
                .entry(address(value))
                .or_insert_with(|| Tracked {
                    value: Rc::downgrade(value),
                    seq,
                    retained: false,
                    listeners: Vec::new(),
                });
            tracked.seq = seq;
            tracked.listeners.extend(listener);
            if !tracked.retained {
                tracked.retained = true;
                heap.retained.push_back(Rc::clone(value));
            }
            heap.since_sweep += 1;
            let swept = if heap.sweep_due() {
                heap.sweep()
            } else {
                Vec::new()
            };
            (heap.over_budget(), swept)
        };

        if !swept.is_empty() {
            trace!(cleared = swept.len(), "Swept values that died after release.");
            notify(swept);
        }
        if !released.is_empty() {
            trace!(released = released.len(), "Soft budget exceeded.");
            self.release(released);
        }
    }

    /// Full memory pressure: drop every soft retention, reclaim each value
    /// nothing else holds, then softly retain the survivors again.
    ///
    /// Returns the number of values reclaimed.
    pub fn collect(&self) -> usize {
        let _g = self.shared.sweeping.enter();

        // Values die here, outside the heap borrow, so `V: Drop` may use
        // this collector.
        let retained = mem::take(&mut self.shared.heap.borrow_mut().retained);
        drop(retained);

        let (fired, survivors, trimmed) = {
            let mut heap = self.shared.heap.borrow_mut();
            let heap = &mut *heap;

            let fired = heap.sweep();

            let mut live: Vec<(u64, Rc<V>)> = heap
                .tracked
                .values_mut()
                .filter_map(|t| {
                    t.retained = true;
                    t.value.upgrade().map(|v| (t.seq, v))
                })
                .collect();
            live.sort_by_key(|(seq, _)| *seq);
            let survivors = live.len();
            heap.retained.extend(live.into_iter().map(|(_, v)| v));

            (fired, survivors, heap.over_budget())
        };

        let mut cleared = fired.len();
        notify(fired);
        if !trimmed.is_empty() {
            cleared += self.release(trimmed);
        }
        debug!(cleared, survivors, "Collected soft values.");
        cleared
    }

    /// Targeted memory pressure on one value.
    ///
    /// Drops the collector's soft retention of `value` along with the
    /// handle passed in. Returns true when the value was tracked and is now
    /// reclaimed; false when a pin or another handle keeps it alive.
    pub fn reclaim(&self, value: Rc<V>) -> bool {
        let retention = {
            let mut heap = self.shared.heap.borrow_mut();
            let pos = heap.retained.iter().position(|v| Rc::ptr_eq(v, &value));
            pos.and_then(|i| heap.retained.remove(i))
        };
        let mut handles = vec![value];
        handles.extend(retention);
        self.release(handles) > 0
    }

    /// Drop strong handles that came out of soft retention and reclaim the
    /// tracked values that died with them.
    fn release(&self, values: Vec<Rc<V>>) -> usize {
        let addresses: Vec<usize> = values.iter().map(address).collect();
        drop(values);

        let fired = {
            let mut heap = self.shared.heap.borrow_mut();
            let mut fired = Vec::new();
            for a in addresses {
                let dead = match heap.tracked.get_mut(&a) {
                    Some(t) => {
                        t.retained = false;
                        t.value.strong_count() == 0
                    }
                    None => false,
                };
                if dead {
                    if let Some(t) = heap.tracked.remove(&a) {
                        fired.push(t.listeners);
                    }
                }
            }
            fired
        };

        let cleared = fired.len();
        notify(fired);
        cleared
    }
}

impl<V> Clone for Collector<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<V> Default for Collector<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Collector<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heap = self.shared.heap.borrow();
        f.debug_struct("Collector")
            .field("config", &heap.config)
            .field("tracked", &heap.tracked.len())
            .field("retained", &heap.retained.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use test_log::test;

    fn counting_listener(counter: &Rc<Cell<usize>>) -> Option<Listener> {
        let counter = Rc::clone(counter);
        Some(Box::new(move || counter.set(counter.get() + 1)))
    }

    #[test]
    fn retention_keeps_values_alive_until_collect() {
        let c = Collector::new();
        let v = Rc::new(1);
        let weak = Rc::downgrade(&v);
        c.track(&v, None);
        drop(v);

        assert!(weak.upgrade().is_some(), "soft retention keeps the value");
        assert_eq!(c.retained_len(), 1);

        assert_eq!(c.collect(), 1);
        assert!(weak.upgrade().is_none());
        assert_eq!(c.tracked_len(), 0);
        assert_eq!(c.retained_len(), 0);
    }

    #[test]
    fn strongly_held_values_survive_and_are_retained_again() {
        let c = Collector::new();
        let held = Rc::new("held");
        let loose = Rc::new("loose");
        c.track(&held, None);
        c.track(&loose, None);
        let loose_weak = Rc::downgrade(&loose);
        drop(loose);

        assert_eq!(c.collect(), 1);
        assert!(loose_weak.upgrade().is_none());
        assert_eq!(c.tracked_len(), 1);
        assert_eq!(c.retained_len(), 1);

        // Once the outside handle is gone, the retained survivor dies on the
        // next pressure event.
        drop(held);
        assert_eq!(c.collect(), 1);
        assert_eq!(c.tracked_len(), 0);
    }

    #[test]
    fn listeners_fire_once_per_reclaimed_value() {
        let c = Collector::new();
        let fired = Rc::new(Cell::new(0));
        let v = Rc::new(5u32);
        c.track(&v, counting_listener(&fired));
        c.track(&v, counting_listener(&fired));
        assert_eq!(c.retained_len(), 1, "retention is not duplicated");
        drop(v);

        c.collect();
        assert_eq!(fired.get(), 2);
        c.collect();
        assert_eq!(fired.get(), 2, "reclaimed values are forgotten");
    }

    #[test]
    fn reclaim_targets_a_single_value() {
        let c = Collector::new();
        let a = Rc::new('a');
        let b = Rc::new('b');
        c.track(&a, None);
        c.track(&b, None);

        assert!(c.reclaim(a));
        assert_eq!(c.tracked_len(), 1);
        assert_eq!(c.retained_len(), 1);

        let pinned = Rc::clone(&b);
        assert!(!c.reclaim(b), "another handle keeps it alive");
        assert_eq!(*pinned, 'b');
    }

    #[test]
    fn soft_budget_releases_oldest_retention() {
        let c = Collector::with_config(CollectorConfig::default().with_soft_budget(2));
        let fired = Rc::new(Cell::new(0));
        let weaks: Vec<_> = (0..3)
            .map(|i| {
                let v = Rc::new(i);
                c.track(&v, counting_listener(&fired));
                Rc::downgrade(&v)
            })
            .collect();

        assert_eq!(fired.get(), 1);
        assert!(weaks[0].upgrade().is_none());
        assert!(weaks[1].upgrade().is_some());
        assert!(weaks[2].upgrade().is_some());
        assert_eq!(c.retained_len(), 2);
    }

    #[test]
    fn collect_trims_survivors_to_budget_by_registration_order() {
        let c = Collector::with_config(CollectorConfig::default().with_soft_budget(1));
        let old = Rc::new(1);
        let new = Rc::new(2);
        c.track(&old, None);
        c.track(&new, None);
        c.collect();

        assert_eq!(c.retained_len(), 1);
        assert_eq!(c.tracked_len(), 2);

        // `new` is the retained survivor, so it outlives its last handle.
        let new_weak = Rc::downgrade(&new);
        drop(new);
        assert!(new_weak.upgrade().is_some());

        // `old` lost retention: it dies with its handle but stays tracked
        // until the next sweep discovers it.
        let old_weak = Rc::downgrade(&old);
        drop(old);
        assert!(old_weak.upgrade().is_none());
        assert_eq!(c.tracked_len(), 2);

        assert_eq!(c.collect(), 2);
        assert_eq!(c.tracked_len(), 0);
    }

    #[test]
    fn budget_sweeps_values_that_die_after_release() {
        let c = Collector::with_config(CollectorConfig::default().with_soft_budget(1));
        let fired = Rc::new(Cell::new(0));
        let held: Vec<_> = (0..8)
            .map(|i| {
                let v = Rc::new(i);
                c.track(&v, counting_listener(&fired));
                v
            })
            .collect();
        assert_eq!(fired.get(), 0);
        assert_eq!(c.tracked_len(), 8);

        // Seven values lost their retention and now lose their last handle.
        drop(held);
        assert_eq!(c.tracked_len(), 8);

        // Each registration releases its predecessor. Within half the
        // registry's worth of registrations a sweep finds the other seven.
        for i in 0..4 {
            c.track(&Rc::new(100 + i), None);
        }
        assert_eq!(fired.get(), 8);
        assert_eq!(c.tracked_len(), 1);
        assert_eq!(c.retained_len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let c = Collector::new();
        let c2 = c.clone();
        c.track(&Rc::new(()), None);
        assert_eq!(c2.tracked_len(), 1);
        assert_eq!(c2.collect(), 1);
        assert_eq!(c.tracked_len(), 0);
    }
}
