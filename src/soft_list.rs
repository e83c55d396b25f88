//! ReclaimableList: an index-addressed sequence whose elements may be
//! reclaimed independently.
//!
//! A reclaimed element leaves a hole: its position keeps reading as `None`
//! and later indices do not shift. Only explicit removals compact the list.
//! Absent values passed to mutating calls are ignored.

use crate::collector::Collector;
use crate::error::{Error, Result};
use crate::slot::Slot;
use core::fmt;
use std::rc::Rc;

pub struct ReclaimableList<V> {
    slots: Vec<Slot<V>>,
    collector: Collector<V>,
}

impl<V> ReclaimableList<V> {
    pub fn new() -> Self {
        Self::with_collector(Collector::new())
    }

    pub fn with_collector(collector: Collector<V>) -> Self {
        Self {
            slots: Vec::new(),
            collector,
        }
    }

    pub fn collector(&self) -> &Collector<V> {
        &self.collector
    }

    /// Number of positions, holes included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    fn track(&self, value: &Rc<V>) -> Slot<V> {
        self.collector.track(value, None);
        Slot::new(value)
    }

    /// Append `value`. Returns false (and does nothing) if it is absent.
    pub fn push(&mut self, value: impl Into<Option<Rc<V>>>) -> bool {
        match value.into() {
            Some(value) => {
                let slot = self.track(&value);
                self.slots.push(slot);
                true
            }
            None => false,
        }
    }

    /// Insert `value` at `index`, shifting later elements up.
    ///
    /// `index` may equal `len()`. An absent value is a no-op.
    pub fn insert(&mut self, index: usize, value: impl Into<Option<Rc<V>>>) -> Result<()> {
        let Some(value) = value.into() else {
            return Ok(());
        };
        if index > self.slots.len() {
            return Err(Error::out_of_range(index, self.slots.len()));
        }
        let slot = self.track(&value);
        self.slots.insert(index, slot);
        Ok(())
    }

    /// The element at `index`, or `Ok(None)` if it has been reclaimed.
    pub fn get(&self, index: usize) -> Result<Option<Rc<V>>> {
        self.slots
            .get(index)
            .map(Slot::get)
            .ok_or_else(|| Error::out_of_range(index, self.slots.len()))
    }

    /// Replace the element at `index`, returning the previous one if it was
    /// still live. An absent value is a no-op returning `Ok(None)`.
    pub fn set(&mut self, index: usize, value: impl Into<Option<Rc<V>>>) -> Result<Option<Rc<V>>> {
        let Some(value) = value.into() else {
            return Ok(None);
        };
        let len = self.slots.len();
        if index >= len {
            return Err(Error::out_of_range(index, len));
        }
        let slot = self.track(&value);
        Ok(core::mem::replace(&mut self.slots[index], slot).get())
    }

    /// Remove the element at `index`, shifting later elements down.
    pub fn remove(&mut self, index: usize) -> Result<Option<Rc<V>>> {
        let len = self.slots.len();
        if index >= len {
            return Err(Error::out_of_range(index, len));
        }
        Ok(self.slots.remove(index).get())
    }

    /// Append every present value. Returns false only when `values` was
    /// empty.
    pub fn extend_from<I>(&mut self, values: I) -> bool
    where
        I: IntoIterator,
        I::Item: Into<Option<Rc<V>>>,
    {
        let mut any = false;
        for value in values {
            any = true;
            self.push(value);
        }
        any
    }

    /// Insert every present value starting at `index`, keeping their order.
    pub fn insert_all<I>(&mut self, index: usize, values: I) -> Result<bool>
    where
        I: IntoIterator,
        I::Item: Into<Option<Rc<V>>>,
    {
        if index > self.slots.len() {
            return Err(Error::out_of_range(index, self.slots.len()));
        }
        let mut at = index;
        let mut any = false;
        for value in values {
            any = true;
            if let Some(value) = value.into() {
                let slot = self.track(&value);
                self.slots.insert(at, slot);
                at += 1;
            }
        }
        Ok(any)
    }

    /// Keep only the positions for which `keep` returns true. Holes are
    /// passed as `None`. Returns whether anything was removed.
    pub fn retain<F>(&mut self, mut keep: F) -> bool
    where
        F: FnMut(Option<&V>) -> bool,
    {
        let before = self.slots.len();
        self.slots.retain(|slot| keep(slot.get().as_deref()));
        self.slots.len() != before
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            it: self.slots.iter(),
        }
    }

    /// Bidirectional cursor positioned before the element at `index`.
    pub fn cursor(&mut self, index: usize) -> Result<Cursor<'_, V>> {
        if index > self.slots.len() {
            return Err(Error::out_of_range(index, self.slots.len()));
        }
        Ok(Cursor {
            list: self,
            next: index,
            last: None,
        })
    }

    /// Snapshot of every position; holes are `None`.
    pub fn to_vec(&self) -> Vec<Option<Rc<V>>> {
        self.iter().collect()
    }

    /// Sub-list views are not supported.
    pub fn sub_list(&self, _from: usize, _to: usize) -> Result<ReclaimableList<V>> {
        Err(Error::Unsupported("sub_list"))
    }
}

impl<V: PartialEq> ReclaimableList<V> {
    /// Whether any live element equals `value`.
    pub fn contains(&self, value: &V) -> bool {
        self.index_of(value).is_some()
    }

    /// True when every item is contained. An empty `values` yields false.
    pub fn contains_all<'a, I>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = &'a V>,
        V: 'a,
    {
        let mut any = false;
        for value in values {
            any = true;
            if !self.contains(value) {
                return false;
            }
        }
        any
    }

    pub fn index_of(&self, value: &V) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.get().is_some_and(|v| *v == *value))
    }

    pub fn last_index_of(&self, value: &V) -> Option<usize> {
        self.slots
            .iter()
            .rposition(|slot| slot.get().is_some_and(|v| *v == *value))
    }

    /// Remove the first live element equal to `value`.
    pub fn remove_value(&mut self, value: &V) -> bool {
        match self.index_of(value) {
            Some(i) => {
                self.slots.remove(i);
                true
            }
            None => false,
        }
    }

    /// Remove the first live match of each item. Returns whether anything
    /// was removed.
    pub fn remove_all<'a, I>(&mut self, values: I) -> bool
    where
        I: IntoIterator<Item = &'a V>,
        V: 'a,
    {
        let mut modified = false;
        for value in values {
            modified |= self.remove_value(value);
        }
        modified
    }
}

impl<V> Default for ReclaimableList<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for ReclaimableList<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a ReclaimableList<V> {
    type Item = Option<Rc<V>>;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over positions in insertion order; holes yield `None`.
pub struct Iter<'a, V> {
    it: core::slice::Iter<'a, Slot<V>>,
}

impl<V> Iterator for Iter<'_, V> {
    type Item = Option<Rc<V>>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(Slot::get)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.it.next_back().map(Slot::get)
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// Bidirectional list cursor that can edit around its position.
///
/// The cursor sits between elements. `next`/`previous` step over one
/// element and make it current; `remove` and `set` act on the current
/// element; `add` inserts before the cursor and clears the current element.
/// Each step returns `None` at the ends and `Some(None)` for a hole.
pub struct Cursor<'a, V> {
    list: &'a mut ReclaimableList<V>,
    next: usize,
    last: Option<usize>,
}

impl<V> Cursor<'_, V> {
    pub fn has_next(&self) -> bool {
        self.next < self.list.len()
    }

    pub fn has_previous(&self) -> bool {
        self.next > 0
    }

    pub fn next_index(&self) -> usize {
        self.next
    }

    pub fn previous_index(&self) -> Option<usize> {
        self.next.checked_sub(1)
    }

    #[allow(clippy::should_implement_trait, clippy::option_option)]
    pub fn next(&mut self) -> Option<Option<Rc<V>>> {
        let slot = self.list.slots.get(self.next)?;
        let value = slot.get();
        self.last = Some(self.next);
        self.next += 1;
        Some(value)
    }

    #[allow(clippy::option_option)]
    pub fn previous(&mut self) -> Option<Option<Rc<V>>> {
        let index = self.next.checked_sub(1)?;
        let value = self.list.slots.get(index)?.get();
        self.next = index;
        self.last = Some(index);
        Some(value)
    }

    /// Remove the element last returned by `next` or `previous`.
    pub fn remove(&mut self) -> Result<Option<Rc<V>>> {
        let index = self.last.take().ok_or(Error::NoCurrentElement)?;
        let removed = self.list.remove(index)?;
        if index < self.next {
            self.next -= 1;
        }
        Ok(removed)
    }

    /// Replace the current element. An absent value is a no-op.
    pub fn set(&mut self, value: impl Into<Option<Rc<V>>>) -> Result<()> {
        let Some(value) = value.into() else {
            return Ok(());
        };
        let index = self.last.ok_or(Error::NoCurrentElement)?;
        self.list.set(index, value)?;
        Ok(())
    }

    /// Insert before the cursor. An absent value is a no-op.
    pub fn add(&mut self, value: impl Into<Option<Rc<V>>>) -> Result<()> {
        let Some(value) = value.into() else {
            return Ok(());
        };
        self.list.insert(self.next, value)?;
        self.next += 1;
        self.last = None;
        Ok(())
    }
}
