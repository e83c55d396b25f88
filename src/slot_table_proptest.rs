#![cfg(test)]

// Property tests for SlotTable, kept inside the crate because the table is
// not part of the public surface.

use crate::slot_table::{Handle, SlotTable};
use core::hash::BuildHasher;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::hash_map::RandomState;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hasher;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking walks toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Upsert(usize, i32),
    Remove(usize),
    Find(usize),
    FindStr(String),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let find_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Upsert(i, v)),
            2 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Find),
            1 => prop_oneof![find_pool, "[a-z]{0,5}"].prop_map(Op::FindStr),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap:
// - upsert keeps one entry per key and a stable handle across replacement;
// - remove(handle) returns the model's pair and invalidates the handle;
// - find agrees with the model, including borrowed `&str` lookups;
// - iteration yields exactly the model's key set;
// - stale handles never resolve; len parity after each op.
fn run_state_machine<S: BuildHasher>(
    mut sut: SlotTable<Key, i32, S>,
    pool: Vec<String>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut live: HashMap<Key, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();

    for op in ops {
        match op {
            Op::Upsert(i, v) => {
                let k = key_from(&pool, i);
                let (h, prev) = sut.upsert(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k.clone(), v));
                if let Some(&old) = live.get(&k) {
                    prop_assert_eq!(old, h, "replacement keeps the handle");
                }
                live.insert(k, h);
            }
            Op::Remove(i) => {
                let k = key_from(&pool, i);
                if let Some(h) = live.remove(&k) {
                    let (kk, vv) = sut.remove(h).expect("live handle removes");
                    prop_assert!(kk == k);
                    prop_assert_eq!(Some(vv), model.remove(&k));
                    stale.push(h);
                } else {
                    prop_assert!(sut.find(&k).is_none());
                }
            }
            Op::Find(i) => {
                let k = key_from(&pool, i);
                prop_assert_eq!(sut.find(&k), live.get(&k).copied());
            }
            Op::FindStr(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.find(s.as_str()).is_some(), has_model);
            }
            Op::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(&h) = live.get(&k) {
                    let vr = sut.value_mut(h).expect("live handle resolves");
                    *vr = vr.saturating_add(d);
                    if let Some(mv) = model.get_mut(&k) {
                        *mv = mv.saturating_add(d);
                    }
                }
            }
            Op::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|(_, k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                for (h, k, v) in sut.iter() {
                    prop_assert_eq!(Some(&h), live.get(k));
                    prop_assert_eq!(Some(v), model.get(k));
                }
            }
            Op::Clear => {
                sut.clear();
                model.clear();
                stale.extend(live.drain().map(|(_, h)| h));
            }
        }

        for &h in &stale {
            prop_assert!(sut.value(h).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
    }
    Ok(())
}

// Collision variant: a constant hasher puts every key in one bucket.
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

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(SlotTable::with_hasher(RandomState::new()), pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(SlotTable::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}
