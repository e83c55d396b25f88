// SoftMap integration suite.
//
// SoftMap is the single-tier variant: no pinning and no notices. Cleared
// entries are removed only when an operation touches them, so `len` is a
// raw count that can include reclaimed entries.
use soft_hashmap::{Collector, SoftMap};
use std::rc::Rc;
use test_log::test;

// Test: ordinary map behavior while nothing is collected.
#[test]
fn behaves_as_a_map_without_pressure() {
    let mut m: SoftMap<&str, i32> = SoftMap::new();
    assert!(m.is_empty());
    assert_eq!(m.put("a", Rc::new(1)), None);
    assert_eq!(m.put("b", Rc::new(2)), None);
    assert_eq!(m.put("a", Rc::new(3)).as_deref(), Some(&1));
    assert_eq!(m.len(), 2);
    assert_eq!(m.get("a").as_deref(), Some(&3));
    assert_eq!(m.remove("b").as_deref(), Some(&2));
    assert!(m.remove("b").is_none());
    assert_eq!(m.len(), 1);
}

// Test: reads never keep a value alive.
#[test]
fn reads_do_not_pin() {
    let mut m: SoftMap<&str, i32> = SoftMap::new();
    m.put("a", Rc::new(1));
    let v = m.get("a").expect("present");
    drop(v);
    assert_eq!(m.collector().collect(), 1);
    assert!(m.get("a").is_none());
}

// Test: len overcounts reclaimed entries until a lookup touches them.
#[test]
fn len_overcounts_until_touched() {
    let mut m: SoftMap<&str, i32> = SoftMap::new();
    m.put("a", Rc::new(1));
    m.put("b", Rc::new(2));
    m.collector().collect();

    assert_eq!(m.len(), 2);
    assert!(!m.contains_key("a"));
    assert_eq!(m.len(), 2, "contains_key does not reap");
    assert!(m.get("a").is_none());
    assert_eq!(m.len(), 1);
}

// Test: entries skips and removes cleared entries.
#[test]
fn entries_reaps_what_it_walks() {
    let mut m: SoftMap<String, String> = SoftMap::new();
    let kept = Rc::new("kept".to_string());
    m.put("kept".to_string(), Rc::clone(&kept));
    m.put("gone".to_string(), Rc::new("gone".to_string()));
    m.collector().collect();

    let entries = m.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key(), "kept");
    assert!(Rc::ptr_eq(entries[0].value(), &kept));
    assert_eq!(m.len(), 1);
    assert_eq!(m.entries(), entries);
}

// Test: entry write-back replaces the backing slot.
#[test]
fn entry_set_value_writes_back() {
    let mut m: SoftMap<&str, i32> = SoftMap::new();
    m.put("k", Rc::new(1));
    let mut entries = m.entries();
    assert_eq!(entries[0].set_value(&mut m, Rc::new(2)).as_deref(), Some(&1));
    assert_eq!(m.get("k").as_deref(), Some(&2));
}

// Test: absent values and clear.
#[test]
fn absent_values_and_clear() {
    let mut m: SoftMap<&str, i32> = SoftMap::new();
    assert!(m.put("k", None::<Rc<i32>>).is_none());
    assert!(m.is_empty());
    m.put("k", Rc::new(1));
    m.clear();
    assert!(m.is_empty());
    assert!(m.get("k").is_none());
}

// Test: put_if_absent replaces a reclaimed entry.
#[test]
fn put_if_absent_over_reclaimed_entry() {
    let collector = Collector::new();
    let mut m: SoftMap<u8, u8> = SoftMap::with_collector(collector.clone());
    m.put(1, Rc::new(10));
    assert_eq!(m.put_if_absent(1, Rc::new(11)).as_deref(), Some(&10));
    collector.collect();
    assert!(m.put_if_absent(1, Rc::new(12)).is_none());
    assert_eq!(m.get(&1).as_deref(), Some(&12));
    assert_eq!(m.len(), 1);
}
