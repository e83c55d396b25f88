//! soft-hashmap: single-threaded maps and lists whose values may be
//! reclaimed under memory pressure, yet behave as ordinary containers while
//! memory is plentiful.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: soft-reference containers without a garbage collector. Every
//!   container stores weak `Slot`s; what keeps a value alive is explicit and
//!   lives outside the container.
//! - Layers:
//!   - Slot<V>: weak handle to one `Rc<V>`; occupied until the last strong
//!     holder goes away, then cleared for good.
//!   - Collector<V>: the memory manager. Holds a soft retention (one strong
//!     handle) per tracked value. Pressure is a call: `collect()` drops all
//!     retentions, `reclaim(v)` drops one, an optional soft budget drops the
//!     oldest. Values nothing else holds die, and their listeners run.
//!   - SlotTable<K, V, S>: structural map with generational handles
//!     (hashbrown index over a slotmap), shared by both maps.
//!   - TwoTierCache<K, V, S>: SlotTable of slots + FIFO PinSet of recently
//!     read values + ReclaimQueue of clear notices, drained lazily.
//!   - SoftMap<K, V, S>: SlotTable of slots only; reclaimed entries are
//!     dropped when touched.
//!   - ReclaimableList<V>: `Vec` of slots; reclaimed elements leave holes.
//!   - Cache: `cache` / `get_cached` facade over either map.
//!
//! Constraints
//! - Single-threaded: everything is `Rc`-based, so `!Send`/`!Sync`.
//! - Absent values (`None`) passed to mutating calls are no-ops.
//! - A reclaimed value is indistinguishable from one never inserted.
//! - No background sweeps: dead entries are removed during ordinary calls.
//!
//! Reentrancy
//! - SlotTable guards its probing sections (only `K: Eq/Hash` run there)
//!   with a debug-only reentrancy check.
//! - The collector never runs user code while borrowed: values are dropped
//!   and listeners fired after its state is consistent. Re-entering
//!   `collect` from a `V: Drop` panics in debug builds.
//!
//! Notes and non-goals
//! - Deciding *when* to apply pressure belongs to the embedding program.
//! - No locking; share a container across threads only via your own
//!   serialization (the types will not let you otherwise).

mod cache;
mod collector;
mod config;
mod entry;
mod error;
mod notifier;
mod pin_set;
mod reentrancy;
mod slot;
mod slot_table;
mod slot_table_proptest;
mod soft_list;
mod soft_map;
mod two_tier;

// Public surface
pub use cache::{Cache, SoftCache};
pub use collector::{Collector, Listener};
pub use config::{CacheConfig, CollectorConfig, DEFAULT_PIN_CAPACITY};
pub use entry::{Entry, WriteBack};
pub use error::{Error, Result};
pub use slot::Slot;
pub use slot_table::Handle;
pub use soft_list::{Cursor, Iter, ReclaimableList};
pub use soft_map::SoftMap;
pub use two_tier::TwoTierCache;
