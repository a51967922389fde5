//! Fixed-capacity direct-mapped cache of `(op, a, b) -> result`.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::addr::{Address, NULL};

/// Every distinct operation the cache can key on. Binary algebra ops and
/// variable ops share one table, the way the original's single
/// `Operation` enum does; [`Op::PowerSet`] and [`Op::ExplicitForm`] reuse
/// the same `(op, a, b)` shape with `b == a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Union,
    Intersection,
    Difference,
    OrthogonalJoin,
    Change,
    FilterContain,
    FilterNotContain,
    PowerSet,
    ExplicitForm,
}

const INIT_CAPACITY: usize = 1 << 8;
const TABLE_EXTEND_FACTOR: u32 = 2;

#[derive(Debug, Clone, Copy)]
struct Entry {
    op: Op,
    a: Address,
    b: Address,
    result: Address,
}

/// A fixed-size, direct-mapped table: `write` unconditionally overwrites
/// whatever was in the slot, `read` returns a hit only on an exact key
/// match. There is no collision chaining — this is a probabilistic cache,
/// and clearing it must never change the semantics of anything built on
/// top, only its speed.
pub struct CacheTable {
    slots: Vec<Option<Entry>>,
}

impl CacheTable {
    pub fn new() -> Self {
        CacheTable::with_capacity(INIT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CacheTable {
            slots: vec![None; capacity.max(1)],
        }
    }

    fn key(&self, op: Op, a: Address, b: Address) -> usize {
        let mut hasher = FxHasher::default();
        op.hash(&mut hasher);
        a.hash(&mut hasher);
        b.hash(&mut hasher);
        (hasher.finish() as usize) % self.slots.len()
    }

    pub fn read(&self, op: Op, a: Address, b: Address) -> Address {
        let slot = &self.slots[self.key(op, a, b)];
        match slot {
            Some(e) if e.op == op && e.a == a && e.b == b => e.result,
            _ => NULL,
        }
    }

    pub fn write(&mut self, op: Op, a: Address, b: Address, result: Address) {
        let idx = self.key(op, a, b);
        self.slots[idx] = Some(Entry { op, a, b, result });
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Quadruples capacity and drops every entry. The original's
    /// `extend_table` tiles old contents into the larger table without
    /// recomputing slot indices, which makes any surviving entry
    /// meaningless once the modulus changes; this implementation takes
    /// the documented safe option and just clears (§9 Open Question).
    pub fn resize(&mut self) {
        let new_capacity = self.slots.len() << TABLE_EXTEND_FACTOR;
        log::trace!(
            "cache resize: {} -> {} slots, dropping all entries",
            self.slots.len(),
            new_capacity
        );
        self.slots = vec![None; new_capacity];
    }
}

impl Default for CacheTable {
    fn default() -> Self {
        CacheTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_hits() {
        let mut c = CacheTable::new();
        c.write(Op::Union, 1, 2, 5);
        assert_eq!(c.read(Op::Union, 1, 2), 5);
    }

    #[test]
    fn miss_returns_null() {
        let c = CacheTable::new();
        assert_eq!(c.read(Op::Union, 1, 2), NULL);
    }

    #[test]
    fn clear_empties_every_slot() {
        let mut c = CacheTable::new();
        c.write(Op::Intersection, 3, 4, 7);
        c.clear();
        assert_eq!(c.read(Op::Intersection, 3, 4), NULL);
    }

    #[test]
    fn resize_invalidates_entries() {
        let mut c = CacheTable::new();
        c.write(Op::Union, 1, 2, 5);
        let old_capacity = c.capacity();
        c.resize();
        assert_eq!(c.capacity(), old_capacity << TABLE_EXTEND_FACTOR);
        assert_eq!(c.read(Op::Union, 1, 2), NULL);
    }
}
