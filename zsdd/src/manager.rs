//! The manager: owns the vtree, node table and operation cache, and is the
//! sole entry point for building and combining diagrams.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::addr::{Address, EMPTY, FALSE};
use crate::apply;
use crate::cache::CacheTable;
use crate::error::Result;
use crate::handle::Handle;
use crate::node::{Node, NodeTable};
use crate::vtree::VTree;

/// Everything the manager owns, gathered so the apply engine can be
/// written against a single `&mut Inner` instead of three separate
/// borrows.
pub(crate) struct Inner {
    pub(crate) vtree: VTree,
    pub(crate) nodes: NodeTable,
    pub(crate) cache: CacheTable,
}

/// A manager for a fixed vtree. Cheaply [`Clone`]-able — clones share the
/// same underlying arena, the way a `betree` database handle is shared
/// across its readers.
#[derive(Clone)]
pub struct Manager(Rc<RefCell<Inner>>);

impl Manager {
    pub fn new(vtree: VTree) -> Self {
        Manager::with_cache_capacity(vtree, 1 << 16)
    }

    pub fn with_cache_capacity(vtree: VTree, cache_capacity: usize) -> Self {
        Manager(Rc::new(RefCell::new(Inner {
            vtree,
            nodes: NodeTable::new(),
            cache: CacheTable::with_capacity(cache_capacity),
        })))
    }

    pub fn vtree(&self) -> std::cell::Ref<'_, VTree> {
        std::cell::Ref::map(self.0.borrow(), |inner| &inner.vtree)
    }

    fn wrap(&self, addr: Address) -> Handle {
        Handle::new(self.clone(), addr)
    }

    pub(crate) fn retain(&self, addr: Address) {
        crate::node::retain(&self.0.borrow().nodes, addr);
    }

    pub(crate) fn release(&self, addr: Address) {
        crate::node::release(&self.0.borrow().nodes, addr);
    }

    /// `{∅}` — the family containing only the empty set.
    pub fn base_set(&self) -> Handle {
        self.wrap(EMPTY)
    }

    /// `∅` — the empty family.
    pub fn empty(&self) -> Handle {
        self.wrap(FALSE)
    }

    /// The positive literal `{{v}}` if `literal > 0`, the negative literal
    /// `{∅,{v}}` if `literal < 0`.
    pub fn literal(&self, literal: i64) -> Result<Handle> {
        let addr = apply::make_literal(&mut self.0.borrow_mut(), literal)?;
        Ok(self.wrap(addr))
    }

    pub fn union(&self, lhs: &Handle, rhs: &Handle) -> Handle {
        let addr = apply::apply(
            &mut self.0.borrow_mut(),
            crate::cache::Op::Union,
            lhs.addr(),
            rhs.addr(),
        );
        self.wrap(addr)
    }

    pub fn intersection(&self, lhs: &Handle, rhs: &Handle) -> Handle {
        let addr = apply::apply(
            &mut self.0.borrow_mut(),
            crate::cache::Op::Intersection,
            lhs.addr(),
            rhs.addr(),
        );
        self.wrap(addr)
    }

    pub fn difference(&self, lhs: &Handle, rhs: &Handle) -> Handle {
        let addr = apply::apply(
            &mut self.0.borrow_mut(),
            crate::cache::Op::Difference,
            lhs.addr(),
            rhs.addr(),
        );
        self.wrap(addr)
    }

    pub fn orthogonal_join(&self, lhs: &Handle, rhs: &Handle) -> Handle {
        let addr = apply::apply(
            &mut self.0.borrow_mut(),
            crate::cache::Op::OrthogonalJoin,
            lhs.addr(),
            rhs.addr(),
        );
        self.wrap(addr)
    }

    /// Adds `var` to every set in `z`'s family (the "change" operation:
    /// flips membership of `var` in every element).
    pub fn change(&self, z: &Handle, var: i64) -> Handle {
        let addr = apply::apply_with_var(
            &mut self.0.borrow_mut(),
            crate::cache::Op::Change,
            z.addr(),
            var,
        );
        self.wrap(addr)
    }

    pub fn filter_contain(&self, z: &Handle, var: i64) -> Handle {
        let addr = apply::apply_with_var(
            &mut self.0.borrow_mut(),
            crate::cache::Op::FilterContain,
            z.addr(),
            var,
        );
        self.wrap(addr)
    }

    pub fn filter_not_contain(&self, z: &Handle, var: i64) -> Handle {
        let addr = apply::apply_with_var(
            &mut self.0.borrow_mut(),
            crate::cache::Op::FilterNotContain,
            z.addr(),
            var,
        );
        self.wrap(addr)
    }

    /// The power set of the variables under `vtree_node` (the whole tree's
    /// root, by default). Useful as a universe when compiling CNF.
    pub fn powerset_of(&self, vtree_node: usize) -> Handle {
        let addr = apply::make_powerset(&mut self.0.borrow_mut(), vtree_node);
        self.wrap(addr)
    }

    pub fn powerset(&self) -> Handle {
        let root = self.0.borrow().vtree.root();
        self.powerset_of(root)
    }

    /// Rewrites `z` so every decomposition is explicit: every element of
    /// the powerset of the decomposition's left variables appears exactly
    /// once as a prime, trivial subs included (§7 *Explicit form*).
    pub fn to_explicit_form(&self, z: &Handle) -> Handle {
        let addr = apply::to_explicit_form(&mut self.0.borrow_mut(), z.addr());
        self.wrap(addr)
    }

    /// Number of sets in `z`'s family.
    pub fn count(&self, z: &Handle) -> u64 {
        let inner = self.0.borrow();
        let mut memo = HashMap::new();
        apply::count_solutions(&inner, z.addr(), &mut memo)
    }

    /// Number of distinct decomposition elements reachable from `z`.
    pub fn size(&self, z: &Handle) -> u64 {
        apply::size(&self.0.borrow(), z.addr())
    }

    /// Every set in `z`'s family, each given as a sorted list of
    /// variables. Exponential in the worst case — intended for small
    /// diagrams and tests, not production-size compilation output.
    pub fn explicit_sets(&self, z: &Handle) -> Vec<Vec<i64>> {
        let inner = self.0.borrow();
        let mut memo: FxHashMap<Address, Vec<Vec<i64>>> = FxHashMap::default();
        apply::calc_setfamily(&inner, z.addr(), &mut memo)
    }

    /// Sweeps zero-refcount decomposition nodes and clears the operation
    /// cache, which may now reference addresses that no longer exist.
    pub fn gc(&self) -> Vec<Address> {
        let mut inner = self.0.borrow_mut();
        let deleted = inner.nodes.gc();
        inner.cache.clear();
        log::trace!("gc: cleared operation cache after sweep");
        deleted
    }

    pub fn node_count(&self) -> usize {
        self.0.borrow().nodes.len()
    }

    /// Renders `z` in the bottom-up text format: a six-line `c`-comment
    /// header, then one `L`/`D` line per reachable node, children before
    /// parents, with `E`/`F` standing in for the `EMPTY`/`FALSE`
    /// sentinels.
    pub fn export_text(&self, z: &Handle, out: &mut dyn std::io::Write) -> std::io::Result<()> {
        crate::export::write_text(&self.0.borrow(), z.addr(), out)
    }

    /// Renders `z` as a Graphviz `dot` graph, grouping nodes at the same
    /// vtree level under `rank=same`.
    pub fn export_dot(&self, z: &Handle, out: &mut dyn std::io::Write) -> std::io::Result<()> {
        crate::export::write_dot(&self.0.borrow(), z.addr(), out)
    }
}

pub(crate) fn reachable(inner: &Inner, root: Address) -> FxHashSet<Address> {
    let mut seen = FxHashSet::default();
    let mut stack = vec![root];
    seen.insert(root);
    while let Some(addr) = stack.pop() {
        if addr < 0 {
            continue;
        }
        if let Node::Decomposition { elements, .. } = inner.nodes.get(addr) {
            for &(p, s) in elements {
                if seen.insert(p) {
                    stack.push(p);
                }
                if seen.insert(s) {
                    stack.push(s);
                }
            }
        }
    }
    seen
}
