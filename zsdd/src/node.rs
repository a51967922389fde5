//! The node arena: structural hash-consing, reference counting, and GC.

use std::cell::Cell;

use rustc_hash::FxHashMap;

use crate::addr::Address;

/// One decomposition element: a `(prime, sub)` pair denoting `prime × sub`.
pub type Element = (Address, Address);

/// A node stored in the arena.
///
/// Only [`Node::Decomposition`] carries a refcount — literal nodes are
/// cheap, typically few, and never collected (§3 *Refcount semantics*).
#[derive(Debug, Clone)]
pub enum Node {
    /// A tombstone slot, available for recycling.
    Unused,
    /// `literal` positive denotes `{{v}}`; negative denotes `{∅,{v}}`.
    Literal { literal: i64, vtree: usize },
    /// An ordered, compressed, zero-suppressed list of elements, all
    /// `sub`-distinct, at an internal vtree node.
    Decomposition {
        vtree: usize,
        elements: Vec<Element>,
        refcount: Cell<u32>,
    },
}

impl Node {
    pub fn is_decomposition(&self) -> bool {
        matches!(self, Node::Decomposition { .. })
    }

    pub fn vtree(&self) -> usize {
        match self {
            Node::Literal { vtree, .. } => *vtree,
            Node::Decomposition { vtree, .. } => *vtree,
            Node::Unused => panic!("vtree() on an unused slot"),
        }
    }

    pub fn refcount(&self) -> u32 {
        match self {
            Node::Decomposition { refcount, .. } => refcount.get(),
            _ => 0,
        }
    }
}

/// Structural key used by the uniqueness map. Distinct from [`Node`] so
/// that the refcount `Cell` (not `Hash`/`Eq`) never has to participate in
/// hashing — the same reason the original keeps a plain value-equality
/// node separate from its mutable refcount field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    Literal { literal: i64, vtree: usize },
    Decomposition { vtree: usize, elements: Vec<Element> },
}

impl NodeKey {
    fn of(node: &Node) -> NodeKey {
        match node {
            Node::Literal { literal, vtree } => NodeKey::Literal {
                literal: *literal,
                vtree: *vtree,
            },
            Node::Decomposition { vtree, elements, .. } => NodeKey::Decomposition {
                vtree: *vtree,
                elements: elements.clone(),
            },
            Node::Unused => panic!("NodeKey::of on an unused slot"),
        }
    }
}

/// An arena of nodes plus a uniqueness map plus a free-slot stack.
#[derive(Debug, Default)]
pub struct NodeTable {
    arena: Vec<Node>,
    unique: FxHashMap<NodeKey, Address>,
    free: Vec<Address>,
}

impl NodeTable {
    pub fn new() -> Self {
        NodeTable::default()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get(&self, addr: Address) -> &Node {
        &self.arena[addr as usize]
    }

    /// Returns the address of an existing value-equal node, or allocates
    /// (popping `free` if non-empty, else appending) and activates a fresh
    /// slot. The caller must have canonicalized decomposition element
    /// order (§3 invariant 4) before calling.
    pub fn intern(&mut self, node: Node) -> Address {
        let key = NodeKey::of(&node);
        if let Some(&addr) = self.unique.get(&key) {
            return addr;
        }

        let addr = match self.free.pop() {
            Some(addr) => {
                self.arena[addr as usize] = node;
                addr
            }
            None => {
                self.arena.push(node);
                (self.arena.len() - 1) as Address
            }
        };
        self.unique.insert(key, addr);
        addr
    }

    /// Single-sweep GC: every decomposition slot with refcount zero is
    /// removed from the uniqueness map, deactivated, and its index pushed
    /// onto the free stack. No mark phase — refcount already reflects
    /// reachability from live handles and live parents. Literal slots are
    /// skipped. Returns the collected addresses.
    pub fn gc(&mut self) -> Vec<Address> {
        let mut deleted = Vec::new();
        for i in 0..self.arena.len() {
            let addr = i as Address;
            let should_delete = matches!(
                &self.arena[i],
                Node::Decomposition { refcount, .. } if refcount.get() == 0
            );
            if should_delete {
                let key = NodeKey::of(&self.arena[i]);
                self.unique.remove(&key);
                self.arena[i] = Node::Unused;
                self.free.push(addr);
                deleted.push(addr);
            }
        }
        log::debug!(
            "gc: swept {} of {} slots, {} on the free list",
            deleted.len(),
            self.arena.len(),
            self.free.len()
        );
        deleted
    }
}

/// Bumps `addr`'s refcount, cascading to children the first time it goes
/// from zero to one. Iterative (an explicit work stack) rather than the
/// original's recursive walk, since a diagram can be far deeper than a
/// call stack comfortably allows (§9 Design Notes).
pub fn retain(table: &NodeTable, addr: Address) {
    if addr < 0 {
        return;
    }
    let mut stack = vec![addr];
    while let Some(a) = stack.pop() {
        if let Node::Decomposition {
            refcount, elements, ..
        } = table.get(a)
        {
            let prev = refcount.get();
            refcount.set(prev + 1);
            if prev == 0 {
                for &(p, s) in elements {
                    if p >= 0 {
                        stack.push(p);
                    }
                    if s >= 0 {
                        stack.push(s);
                    }
                }
            }
        }
    }
}

/// Drops `addr`'s refcount, cascading to children when it reaches zero.
/// See [`retain`] for why this is iterative.
pub fn release(table: &NodeTable, addr: Address) {
    if addr < 0 {
        return;
    }
    let mut stack = vec![addr];
    while let Some(a) = stack.pop() {
        if let Node::Decomposition {
            refcount, elements, ..
        } = table.get(a)
        {
            let prev = refcount.get();
            debug_assert!(prev > 0, "refcount underflow at {a}");
            refcount.set(prev - 1);
            if prev == 1 {
                for &(p, s) in elements {
                    if p >= 0 {
                        stack.push(p);
                    }
                    if s >= 0 {
                        stack.push(s);
                    }
                }
            }
        }
    }
}
