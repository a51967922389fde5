//! The apply engine: recursive set algebra over the node arena.
//!
//! Every public entry point here takes `&mut Inner` (or `&Inner` for the
//! read-only traversals) rather than a [`crate::manager::Manager`] — this
//! keeps the recursion free of `RefCell` borrow bookkeeping, at the cost
//! of the caller borrowing the manager's interior exactly once up front.

use std::cell::Cell;
use std::collections::HashMap;

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::addr::{Address, EMPTY, FALSE, NULL};
use crate::cache::Op;
use crate::error::{Error, Result};
use crate::manager::Inner;
use crate::node::{Element, Node};
use crate::vtree::VTreeNode;

fn get<'a>(inner: &'a Inner, addr: Address) -> &'a Node {
    inner.nodes.get(addr)
}

pub(crate) fn make_literal(inner: &mut Inner, literal: i64) -> Result<Address> {
    let leaf = inner.vtree.leaf_for_literal(literal)?;
    Ok(make_literal_at(inner, literal, leaf))
}

fn make_literal_at(inner: &mut Inner, literal: i64, vtree: usize) -> Address {
    inner.nodes.intern(Node::Literal { literal, vtree })
}

fn make_literal_for_var(inner: &mut Inner, var: i64) -> Address {
    let leaf = inner
        .vtree
        .leaf_for_literal(var)
        .expect("var already validated by an earlier call");
    make_literal_at(inner, var, leaf)
}

fn make_decomposition(inner: &mut Inner, mut elements: Vec<Element>, vtree_node: usize) -> Address {
    assert!(!elements.is_empty(), "a decomposition needs at least one element");
    elements.sort_unstable();
    inner.nodes.intern(Node::Decomposition {
        vtree: vtree_node,
        elements,
        refcount: Cell::new(0),
    })
}

/// Unions together every prime in `decomp`, used to compute "whatever
/// isn't covered by this side's decomposition" for the implicit-partition
/// passes of union/difference.
fn calc_primes_union(inner: &mut Inner, decomp: &[Element]) -> Address {
    let mut acc = FALSE;
    for &(prime, _) in decomp {
        acc = apply(inner, Op::Union, prime, acc);
    }
    acc
}

/// Groups candidates by `sub`, unions the primes within each group, and
/// returns one element per distinct `sub` — the compression step that
/// keeps a decomposition's subs pairwise distinct (§3 invariant 4).
fn compress_candidates(inner: &mut Inner, candidates: Vec<Element>) -> Vec<Element> {
    let groups: HashMap<Address, Vec<Address>> = candidates
        .into_iter()
        .map(|(prime, sub)| (sub, prime))
        .into_group_map();

    let mut decomposition = Vec::with_capacity(groups.len());
    for (sub, primes) in groups {
        let mut combined = FALSE;
        for prime in primes {
            combined = apply(inner, Op::Union, combined, prime);
        }
        decomposition.push((combined, sub));
    }
    decomposition
}

/// Binary set algebra: union, intersection, difference, orthogonal join.
pub(crate) fn apply(inner: &mut Inner, op: Op, lhs: Address, rhs: Address) -> Address {
    let (lhs, rhs) = if matches!(op, Op::Union | Op::Intersection | Op::OrthogonalJoin) && lhs > rhs
    {
        (rhs, lhs)
    } else {
        (lhs, rhs)
    };

    if let Some(trivial) = trivial_case(inner, op, lhs, rhs) {
        return trivial;
    }

    let cached = inner.cache.read(op, lhs, rhs);
    if cached != NULL {
        return cached;
    }

    let (depend_vtree, decomp_l, decomp_r) = align_decompositions(inner, lhs, rhs);

    let mut candidates = Vec::new();
    let prime_op = if op == Op::OrthogonalJoin {
        Op::OrthogonalJoin
    } else {
        Op::Intersection
    };
    for &(l_prime, l_sub) in &decomp_l {
        for &(r_prime, r_sub) in &decomp_r {
            let new_prime = apply(inner, prime_op, l_prime, r_prime);
            if new_prime == NULL || new_prime == FALSE {
                continue;
            }
            let new_sub = apply(inner, op, l_sub, r_sub);
            if new_sub == NULL || new_sub == FALSE {
                continue;
            }
            candidates.push((new_prime, new_sub));
        }
    }

    // Implicit partition on the rhs: whatever lhs covers that decomp_r's
    // primes don't, paired with rhs's "missing" side.
    if matches!(op, Op::Union | Op::Difference) {
        let r_primes_union = calc_primes_union(inner, &decomp_r);
        for &(l_prime, l_sub) in &decomp_l {
            let new_prime = apply(inner, Op::Difference, l_prime, r_primes_union);
            if new_prime == NULL || new_prime == FALSE {
                continue;
            }
            let new_sub = apply(inner, op, l_sub, FALSE);
            if new_sub == NULL || new_sub == FALSE {
                continue;
            }
            candidates.push((new_prime, new_sub));
        }
    }
    // Union is symmetric, so it also needs the mirror pass on the lhs.
    if op == Op::Union {
        let l_primes_union = calc_primes_union(inner, &decomp_l);
        for &(r_prime, r_sub) in &decomp_r {
            let new_prime = apply(inner, Op::Difference, r_prime, l_primes_union);
            if new_prime == NULL || new_prime == FALSE {
                continue;
            }
            let new_sub = apply(inner, op, FALSE, r_sub);
            if new_sub == NULL || new_sub == FALSE {
                continue;
            }
            candidates.push((new_prime, new_sub));
        }
    }

    if candidates.is_empty() {
        inner.cache.write(op, lhs, rhs, FALSE);
        return FALSE;
    }

    let decomposition = compress_candidates(inner, candidates);
    if let Some(result) = zero_suppressed(&decomposition) {
        inner.cache.write(op, lhs, rhs, result);
        return result;
    }

    let result = make_decomposition(inner, decomposition, depend_vtree);
    inner.cache.write(op, lhs, rhs, result);
    result
}

/// If a compressed decomposition has exactly one element and one side of
/// it is `EMPTY`, the decomposition degenerates to the other side — a
/// ZSDD never stores a redundant single-element `(EMPTY, x)` or
/// `(x, EMPTY)` node (§3 invariant: zero-suppression).
fn zero_suppressed(decomposition: &[Element]) -> Option<Address> {
    if decomposition.len() != 1 {
        return None;
    }
    let (prime, sub) = decomposition[0];
    if prime == EMPTY {
        Some(sub)
    } else if sub == EMPTY {
        Some(prime)
    } else {
        None
    }
}

/// Trivial, recursion-free answers for each operation's degenerate
/// combinations of sentinels and same-variable literals. Returning `None`
/// means "fall through to full decomposition alignment".
fn trivial_case(inner: &mut Inner, op: Op, lhs: Address, rhs: Address) -> Option<Address> {
    if lhs == NULL || rhs == NULL {
        return Some(NULL);
    }

    match op {
        Op::Intersection => {
            if lhs == FALSE || rhs == FALSE {
                return Some(FALSE);
            }
            if lhs == rhs {
                return Some(lhs);
            }
            if lhs == EMPTY {
                if let Node::Literal { literal, .. } = get(inner, rhs) {
                    return Some(if *literal < 0 { EMPTY } else { FALSE });
                }
            }
            if lhs >= 0 {
                if let (Node::Literal { literal: l, .. }, Node::Literal { literal: r, .. }) =
                    (get(inner, lhs), get(inner, rhs))
                {
                    return Some(if l.abs() == r.abs() {
                        if *l > 0 {
                            lhs
                        } else {
                            rhs
                        }
                    } else if *l < 0 && *r < 0 {
                        EMPTY
                    } else {
                        FALSE
                    });
                }
            }
            None
        }
        Op::Union => {
            if lhs == EMPTY && rhs == EMPTY {
                return Some(EMPTY);
            }
            if lhs == FALSE {
                return Some(rhs);
            }
            if rhs == FALSE {
                return Some(lhs);
            }
            if lhs == rhs {
                return Some(lhs);
            }
            if lhs == EMPTY {
                if let Node::Literal { literal, .. } = get(inner, rhs) {
                    return Some(if *literal < 0 {
                        rhs
                    } else {
                        make_literal_for_var(inner, -*literal)
                    });
                }
            }
            if lhs >= 0 {
                if let (Node::Literal { literal: l, .. }, Node::Literal { literal: r, .. }) =
                    (get(inner, lhs), get(inner, rhs))
                {
                    if l.abs() == r.abs() {
                        return Some(if *l < 0 { lhs } else { rhs });
                    }
                }
            }
            None
        }
        Op::Difference => {
            if lhs == FALSE {
                return Some(FALSE);
            }
            if rhs == FALSE {
                return Some(lhs);
            }
            if lhs == rhs {
                return Some(FALSE);
            }
            if lhs == EMPTY || rhs == EMPTY {
                if lhs >= 0 {
                    if let Node::Literal { literal, .. } = get(inner, lhs) {
                        return Some(if *literal < 0 {
                            make_literal_for_var(inner, -*literal)
                        } else {
                            lhs
                        });
                    }
                } else if let Node::Literal { literal, .. } = get(inner, rhs) {
                    return Some(if *literal < 0 { FALSE } else { EMPTY });
                }
            }
            if lhs >= 0 && rhs >= 0 {
                if let (Node::Literal { literal: l, .. }, Node::Literal { literal: r, .. }) =
                    (get(inner, lhs), get(inner, rhs))
                {
                    let (l, r) = (*l, *r);
                    if l.abs() == r.abs() {
                        return Some(if l > 0 { FALSE } else { EMPTY });
                    } else if l > 0 {
                        return Some(lhs);
                    } else if r < 0 {
                        return Some(make_literal_for_var(inner, -l));
                    } else {
                        return Some(lhs);
                    }
                }
            }
            None
        }
        Op::OrthogonalJoin => {
            if lhs == FALSE || rhs == FALSE {
                return Some(FALSE);
            }
            if lhs == EMPTY {
                return Some(rhs);
            }
            if rhs == EMPTY {
                return Some(rhs);
            }
            if let (Node::Literal { literal: l, .. }, Node::Literal { literal: r, .. }) =
                (get(inner, lhs), get(inner, rhs))
            {
                if l.abs() == r.abs() {
                    return Some(FALSE);
                }
            }
            None
        }
        _ => unreachable!("trivial_case only handles the four binary ops"),
    }
}

/// Aligns `lhs` and `rhs`'s decompositions onto their vtree LCA, treating
/// a side that doesn't reach the LCA as a single-element decomposition
/// `(EMPTY, x)` or `(x, EMPTY)` depending on which branch it falls under
/// (§4 *Decomposition alignment*).
fn align_decompositions(
    inner: &Inner,
    lhs: Address,
    rhs: Address,
) -> (usize, Vec<Element>, Vec<Element>) {
    if lhs < 0 {
        debug_assert_eq!(lhs, EMPTY);
        let n = get(inner, rhs);
        let vtree = n.vtree();
        let decomp_r = decomposition_of(n);
        return (vtree, vec![(EMPTY, EMPTY)], decomp_r);
    }
    if rhs < 0 {
        debug_assert_eq!(rhs, EMPTY);
        let n = get(inner, lhs);
        let vtree = n.vtree();
        let decomp_l = decomposition_of(n);
        return (vtree, decomp_l, vec![(EMPTY, EMPTY)]);
    }

    let l_node = get(inner, lhs);
    let r_node = get(inner, rhs);
    let l_vtree = l_node.vtree();
    let r_vtree = r_node.vtree();
    let depend = inner.vtree.depend(l_vtree, r_vtree);

    if l_vtree == r_vtree {
        (depend, decomposition_of(l_node), decomposition_of(r_node))
    } else if l_vtree == depend {
        if inner.vtree.is_left_descendant(depend, r_vtree) {
            (depend, decomposition_of(l_node), vec![(rhs, EMPTY)])
        } else {
            (depend, decomposition_of(l_node), vec![(EMPTY, rhs)])
        }
    } else if r_vtree == depend {
        if inner.vtree.is_left_descendant(depend, l_vtree) {
            (depend, vec![(lhs, EMPTY)], decomposition_of(r_node))
        } else {
            (depend, vec![(EMPTY, lhs)], decomposition_of(r_node))
        }
    } else if inner.vtree.is_left_descendant(depend, l_vtree) {
        (depend, vec![(lhs, EMPTY)], vec![(EMPTY, rhs)])
    } else {
        (depend, vec![(EMPTY, lhs)], vec![(rhs, EMPTY)])
    }
}

fn decomposition_of(node: &Node) -> Vec<Element> {
    match node {
        Node::Decomposition { elements, .. } => elements.clone(),
        Node::Literal { .. } => panic!("literal node has no decomposition"),
        Node::Unused => panic!("unused slot has no decomposition"),
    }
}

/// `change`/`filter_contain`/`filter_not_contain`: unary-ish operations
/// parameterized by a single variable rather than a second diagram.
pub(crate) fn apply_with_var(inner: &mut Inner, op: Op, zsdd: Address, var: i64) -> Address {
    debug_assert!(matches!(
        op,
        Op::Change | Op::FilterContain | Op::FilterNotContain
    ));

    if zsdd == FALSE || zsdd == NULL {
        return zsdd;
    }
    if zsdd == EMPTY {
        return match op {
            Op::Change => make_literal_for_var(inner, var),
            Op::FilterContain => FALSE,
            Op::FilterNotContain => EMPTY,
            _ => unreachable!(),
        };
    }

    if let Node::Literal { literal, .. } = get(inner, zsdd) {
        let literal = *literal;
        if literal.abs() == var {
            return match op {
                Op::Change => {
                    if literal < 0 {
                        zsdd
                    } else {
                        EMPTY
                    }
                }
                Op::FilterContain => {
                    if literal < 0 {
                        make_literal_for_var(inner, var)
                    } else {
                        zsdd
                    }
                }
                Op::FilterNotContain => {
                    if literal < 0 {
                        EMPTY
                    } else {
                        FALSE
                    }
                }
                _ => unreachable!(),
            };
        }
    }

    let cached = inner.cache.read(op, zsdd, var);
    if cached != NULL {
        return cached;
    }

    let var_vtree = inner
        .vtree
        .leaf_for_literal(var)
        .expect("var already validated by an earlier call");
    let node_vtree = get(inner, zsdd).vtree();
    let depend = inner.vtree.depend(node_vtree, var_vtree);

    let result = if depend == node_vtree {
        let elements = decomposition_of(get(inner, zsdd));
        let on_left = inner.vtree.is_left_descendant(depend, var_vtree);

        let mut candidates = Vec::new();
        for (prime, sub) in elements {
            if on_left {
                let new_prime = apply_with_var(inner, op, prime, var);
                if new_prime == FALSE {
                    continue;
                }
                candidates.push((new_prime, sub));
            } else {
                let new_sub = apply_with_var(inner, op, sub, var);
                if new_sub == FALSE {
                    continue;
                }
                candidates.push((prime, new_sub));
            }
        }

        if candidates.is_empty() {
            FALSE
        } else {
            let decomposition = compress_candidates(inner, candidates);
            match zero_suppressed(&decomposition) {
                Some(addr) => addr,
                None => make_decomposition(inner, decomposition, depend),
            }
        }
    } else {
        match op {
            Op::Change => {
                let new_literal = make_literal_for_var(inner, var);
                let element = if inner.vtree.is_left_descendant(depend, var_vtree) {
                    (new_literal, zsdd)
                } else {
                    (zsdd, new_literal)
                };
                make_decomposition(inner, vec![element], depend)
            }
            Op::FilterContain => FALSE,
            Op::FilterNotContain => zsdd,
            _ => unreachable!(),
        }
    };

    inner.cache.write(op, zsdd, var, result);
    result
}

/// The power set of the variables under `vtree_node`: `{∅,{v}}` at every
/// leaf, joined pairwise up to `vtree_node`.
pub(crate) fn make_powerset(inner: &mut Inner, vtree_node: usize) -> Address {
    match inner.vtree.node(vtree_node) {
        VTreeNode::Leaf { var } => make_literal_at(inner, -var, vtree_node),
        VTreeNode::Internal { left, right } => {
            let cached = inner.cache.read(Op::PowerSet, vtree_node as Address, vtree_node as Address);
            if cached != NULL {
                return cached;
            }
            let prime = make_powerset(inner, left);
            let sub = make_powerset(inner, right);
            let result = make_decomposition(inner, vec![(prime, sub)], vtree_node);
            inner
                .cache
                .write(Op::PowerSet, vtree_node as Address, vtree_node as Address, result);
            result
        }
    }
}

/// Rewrites every decomposition reachable from `zsdd` so it explicitly
/// lists all of the left powerset's elements, adding a `(leftover, FALSE)`
/// element for whatever the implicit partition didn't cover (§7).
pub(crate) fn to_explicit_form(inner: &mut Inner, zsdd: Address) -> Address {
    if zsdd < 0 {
        return zsdd;
    }
    if matches!(get(inner, zsdd), Node::Literal { .. }) {
        return zsdd;
    }

    let cached = inner.cache.read(Op::ExplicitForm, zsdd, zsdd);
    if cached != NULL {
        return cached;
    }

    let vtree_node = get(inner, zsdd).vtree();
    let left = inner.vtree.left(vtree_node);
    let mut leftover = make_powerset(inner, left);

    let elements = decomposition_of(get(inner, zsdd));
    let mut decomposition = Vec::with_capacity(elements.len() + 1);
    for (prime, sub) in elements {
        leftover = apply(inner, Op::Difference, leftover, prime);
        let new_prime = to_explicit_form(inner, prime);
        let new_sub = to_explicit_form(inner, sub);
        if new_prime == FALSE {
            continue;
        }
        decomposition.push((new_prime, new_sub));
    }

    leftover = to_explicit_form(inner, leftover);
    if leftover != FALSE {
        decomposition.push((leftover, FALSE));
    }

    let result = make_decomposition(inner, decomposition, vtree_node);
    inner.cache.write(Op::ExplicitForm, zsdd, zsdd, result);
    result
}

/// Number of sets in `zsdd`'s family, memoized by address within this one
/// call (not in the shared operation cache — this walk never mutates the
/// diagram, so it gets its own throwaway memo).
pub(crate) fn count_solutions(
    inner: &Inner,
    zsdd: Address,
    memo: &mut HashMap<Address, u64>,
) -> u64 {
    if zsdd == EMPTY {
        return 1;
    }
    if zsdd == FALSE {
        return 0;
    }
    if let Some(&c) = memo.get(&zsdd) {
        return c;
    }

    let count = match get(inner, zsdd) {
        Node::Literal { literal, .. } => {
            if *literal < 0 {
                2
            } else {
                1
            }
        }
        Node::Decomposition { elements, .. } => elements
            .iter()
            .map(|&(p, s)| count_solutions(inner, p, memo) * count_solutions(inner, s, memo))
            .sum(),
        Node::Unused => panic!("unused slot reachable from a live handle"),
    };
    memo.insert(zsdd, count);
    count
}

/// Number of distinct decomposition elements reachable from `zsdd`,
/// walked iteratively to mirror [`crate::node::retain`]'s depth safety.
pub(crate) fn size(inner: &Inner, zsdd: Address) -> u64 {
    if zsdd < 0 {
        return 0;
    }
    let reachable = crate::manager::reachable(inner, zsdd);
    reachable
        .iter()
        .filter_map(|&addr| {
            if addr < 0 {
                None
            } else if let Node::Decomposition { elements, .. } = get(inner, addr) {
                Some(elements.len() as u64)
            } else {
                None
            }
        })
        .sum()
}

/// Every set in `zsdd`'s family as a sorted-by-construction list of
/// variables. Exponential; for small diagrams and tests only.
pub(crate) fn calc_setfamily(
    inner: &Inner,
    zsdd: Address,
    memo: &mut FxHashMap<Address, Vec<Vec<i64>>>,
) -> Vec<Vec<i64>> {
    if zsdd == EMPTY {
        return vec![Vec::new()];
    }
    if zsdd == FALSE {
        return Vec::new();
    }
    if let Some(v) = memo.get(&zsdd) {
        return v.clone();
    }

    let result = match get(inner, zsdd) {
        Node::Literal { literal, .. } => {
            if *literal < 0 {
                vec![Vec::new(), vec![-literal]]
            } else {
                vec![vec![*literal]]
            }
        }
        Node::Decomposition { elements, .. } => {
            let mut v = Vec::new();
            for &(prime, sub) in elements {
                let primes = calc_setfamily(inner, prime, memo);
                let subs = calc_setfamily(inner, sub, memo);
                for p in &primes {
                    for s in &subs {
                        let mut combined = p.clone();
                        combined.extend_from_slice(s);
                        v.push(combined);
                    }
                }
            }
            v
        }
        Node::Unused => panic!("unused slot reachable from a live handle"),
    };
    memo.insert(zsdd, result.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vtree::VTree;

    fn fresh(num_vars: usize) -> Inner {
        Inner {
            vtree: VTree::right_linear(num_vars),
            nodes: crate::node::NodeTable::new(),
            cache: crate::cache::CacheTable::new(),
        }
    }

    #[test]
    fn union_with_false_is_identity() {
        let mut inner = fresh(2);
        let lit = make_literal(&mut inner, 1).unwrap();
        assert_eq!(apply(&mut inner, Op::Union, lit, FALSE), lit);
    }

    #[test]
    fn union_of_literal_with_itself_is_idempotent() {
        let mut inner = fresh(2);
        let lit = make_literal(&mut inner, 1).unwrap();
        assert_eq!(apply(&mut inner, Op::Union, lit, lit), lit);
    }

    #[test]
    fn intersection_of_opposite_literals_is_false() {
        let mut inner = fresh(2);
        let pos = make_literal(&mut inner, 1).unwrap();
        let neg = make_literal(&mut inner, -1).unwrap();
        assert_eq!(apply(&mut inner, Op::Intersection, pos, neg), FALSE);
    }

    #[test]
    fn orthogonal_join_with_base_set_is_identity() {
        let mut inner = fresh(2);
        let lit = make_literal(&mut inner, 1).unwrap();
        assert_eq!(apply(&mut inner, Op::OrthogonalJoin, lit, EMPTY), lit);
    }

    #[test]
    fn powerset_counts_two_to_the_n() {
        let mut inner = fresh(3);
        let ps = make_powerset(&mut inner, inner.vtree.root());
        let mut memo = HashMap::new();
        assert_eq!(count_solutions(&inner, ps, &mut memo), 8);
    }

    #[test]
    fn change_on_base_set_makes_singleton_literal() {
        let mut inner = fresh(2);
        let result = apply_with_var(&mut inner, Op::Change, EMPTY, 1);
        let direct = make_literal(&mut inner, 1).unwrap();
        assert_eq!(result, direct);
    }

    #[test]
    fn filter_contain_then_not_contain_partitions_powerset() {
        let mut inner = fresh(3);
        let ps = make_powerset(&mut inner, inner.vtree.root());
        let contains = apply_with_var(&mut inner, Op::FilterContain, ps, 2);
        let not_contains = apply_with_var(&mut inner, Op::FilterNotContain, ps, 2);
        let mut memo = HashMap::new();
        let total =
            count_solutions(&inner, contains, &mut memo) + count_solutions(&inner, not_contains, &mut memo);
        assert_eq!(total, count_solutions(&inner, ps, &mut memo));
    }

    #[test]
    fn explicit_form_preserves_solution_count() {
        let mut inner = fresh(3);
        let a = make_literal(&mut inner, 1).unwrap();
        let b = make_literal(&mut inner, -2).unwrap();
        let family = apply(&mut inner, Op::OrthogonalJoin, a, b);
        let explicit = to_explicit_form(&mut inner, family);
        let mut memo = HashMap::new();
        assert_eq!(
            count_solutions(&inner, family, &mut memo),
            count_solutions(&inner, explicit, &mut memo)
        );
    }
}
