//! Concrete core-level scenarios from §8 (S4-S6). S1-S3 exercise the
//! CNF/DNF assembly loop, a `zsdd-cli` collaborator concern, and live in
//! that crate's test suite instead.

use zsdd::{Manager, VTree};

fn manager(num_vars: usize) -> Manager {
    Manager::new(VTree::right_linear(num_vars))
}

/// S4: universe {1}; `+1` has count 1 and family `{{1}}`; `-1` has count 2
/// and family `{∅,{1}}`.
#[test]
fn s4_single_variable_literals() {
    let mgr = manager(1);
    let pos = mgr.literal(1).unwrap();
    assert_eq!(mgr.count(&pos), 1);
    assert_eq!(mgr.explicit_sets(&pos), vec![vec![1]]);

    let neg = mgr.literal(-1).unwrap();
    assert_eq!(mgr.count(&neg), 2);
    let mut sets = mgr.explicit_sets(&neg);
    sets.sort();
    assert_eq!(sets, vec![Vec::<i64>::new(), vec![1]]);
}

/// S5: universe {1,2,3,4}; `join(+1, +3)` has count 1, family `{{1,3}}`;
/// `join(+1, +1)` is `FALSE` (same variable can't appear on both sides of
/// an orthogonal join).
#[test]
fn s5_orthogonal_join_disjoint_vs_overlapping() {
    let mgr = manager(4);
    let a = mgr.literal(1).unwrap();
    let c = mgr.literal(3).unwrap();
    let joined = mgr.orthogonal_join(&a, &c);
    assert_eq!(mgr.count(&joined), 1);
    assert_eq!(mgr.explicit_sets(&joined), vec![vec![1, 3]]);

    let overlapping = mgr.orthogonal_join(&a, &a);
    assert_eq!(overlapping.addr(), mgr.empty().addr());
}

/// S6: universe {1,2}; `change(-1, 1) = +1`; `filter_contain(-1, 1) = +1`;
/// `filter_not_contain(-1, 1) = EMPTY`.
#[test]
fn s6_variable_ops_on_negative_literal() {
    let mgr = manager(2);
    let neg = mgr.literal(-1).unwrap();
    let pos = mgr.literal(1).unwrap();

    assert_eq!(mgr.change(&neg, 1).addr(), pos.addr());
    assert_eq!(mgr.filter_contain(&neg, 1).addr(), pos.addr());
    assert_eq!(mgr.filter_not_contain(&neg, 1).addr(), mgr.base_set().addr());
}

#[test]
fn unknown_variable_is_an_error() {
    let mgr = manager(2);
    assert!(mgr.literal(99).is_err());
}
