//! CNF/DNF assembly loop (§6 collaborator, supplemented from
//! `examples/original_source/lib/main.cc`'s `compile_cnf`/`compile_dnf`).
//!
//! This is deliberately a line-for-line port of the original's structure,
//! not a rediscovery: `make_power_set` orthogonal-joins in a `-i` literal
//! per id, a CNF clause is `powerset(vars) - unsat`, a DNF term is
//! `change`-built from its positive literals, and both are folded pairwise
//! (`intersection` for CNF, `union` for DNF) in a balanced binary
//! reduction with a `gc()` after every level.

use zsdd::{Handle, Manager};

/// `{∅,{i}} ⊗ {∅,{j}} ⊗ ...` over `ids`, sorted ascending — "every subset
/// of `ids` is allowed".
pub fn make_power_set(mgr: &Manager, ids: &[i64]) -> Handle {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut z = mgr.base_set();
    for id in sorted {
        let lit = mgr
            .literal(-id)
            .expect("variable ids passed to make_power_set are validated against the vtree");
        z = mgr.orthogonal_join(&z, &lit);
    }
    z
}

fn make_cnf_clause(mgr: &Manager, clause: &[i64], all_variables: &[i64]) -> Handle {
    let cls_vars: Vec<i64> = clause.iter().map(|l| l.abs()).collect();
    let diff: Vec<i64> = all_variables
        .iter()
        .copied()
        .filter(|v| !cls_vars.contains(v))
        .collect();

    let diff_set = make_power_set(mgr, &diff);
    let clause_set = make_power_set(mgr, &cls_vars);

    let mut unsat_set = clause_set.clone();
    for &l in clause {
        unsat_set = if l > 0 {
            mgr.filter_not_contain(&unsat_set, l)
        } else {
            mgr.filter_contain(&unsat_set, -l)
        };
    }
    let clause_set = mgr.difference(&clause_set, &unsat_set);
    mgr.orthogonal_join(&clause_set, &diff_set)
}

fn make_dnf_term(mgr: &Manager, term: &[i64], all_variables: &[i64]) -> Handle {
    let term_vars: Vec<i64> = term.iter().filter(|l| **l > 0).map(|l| l.abs()).collect();
    // A negative literal's variable is still pulled out of `diff` even
    // though it never reaches `change` below — the original does
    // `diff.erase(abs(l))` for every literal in the term, positive or
    // negative, so a negative literal fixes its variable to "absent"
    // rather than leaving it free in the trailing powerset
    // (SPEC_FULL supplement 4).
    let mentioned: Vec<i64> = term.iter().map(|l| l.abs()).collect();
    let diff: Vec<i64> = all_variables
        .iter()
        .copied()
        .filter(|v| !mentioned.contains(v))
        .collect();

    let diff_set = make_power_set(mgr, &diff);
    let mut term_set = mgr.base_set();
    for v in term_vars {
        term_set = mgr.change(&term_set, v);
    }
    mgr.orthogonal_join(&term_set, &diff_set)
}

/// Folds `items` pairwise with `combine`, calling `mgr.gc()` after every
/// reduction level to bound peak node count — preserved from the original
/// even though it means GC runs mid-compilation, not just once at the end.
fn balanced_reduce(mgr: &Manager, mut items: Vec<Handle>, combine: impl Fn(&Handle, &Handle) -> Handle) -> Handle {
    while items.len() > 1 {
        let mut next = Vec::with_capacity((items.len() + 1) / 2);
        let mut it = items.into_iter();
        while let Some(a) = it.next() {
            match it.next() {
                Some(b) => next.push(combine(&a, &b)),
                None => next.push(a),
            }
        }
        items = next;
        mgr.gc();
    }
    items.into_iter().next().expect("balanced_reduce called on an empty list")
}

pub fn compile_cnf(mgr: &Manager, cnf: &[Vec<i64>], num_variables: usize) -> Handle {
    let all_variables: Vec<i64> = (1..=num_variables as i64).collect();
    let clauses: Vec<Handle> = cnf
        .iter()
        .map(|clause| make_cnf_clause(mgr, clause, &all_variables))
        .collect();
    balanced_reduce(mgr, clauses, |a, b| mgr.intersection(a, b))
}

pub fn compile_dnf(mgr: &Manager, dnf: &[Vec<i64>], num_variables: usize) -> Handle {
    let all_variables: Vec<i64> = (1..=num_variables as i64).collect();
    let terms: Vec<Handle> = dnf
        .iter()
        .map(|term| make_dnf_term(mgr, term, &all_variables))
        .collect();
    mgr.gc();
    balanced_reduce(mgr, terms, |a, b| mgr.union(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zsdd::VTree;

    fn manager(num_vars: usize) -> Manager {
        Manager::new(VTree::right_linear(num_vars))
    }

    /// S1: universe {1,2}; CNF `(1 ∨ 2)` has count 3, models {{1},{2},{1,2}}.
    #[test]
    fn s1_cnf_disjunction_of_two_vars() {
        let mgr = manager(2);
        let z = compile_cnf(&mgr, &[vec![1, 2]], 2);
        assert_eq!(mgr.count(&z), 3);
        let mut sets = mgr.explicit_sets(&z);
        for s in sets.iter_mut() {
            s.sort();
        }
        sets.sort();
        assert_eq!(sets, vec![vec![1], vec![1, 2], vec![2]]);
    }

    /// S2: DNF `(1) ∨ (2)` over the same universe has the same set family.
    #[test]
    fn s2_dnf_matches_s1() {
        let mgr = manager(2);
        let z = compile_dnf(&mgr, &[vec![1], vec![2]], 2);
        assert_eq!(mgr.count(&z), 3);
        let mut sets = mgr.explicit_sets(&z);
        for s in sets.iter_mut() {
            s.sort();
        }
        sets.sort();
        assert_eq!(sets, vec![vec![1], vec![1, 2], vec![2]]);
    }

    /// S3: universe {1,2,3}; CNF `(1∨2) ∧ (¬1∨3)` has count 4, models
    /// {{2},{1,3},{2,3},{1,2,3}}.
    #[test]
    fn s3_cnf_two_clauses() {
        let mgr = manager(3);
        let z = compile_cnf(&mgr, &[vec![1, 2], vec![-1, 3]], 3);
        assert_eq!(mgr.count(&z), 4);
        let mut sets = mgr.explicit_sets(&z);
        for s in sets.iter_mut() {
            s.sort();
        }
        sets.sort();
        assert_eq!(
            sets,
            vec![vec![1, 2, 3], vec![1, 3], vec![2], vec![2, 3]]
        );
    }

    #[test]
    fn dnf_negative_literal_fixes_its_variable_absent() {
        let mgr = manager(2);
        // `(1 ∧ ¬2)` fixes variable 2 out of the trailing powerset, leaving
        // only `{1}`; `(1)` alone leaves variable 2 free, giving `{1},{1,2}}`.
        let with_neg = compile_dnf(&mgr, &[vec![1, -2]], 2);
        let without_neg = compile_dnf(&mgr, &[vec![1]], 2);
        assert_eq!(mgr.count(&with_neg), 1);
        assert_eq!(mgr.count(&without_neg), 2);
        assert_ne!(with_neg.addr(), without_neg.addr());
    }

    #[test]
    fn power_set_of_empty_ids_is_base_set() {
        let mgr = manager(2);
        let ps = make_power_set(&mgr, &[]);
        assert_eq!(ps.addr(), mgr.base_set().addr());
    }
}
