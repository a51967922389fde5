//! Text and DOT exporters (§6 *External interfaces*). Both are pure
//! collaborator-facing views over a manager's arena: no I/O happens inside
//! the core beyond writing to the sink the caller supplies, and neither
//! exporter ever allocates, interns, or mutates a node.

use std::collections::BTreeMap;
use std::io::{self, Write};

use rustc_hash::FxHashSet;

use crate::addr::{Address, EMPTY, FALSE};
use crate::manager::Inner;
use crate::node::Node;

fn lit_symbol(literal: i64) -> String {
    let mut s = String::new();
    if literal < 0 {
        s.push('±');
    }
    let v = literal.unsigned_abs();
    if v >= 1 && v <= 26 {
        s.push((b'A' + (v - 1) as u8) as char);
    } else {
        s.push_str(&v.to_string());
    }
    s
}

/// Bottom-up text export: a fixed comment header, then `E`/`F` sentinel
/// ids, then one `L`/`D` line per reachable node with children emitted
/// before parents (§6 *Text export format*).
pub(crate) fn write_text(inner: &Inner, zsdd: Address, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "c ids of zsdd nodes start at 0")?;
    writeln!(out, "c zsdd nodes appear bottom-up, children before parents")?;
    writeln!(out, "c the empty constant node corresponds to id -1")?;
    writeln!(out, "c the false constant node corresponds to id -2")?;
    writeln!(out, "c")?;
    writeln!(out, "c file syntax:")?;
    writeln!(out, "c zsdd count-of-zsdd-nodes")?;
    writeln!(out, "c E id-of-empty-zsdd-node")?;
    writeln!(out, "c F id-of-false-zsdd-node")?;
    writeln!(out, "c L id-of-literal-zsdd-node id-of-vtree literal")?;
    writeln!(
        out,
        "c D id-of-decomposition-zsdd-node id-of-vtree number-of-elements {{id-of-prime id-of-sub}}*"
    )?;
    writeln!(out, "c")?;

    if zsdd == EMPTY {
        writeln!(out, "zsdd ")?;
        writeln!(out, "E 0")?;
        return Ok(());
    }
    if zsdd == FALSE {
        writeln!(out, "zsdd ")?;
        writeln!(out, "F 0")?;
        return Ok(());
    }

    let size = crate::apply::size(inner, zsdd);
    writeln!(out, "zsdd {size}")?;
    let empty_id = inner.nodes.len() as Address;
    let false_id = empty_id + 1;
    writeln!(out, "E {empty_id}")?;
    writeln!(out, "F {false_id}")?;

    let mut found = FxHashSet::default();
    write_text_inner(inner, zsdd, out, &mut found, empty_id, false_id)
}

fn rewrite_ref(addr: Address, empty_id: Address, false_id: Address) -> Address {
    if addr == EMPTY {
        empty_id
    } else if addr == FALSE {
        false_id
    } else {
        addr
    }
}

fn write_text_inner(
    inner: &Inner,
    zsdd: Address,
    out: &mut dyn Write,
    found: &mut FxHashSet<Address>,
    empty_id: Address,
    false_id: Address,
) -> io::Result<()> {
    let node = inner.nodes.get(zsdd);
    match node {
        Node::Literal { literal, vtree } => {
            writeln!(out, "L {zsdd} {vtree} {literal}")
        }
        Node::Decomposition { vtree, elements, .. } => {
            for &(p, s) in elements {
                if p >= 0 && found.insert(p) {
                    write_text_inner(inner, p, out, found, empty_id, false_id)?;
                }
                if s >= 0 && found.insert(s) {
                    write_text_inner(inner, s, out, found, empty_id, false_id)?;
                }
            }
            write!(out, "D {zsdd} {vtree} {}", elements.len())?;
            for &(p, s) in elements {
                write!(
                    out,
                    " {} {}",
                    rewrite_ref(p, empty_id, false_id),
                    rewrite_ref(s, empty_id, false_id)
                )?;
            }
            writeln!(out)
        }
        Node::Unused => unreachable!("unused slot reachable from a live handle"),
    }
}

/// Graphviz DOT export: `rank=same` groupings per vtree level, circle nodes
/// for decompositions, two-column record nodes per element (§6 *DOT export
/// format*).
pub(crate) fn write_dot(inner: &Inner, zsdd: Address, out: &mut dyn Write) -> io::Result<()> {
    let is_literal = zsdd >= 0 && matches!(inner.nodes.get(zsdd), Node::Literal { .. });
    if zsdd < 0 || is_literal {
        let symbol = if zsdd == EMPTY {
            "ε".to_string()
        } else if zsdd == FALSE {
            "⊥".to_string()
        } else if let Node::Literal { literal, .. } = inner.nodes.get(zsdd) {
            lit_symbol(*literal)
        } else {
            unreachable!()
        };
        writeln!(out, "digraph zsdd {{")?;
        writeln!(out, "overlap=false")?;
        writeln!(
            out,
            "n1 [label=\"{symbol}\",shape=record,fontsize=20,fontname=\"Times-Italic\",fillcolor=white,style=filled,fixedsize=true,height=.30,width=.45];"
        )?;
        writeln!(out, "}}")?;
        return Ok(());
    }

    let mut same_level: BTreeMap<usize, Vec<Address>> = BTreeMap::new();
    let mut visited = FxHashSet::default();
    let mut stack = vec![zsdd];
    visited.insert(zsdd);
    while let Some(addr) = stack.pop() {
        if let Node::Decomposition { vtree, elements, .. } = inner.nodes.get(addr) {
            same_level.entry(*vtree).or_default().push(addr);
            for &(p, s) in elements {
                if p >= 0 && visited.insert(p) {
                    stack.push(p);
                }
                if s >= 0 && visited.insert(s) {
                    stack.push(s);
                }
            }
        }
    }

    writeln!(out, "digraph zsdd {{")?;
    writeln!(out, "overlap=false")?;
    for ids in same_level.values() {
        write!(out, "{{rank=same;")?;
        for id in ids {
            write!(out, " n{id}")?;
        }
        writeln!(out, "}}")?;
    }

    let mut visited = FxHashSet::default();
    let mut stack = vec![zsdd];
    visited.insert(zsdd);
    while let Some(addr) = stack.pop() {
        if let Node::Decomposition { vtree, elements, .. } = inner.nodes.get(addr) {
            writeln!(
                out,
                "n{addr}[label=\"{vtree}\",style=filled,fillcolor=gray95,shape=circle,height=.25,width=.25];"
            )?;
            for (i, &(p, s)) in elements.iter().enumerate() {
                let p_sym = element_symbol(inner, p, &mut visited, &mut stack);
                let s_sym = element_symbol(inner, s, &mut visited, &mut stack);
                let nid = format!("n{addr}e{i}");
                writeln!(
                    out,
                    "{nid} [label=\"<L>{p_sym}|<R>{s_sym}\",shape=record,fontsize=20,fontname=\"Times-Italic\",fillcolor=white,style=filled,fixedsize=true,height=.30,width=.65];"
                )?;
                writeln!(out, "n{addr}->{nid} [arrowsize=.50];")?;
                if p_sym.is_empty() {
                    writeln!(
                        out,
                        "{nid}:L:c->n{p} [arrowsize=.50,tailclip=false,arrowtail=dot,dir=both];"
                    )?;
                }
                if s_sym.is_empty() {
                    writeln!(
                        out,
                        "{nid}:R:c->n{s} [arrowsize=.50,tailclip=false,arrowtail=dot,dir=both];"
                    )?;
                }
            }
        }
    }
    writeln!(out, "}}")?;
    Ok(())
}

/// Renders an element's prime/sub as an inline symbol when it's a sentinel
/// or literal; schedules it for its own circle node (and returns an empty
/// label, which the caller reads as "draw a pointer edge instead") when
/// it's an unvisited decomposition.
fn element_symbol(
    inner: &Inner,
    addr: Address,
    visited: &mut FxHashSet<Address>,
    stack: &mut Vec<Address>,
) -> String {
    if addr == EMPTY {
        return "ε".to_string();
    }
    if addr == FALSE {
        return "⊥".to_string();
    }
    match inner.nodes.get(addr) {
        Node::Literal { literal, .. } => lit_symbol(*literal),
        Node::Decomposition { .. } => {
            if visited.insert(addr) {
                stack.push(addr);
            }
            String::new()
        }
        Node::Unused => unreachable!("unused slot reachable from a live handle"),
    }
}
