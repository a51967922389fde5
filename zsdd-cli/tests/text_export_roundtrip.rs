//! Exercises the end-to-end DIMACS -> ZSDD -> text export path and an
//! independent offline parser for the text format (§8 property 10:
//! export/re-import round-trips to an equal set family).

use std::collections::HashMap;
use std::io::Write;

use zsdd::{Manager, VTree};
use zsdd_cli::compile;

/// A parsed text-export node, independent of `zsdd`'s own node table —
/// deliberately a separate reimplementation so the round-trip test isn't
/// just checking the exporter against itself.
#[derive(Debug, Clone)]
enum ParsedNode {
    Literal(i64),
    Decomposition(Vec<(i64, i64)>),
}

struct ParsedDiagram {
    nodes: HashMap<i64, ParsedNode>,
    empty_id: i64,
    false_id: i64,
    root: RootKind,
}

enum RootKind {
    Empty,
    False,
    Node(i64),
}

fn parse_text_export(text: &str) -> ParsedDiagram {
    let mut lines = text.lines().filter(|l| !l.starts_with('c'));
    let header = lines.next().expect("zsdd header line");
    let mut header_fields = header.split_whitespace();
    assert_eq!(header_fields.next(), Some("zsdd"));
    let count: Option<usize> = header_fields.next().and_then(|s| s.parse().ok());

    let mut nodes = HashMap::new();
    let mut empty_id = -1;
    let mut false_id = -2;
    let mut root = RootKind::Node(-100);
    let mut last_node_id = None;

    for line in lines {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("E") => {
                let id: i64 = fields.next().unwrap().parse().unwrap();
                empty_id = id;
                if count.is_none() {
                    root = RootKind::Empty;
                }
            }
            Some("F") => {
                let id: i64 = fields.next().unwrap().parse().unwrap();
                false_id = id;
                if count.is_none() {
                    root = RootKind::False;
                }
            }
            Some("L") => {
                let id: i64 = fields.next().unwrap().parse().unwrap();
                let _vtree: i64 = fields.next().unwrap().parse().unwrap();
                let lit: i64 = fields.next().unwrap().parse().unwrap();
                nodes.insert(id, ParsedNode::Literal(lit));
                last_node_id = Some(id);
            }
            Some("D") => {
                let id: i64 = fields.next().unwrap().parse().unwrap();
                let _vtree: i64 = fields.next().unwrap().parse().unwrap();
                let k: usize = fields.next().unwrap().parse().unwrap();
                let mut elements = Vec::with_capacity(k);
                for _ in 0..k {
                    let p: i64 = fields.next().unwrap().parse().unwrap();
                    let s: i64 = fields.next().unwrap().parse().unwrap();
                    elements.push((p, s));
                }
                nodes.insert(id, ParsedNode::Decomposition(elements));
                last_node_id = Some(id);
            }
            _ => {}
        }
    }

    if count.is_some() {
        root = RootKind::Node(last_node_id.expect("at least one node line for a non-trivial zsdd"));
    }

    ParsedDiagram {
        nodes,
        empty_id,
        false_id,
        root,
    }
}

fn parsed_count(diagram: &ParsedDiagram, id: i64, memo: &mut HashMap<i64, u64>) -> u64 {
    if id == diagram.empty_id {
        return 1;
    }
    if id == diagram.false_id {
        return 0;
    }
    if let Some(&c) = memo.get(&id) {
        return c;
    }
    let count = match &diagram.nodes[&id] {
        ParsedNode::Literal(lit) => {
            if *lit < 0 {
                2
            } else {
                1
            }
        }
        ParsedNode::Decomposition(elements) => elements
            .iter()
            .map(|&(p, s)| parsed_count(diagram, p, memo) * parsed_count(diagram, s, memo))
            .sum(),
    };
    memo.insert(id, count);
    count
}

fn parsed_root_count(diagram: &ParsedDiagram) -> u64 {
    match diagram.root {
        RootKind::Empty => 1,
        RootKind::False => 0,
        RootKind::Node(id) => parsed_count(diagram, id, &mut HashMap::new()),
    }
}

#[test]
fn cnf_compile_and_text_export_round_trips_model_count() {
    let mgr = Manager::new(VTree::right_linear(3));
    let cnf = vec![vec![1, 2], vec![-1, 3]];
    let z = compile::compile_cnf(&mgr, &cnf, 3);
    assert_eq!(mgr.count(&z), 4);

    let mut buf = Vec::new();
    mgr.export_text(&z, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();

    let parsed = parse_text_export(&text);
    assert_eq!(parsed_root_count(&parsed), mgr.count(&z));
}

#[test]
fn explicit_form_round_trips_model_count() {
    let mgr = Manager::new(VTree::right_linear(3));
    let cnf = vec![vec![1, 2], vec![-1, 3]];
    let z = compile::compile_cnf(&mgr, &cnf, 3);
    let explicit = mgr.to_explicit_form(&z);

    let mut buf = Vec::new();
    mgr.export_text(&explicit, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();

    let parsed = parse_text_export(&text);
    assert_eq!(parsed_root_count(&parsed), mgr.count(&explicit));
}

#[test]
fn empty_root_exports_minimal_form() {
    let mgr = Manager::new(VTree::right_linear(1));
    let mut buf = Vec::new();
    mgr.export_text(&mgr.base_set(), &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let parsed = parse_text_export(&text);
    assert_eq!(parsed_root_count(&parsed), 1);
}

#[test]
fn dot_export_runs_on_a_multi_element_diagram() {
    let mgr = Manager::new(VTree::right_linear(3));
    let cnf = vec![vec![1, 2], vec![-1, 3]];
    let z = compile::compile_cnf(&mgr, &cnf, 3);
    let mut buf = Vec::new();
    mgr.export_dot(&z, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.starts_with("digraph zsdd {"));
}

#[test]
fn vtree_file_round_trips_through_the_parser() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "c a right-leaning tree over 3 vars").unwrap();
    writeln!(f, "vtree 5").unwrap();
    writeln!(f, "L 1 1").unwrap();
    writeln!(f, "L 3 2").unwrap();
    writeln!(f, "L 4 3").unwrap();
    writeln!(f, "I 2 3 4").unwrap();
    writeln!(f, "I 0 1 2").unwrap();
    f.flush().unwrap();

    let vt = zsdd_cli::vtree_file::parse(f.path()).unwrap();
    assert_eq!(vt.len(), 5);
    assert_eq!(vt.root(), 0);
}
