//! SDD-format vtree file parsing (§6 *SDD-format vtree file*).

use std::fs;
use std::path::Path;

use zsdd::VTreeNode;

use crate::error::CliError;

pub fn parse(path: &Path) -> Result<zsdd::VTree, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut specs: Vec<Option<VTreeNode>> = Vec::new();
    let mut header_seen = false;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('c') {
            continue;
        }

        if !header_seen {
            let mut fields = line.split_whitespace();
            let tag = fields.next().ok_or_else(|| parse_err(path, line_no, "empty header line"))?;
            if tag != "vtree" {
                return Err(parse_err(path, line_no, "expected 'vtree' header"));
            }
            let num_nodes: usize = fields
                .next()
                .ok_or_else(|| parse_err(path, line_no, "header missing node count"))?
                .parse()
                .map_err(|_| parse_err(path, line_no, "node count isn't an integer"))?;
            specs = vec![None; num_nodes];
            header_seen = true;
            continue;
        }

        let mut fields = line.split_whitespace();
        let tag = fields.next().ok_or_else(|| parse_err(path, line_no, "empty node line"))?;
        match tag {
            "L" => {
                let id: usize = parse_field(path, line_no, fields.next())?;
                let var: i64 = parse_field(path, line_no, fields.next())?;
                set_spec(path, line_no, &mut specs, id, VTreeNode::Leaf { var })?;
            }
            "I" => {
                let id: usize = parse_field(path, line_no, fields.next())?;
                let left: usize = parse_field(path, line_no, fields.next())?;
                let right: usize = parse_field(path, line_no, fields.next())?;
                set_spec(path, line_no, &mut specs, id, VTreeNode::Internal { left, right })?;
            }
            _ => return Err(parse_err(path, line_no, "expected 'L' or 'I' node line")),
        }
    }

    if !header_seen {
        return Err(parse_err(path, 0, "missing vtree header"));
    }
    let nodes: Vec<VTreeNode> = specs
        .into_iter()
        .enumerate()
        .map(|(id, spec)| spec.ok_or_else(|| parse_err(path, id, "vtree id never defined")))
        .collect::<Result<_, _>>()?;

    Ok(zsdd::VTree::from_specs(nodes))
}

fn parse_field<T: std::str::FromStr>(
    path: &Path,
    line: usize,
    field: Option<&str>,
) -> Result<T, CliError> {
    field
        .ok_or_else(|| parse_err(path, line, "node line missing a field"))?
        .parse()
        .map_err(|_| parse_err(path, line, "node field isn't an integer"))
}

fn set_spec(
    path: &Path,
    line: usize,
    specs: &mut [Option<VTreeNode>],
    id: usize,
    node: VTreeNode,
) -> Result<(), CliError> {
    let slot = specs
        .get_mut(id)
        .ok_or_else(|| parse_err(path, line, "node id out of range"))?;
    *slot = Some(node);
    Ok(())
}

fn parse_err(path: &Path, line: usize, message: &str) -> CliError {
    CliError::Parse {
        path: path.display().to_string(),
        line: line + 1,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_leaf_and_internal_lines() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "c comment\nvtree 3\nL 0 1\nL 1 2\nI 2 0 1\n").unwrap();
        let vt = parse(f.path()).unwrap();
        assert_eq!(vt.len(), 3);
        assert_eq!(vt.root(), 2);
        assert!(vt.is_leaf(vt.leaf_for_literal(1).unwrap()));
    }
}
