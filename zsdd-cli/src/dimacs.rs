//! DIMACS-shaped CNF/DNF file parsing (§6 *DIMACS input*).
//!
//! Both forms share a syntax: `c`-prefixed comment lines, a header
//! `p <form> <num_vars> <num_clauses>`, then one zero-terminated,
//! whitespace-separated line of signed integers per clause/term. Which
//! form a file holds is a caller decision (`-c` vs `-d`), not something
//! this parser infers from the header's `<form>` token.

use std::fs;
use std::path::Path;

use crate::error::CliError;

/// A parsed CNF or DNF file: the declared variable universe size and one
/// clause/term per line, literal terminators already stripped.
pub struct Fnf {
    pub num_variables: usize,
    pub clauses: Vec<Vec<i64>>,
}

pub fn parse(path: &Path) -> Result<Fnf, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut num_variables = None;
    let mut clauses = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('c') {
            continue;
        }

        if num_variables.is_none() {
            let mut fields = line.split_whitespace();
            let tag = fields.next().ok_or_else(|| parse_err(path, line_no, "empty header line"))?;
            if tag != "p" {
                return Err(parse_err(path, line_no, "expected DIMACS header starting with 'p'"));
            }
            let _form = fields
                .next()
                .ok_or_else(|| parse_err(path, line_no, "header missing form token"))?;
            let vars: usize = fields
                .next()
                .ok_or_else(|| parse_err(path, line_no, "header missing variable count"))?
                .parse()
                .map_err(|_| parse_err(path, line_no, "variable count isn't an integer"))?;
            num_variables = Some(vars);
            continue;
        }

        let mut literals: Vec<i64> = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<i64>()
                    .map_err(|_| parse_err(path, line_no, "clause token isn't an integer"))
            })
            .collect::<Result<_, _>>()?;

        match literals.pop() {
            Some(0) => {}
            _ => return Err(parse_err(path, line_no, "clause/term must be 0-terminated")),
        }
        clauses.push(literals);
    }

    let num_variables = num_variables.ok_or_else(|| parse_err(path, 0, "missing DIMACS header"))?;
    Ok(Fnf {
        num_variables,
        clauses,
    })
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

    fn write_fixture(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_cnf_header_and_clauses() {
        let f = write_fixture("c a comment\np cnf 3 2\n1 2 0\n-1 3 0\n");
        let fnf = parse(f.path()).unwrap();
        assert_eq!(fnf.num_variables, 3);
        assert_eq!(fnf.clauses, vec![vec![1, 2], vec![-1, 3]]);
    }

    #[test]
    fn rejects_missing_terminator() {
        let f = write_fixture("p cnf 2 1\n1 2\n");
        assert!(parse(f.path()).is_err());
    }
}
