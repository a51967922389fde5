//! Collaborator-level errors: everything the core never raises (§7).

use thiserror::Error;

/// Errors raised by the CLI's file parsers and I/O, as distinct from
/// [`zsdd::Error`], which the core alone raises.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("can't read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },
}
