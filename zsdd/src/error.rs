//! Error types surfaced across the `zsdd` crate boundary.

use thiserror::Error;

/// Errors the core manager can raise.
///
/// Per the error handling design, the core either returns a valid address
/// (possibly a sentinel) or aborts the whole call with one of these. There
/// is no partial failure and no retry within a single operation.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// A literal referenced a variable that isn't mapped to any vtree leaf.
    #[error("variable {0} is not present in the vtree")]
    UnknownVariable(i64),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
