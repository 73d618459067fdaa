use std::result;

use thiserror::Error;

/// Errors surfaced to callers of the predicate library.
///
/// Data-quality findings are never errors; they come back as `false` or as a
/// recorded verdict. This type is reserved for caller mistakes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = result::Result<T, Error>;
