use thiserror::Error;

/// Errors that can occur in the interpreter at the Rust level.
#[derive(Debug, Error)]
pub enum ScmError {
    /// Malformed input: bad tokens, unmatched `)`, dotted pair without closer.
    #[error("parse error: {0}")]
    Parse(String),

    /// Input ended in the middle of an expression. The interactive loop
    /// keeps reading lines while this is the failure.
    #[error("unexpected end of input")]
    Incomplete,

    /// Lookup failed.
    #[error("unbound symbol: {0}")]
    Unbound(String),

    /// An intrinsic or closure received the wrong number of arguments.
    #[error("arity mismatch: {0}")]
    Arity(String),

    /// Operation applied to an incompatible value.
    #[error("type mismatch: {0}")]
    Type(String),

    /// Attempted to apply a value that is not callable.
    #[error("not a procedure: {0}")]
    NotAProcedure(String),

    /// List walking encountered a non-nil tail where a proper list was required.
    #[error("improper list: {0}")]
    ImproperList(String),

    /// Raised by the `error` procedure. The message is already formatted.
    #[error("{0}")]
    User(String),

    /// Host-level I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal interpreter error (should not happen in correct code).
    #[error("internal error: {0}")]
    Internal(String),

    /// An evaluation error together with a dump of the pending continuation
    /// steps at the point of failure.
    #[error("{error}\n{trace}")]
    Traced { error: Box<ScmError>, trace: String },
}

pub type ScmResult<T> = Result<T, ScmError>;
