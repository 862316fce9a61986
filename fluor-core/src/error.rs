//! Error types for the reactive engine.
//!
//! Every fallible operation on a cell returns [`Result`]. The engine
//! recovers locally only from listener panics (caught, logged at warn level,
//! swallowed); everything else is surfaced to the caller unchanged.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by cell and proxy operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A cell was touched from a thread other than the one that created it.
    ///
    /// Cells are bound to the context of their creating thread. Handles are
    /// `!Send`, so safe code cannot reach this; the check is kept because the
    /// contract is per-operation, not per-type.
    #[error("cell is owned by a different thread's context")]
    InvalidThread,

    /// `set` or `clear` was invoked while an evaluation was in progress on
    /// this thread. Mutating the graph from inside a cell expression would
    /// corrupt the dependency records being collected.
    #[error("set/clear is forbidden while a cell evaluation is in progress")]
    ForbiddenDuringEvaluation,

    /// A user expression failed during `get`. The cell stays uncached and no
    /// dependency edges are installed.
    #[error("cell expression failed: {0}")]
    Expression(Box<dyn std::error::Error + 'static>),

    /// A proxy capability method was called with no user callback installed.
    #[error("proxy does not support this operation")]
    Unsupported,
}

impl Error {
    /// Wrap an arbitrary user error as an expression failure.
    pub fn expression(source: impl Into<Box<dyn std::error::Error + 'static>>) -> Self {
        Error::Expression(source.into())
    }
}
