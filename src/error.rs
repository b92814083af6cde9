use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong between reading a board description and
/// handing back a [`SolveResult`](crate::SolveResult).
///
/// Parse-side errors ([`InputParse`](Error::InputParse),
/// [`TerminalValidation`](Error::TerminalValidation)) surface to the caller
/// unchanged; nothing is retried internally.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed directive, ragged grid rows, unknown board type, or a token
    /// the requested space cannot express (e.g. a bridge outside a square
    /// space).
    #[error("cannot parse input: {0}")]
    InputParse(String),

    /// A color letter appearing other than exactly twice, identical
    /// endpoints, or a puzzle with no terminals at all.
    #[error("invalid terminals: {0}")]
    TerminalValidation(String),

    /// A self-loop or unknown endpoint was requested. Reachable only through
    /// buggy builder code, never through bad puzzle input.
    #[error("graph invariant violated: {0}")]
    GraphInvariant(String),

    /// The decision procedure proved the puzzle unsolvable, or the
    /// backtracking solver exhausted its search space.
    #[error("puzzle is unsatisfiable")]
    Unsat,

    /// The decision procedure gave up without a verdict; carries its reason
    /// (for Z3, typically "timeout" or "canceled").
    #[error("solver returned unknown: {0}")]
    Unknown(String),

    /// The backtracking solver ran past its deadline.
    #[error("solver timed out after {0:?}")]
    Timeout(Duration),

    /// Path reconstruction could not walk a unique terminal-to-terminal
    /// route. Indicates a solver invariant was violated.
    #[error("internal solver error: {0}")]
    Internal(String),
}
