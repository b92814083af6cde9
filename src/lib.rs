#![warn(missing_docs)]

//! # `rheolink`
//!
//! A solver for [Numberlink](https://en.wikipedia.org/wiki/Numberlink) and Flow Free style puzzles
//! posed over arbitrary undirected graphs rather than just rectangular grids.
//! Begin by parsing a board description with [`Puzzle::from_flow_text`] or [`Puzzle::from_json_str`]
//! (or assemble one directly from a [`space`] builder), then call [`solve()`] with a [`Backend`].
//!
//! Square boards (with two-channel bridge cells), hexagonal odd-r boards, circular ring/sector
//! boards, and free-form graphs all reduce to one model: a [`Graph`] of nodes, a partition of those
//! nodes into tiles, and a pair of terminal nodes per color. Everything downstream of the space
//! builders is geometry-agnostic.
//!
//! # Internals
//! Two engines share that model:
//!
//! * [`Backend::Constraint`] expresses the puzzle as integer assignments, one variable per node
//!   holding either "unused" or a color index. Degree constraints force every color class into
//!   simple paths between its terminals, tile constraints handle fill and bridge-channel exclusion,
//!   and a per-color distance witness rules out detached cycles. The encoding is decided by an
//!   external SMT procedure under a millisecond budget.
//! * [`Backend::Dfs`] grows each color's path from both terminals at once, picking the most
//!   constrained head first and re-checking after every step that all unfinished colors can still
//!   join their heads in the residual graph.
//!
//! Solves are synchronous, single-threaded, and keep no state between calls; given the same input
//! and budget the DFS backend is fully reproducible.

pub use error::Error;
pub use graph::{Graph, Node, NodeId, NodeKind};
pub use puzzle::{Color, Puzzle, TileId};
pub use solver::{solve, Backend, SolveResult};

mod error;
mod graph;
mod puzzle;
pub mod space;
mod solver;
mod tests;
