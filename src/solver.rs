//! Solver backends behind one entry point. Both produce the same
//! [`SolveResult`]; they differ in how they get there and in how failure
//! surfaces (see [`Error`]).

use std::collections::BTreeMap;
use std::time::Duration;

use itertools::Itertools;
use log::debug;
use strum::{Display, EnumString};

use crate::error::Error;
use crate::graph::NodeId;
use crate::puzzle::{Color, Puzzle};

pub(crate) mod dfs;
pub(crate) mod smt;

/// Which engine to run.
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
    /// Integer constraint encoding handed to an SMT decision procedure.
    Constraint,
    /// Tile-aware two-headed backtracking search.
    Dfs,
}

/// A solved puzzle: per-node color assignment plus the walked path of every
/// color.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveResult {
    /// Every node mapped to its color, or `None` when unused.
    pub node_color: BTreeMap<NodeId, Option<Color>>,
    /// Ordered node sequence per color, first terminal to second.
    pub paths: BTreeMap<Color, Vec<NodeId>>,
}

/// Solve `puzzle` with the chosen backend under an optional wall-clock
/// budget (`None` is unbounded).
///
/// The constraint backend reports an expired budget as
/// [`Error::Unknown`] (the decision procedure gives up without a verdict);
/// the DFS backend reports it as [`Error::Timeout`].
pub fn solve(
    puzzle: &Puzzle,
    backend: Backend,
    timeout: Option<Duration>,
) -> Result<SolveResult, Error> {
    debug!(
        "solve: backend={backend} nodes={} colors={} fill={} timeout={timeout:?}",
        puzzle.graph.len(),
        puzzle.terminals.len(),
        puzzle.fill
    );
    match backend {
        Backend::Constraint => smt::solve(puzzle, timeout),
        Backend::Dfs => dfs::solve(puzzle, timeout),
    }
}

/// Walk a color's path from `start` to `goal`, taking at every step the
/// unique same-color neighbor that is not the node we came from. Anything
/// other than exactly one candidate means a solver invariant was violated.
pub(crate) fn walk_unique_path<F>(
    color: Color,
    start: &str,
    goal: &str,
    bound: usize,
    mut same_color_neighbors: F,
) -> Result<Vec<NodeId>, Error>
where
    F: FnMut(&str) -> Vec<NodeId>,
{
    let mut path: Vec<NodeId> = vec![start.to_owned()];
    let mut prev: Option<NodeId> = None;

    while path[path.len() - 1] != goal {
        if path.len() > bound {
            return Err(Error::Internal(format!(
                "path walk for {color:?} exceeded the node count"
            )));
        }
        let cur = path[path.len() - 1].clone();
        let mut candidates = same_color_neighbors(&cur)
            .into_iter()
            .filter(|n| Some(n) != prev.as_ref())
            .collect_vec();
        if candidates.len() != 1 {
            return Err(Error::Internal(format!(
                "cannot uniquely reconstruct path for {color:?} at node {cur:?} \
                 (candidates: {candidates:?})"
            )));
        }
        path.push(candidates.swap_remove(0));
        prev = Some(cur);
    }

    Ok(path)
}
