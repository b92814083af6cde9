//! Geometry adapters. Each builder turns a textual board description into
//! [`SpaceParts`]: the unified graph plus its tile partition and terminal
//! pairs. The solvers only ever see this unified model.

use std::collections::BTreeMap;

use itertools::Itertools;
use ndarray::Array2;
use unordered_pair::UnorderedPair;

use crate::error::Error;
use crate::graph::{Graph, NodeId};
use crate::puzzle::{Color, TileId};

pub mod circle;
pub mod free;
pub mod hex;
pub mod square;

/// Output of every space builder: a graph, the tile partition, and the
/// validated terminal pairs.
pub struct SpaceParts {
    /// Connectivity and per-node metadata.
    pub graph: Graph,
    /// Tile id to member nodes; tiles partition the graph.
    pub tiles: BTreeMap<TileId, Vec<NodeId>>,
    /// Color to its two endpoint nodes.
    pub terminals: BTreeMap<Color, UnorderedPair<NodeId>>,
}

/// Classified grid token, shared by all token-grid builders.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Token {
    /// `#`: no node at this position.
    Hole,
    /// `+`: two independent channels; square space only.
    Bridge,
    /// A single uppercase letter: one endpoint of that color.
    Terminal(char),
    /// Anything else is a traversable cell; the token text is retained.
    Cell(String),
}

impl Token {
    pub(crate) fn classify(raw: &str) -> Self {
        match raw {
            "#" => Self::Hole,
            "+" => Self::Bridge,
            _ => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_uppercase() => Self::Terminal(c),
                    _ => Self::Cell(raw.to_owned()),
                }
            }
        }
    }
}

/// Parse token rows into a rectangular grid, rejecting empty and ragged
/// input.
pub(crate) fn token_grid(rows: &[Vec<String>]) -> Result<Array2<Token>, Error> {
    let height = rows.len();
    if height == 0 {
        return Err(Error::InputParse("token grid is empty".into()));
    }
    let width = rows[0].len();
    if width == 0 {
        return Err(Error::InputParse("token grid has empty rows".into()));
    }
    if rows.iter().any(|r| r.len() != width) {
        return Err(Error::InputParse(
            "all grid rows must have the same number of tokens".into(),
        ));
    }

    let flat = rows
        .iter()
        .flat_map(|r| r.iter().map(|tok| Token::classify(tok)))
        .collect_vec();
    Array2::from_shape_vec((height, width), flat)
        .map_err(|e| Error::Internal(format!("token grid shape: {e}")))
}

/// Terminal bookkeeping shared by the builders: every color must appear on
/// exactly two nodes, and at least one pair must exist.
#[derive(Default)]
pub(crate) struct TerminalLedger {
    seen: BTreeMap<Color, Vec<NodeId>>,
}

impl TerminalLedger {
    pub(crate) fn record(&mut self, color: Color, node: &str) {
        self.seen.entry(color).or_default().push(node.to_owned());
    }

    pub(crate) fn finish(self) -> Result<BTreeMap<Color, UnorderedPair<NodeId>>, Error> {
        let mut terminals = BTreeMap::new();
        for (color, mut nodes) in self.seen {
            if nodes.len() != 2 {
                return Err(Error::TerminalValidation(format!(
                    "terminal {color:?} must appear exactly twice (found {})",
                    nodes.len()
                )));
            }
            let second = nodes.pop().unwrap_or_default();
            let first = nodes.pop().unwrap_or_default();
            terminals.insert(color, UnorderedPair(first, second));
        }

        if terminals.is_empty() {
            return Err(Error::TerminalValidation(
                "no terminals found (need at least one A-Z pair)".into(),
            ));
        }
        Ok(terminals)
    }
}

pub(crate) fn reject_bridge(space: &str, x: usize, y: usize) -> Error {
    Error::InputParse(format!(
        "bridge token '+' at ({x}, {y}) is only supported in square space, not {space}"
    ))
}
