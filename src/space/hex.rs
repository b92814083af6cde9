//! Hexagonal space, odd-r offset layout: odd rows shift half a cell to the
//! right, giving each cell up to six neighbors.

use std::collections::BTreeMap;
use std::collections::HashMap;

use log::debug;
use serde_json::Value;
use strum::VariantArray;

use crate::error::Error;
use crate::graph::{Graph, Node, NodeKind};
use crate::space::{reject_bridge, token_grid, SpaceParts, TerminalLedger, Token};

#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, VariantArray)]
enum HexStep {
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl HexStep {
    /// Neighbor coordinates in odd-r offset layout; the column shift depends
    /// on the parity of the row.
    fn attempt_from(&self, x: usize, y: usize) -> (isize, isize) {
        let (x, y) = (x as isize, y as isize);
        let odd = y.rem_euclid(2) == 1;
        match self {
            Self::East => (x + 1, y),
            Self::West => (x - 1, y),
            Self::NorthEast => (if odd { x + 1 } else { x }, y - 1),
            Self::NorthWest => (if odd { x } else { x - 1 }, y - 1),
            Self::SouthEast => (if odd { x + 1 } else { x }, y + 1),
            Self::SouthWest => (if odd { x } else { x - 1 }, y + 1),
        }
    }
}

fn cell_id(x: usize, y: usize) -> String {
    format!("{x},{y}")
}

/// Build a hex space from token rows. Bridges are a square-space feature and
/// are rejected here.
pub fn from_tokens(rows: &[Vec<String>]) -> Result<SpaceParts, Error> {
    let grid = token_grid(rows)?;

    let mut graph = Graph::new();
    let mut tiles = BTreeMap::new();
    let mut ledger = TerminalLedger::default();
    let mut present: HashMap<(usize, usize), String> = HashMap::new();

    let y_step = 3.0_f64.sqrt() / 2.0;

    for ((y, x), tok) in grid.indexed_iter() {
        let id = cell_id(x, y);
        let px = x as f64 + if y % 2 == 1 { 0.5 } else { 0.0 };
        let pos = [px, -(y as f64) * y_step, 0.0];

        match tok {
            Token::Hole => continue,
            Token::Bridge => return Err(reject_bridge("hex", x, y)),
            Token::Terminal(color) => {
                graph.add_node(
                    Node::new(id.clone(), pos, NodeKind::Terminal)
                        .with_data("tile", id.clone())
                        .with_data("color", color.to_string()),
                )?;
                ledger.record(*color, &id);
            }
            Token::Cell(text) => {
                graph.add_node(
                    Node::new(id.clone(), pos, NodeKind::Cell)
                        .with_data("tile", id.clone())
                        .with_data("token", Value::String(text.clone())),
                )?;
            }
        }

        tiles.insert(id.clone(), vec![id.clone()]);
        present.insert((x, y), id);
    }

    for ((x, y), u) in &present {
        for step in HexStep::VARIANTS {
            let (nx, ny) = step.attempt_from(*x, *y);
            if nx < 0 || ny < 0 {
                continue;
            }
            if let Some(v) = present.get(&(nx as usize, ny as usize)) {
                graph.add_edge(u, v)?;
            }
        }
    }

    let terminals = ledger.finish()?;
    debug!(
        "hex space: {} nodes, {} edges, {} colors",
        graph.len(),
        graph.edge_count(),
        terminals.len()
    );

    Ok(SpaceParts {
        graph,
        tiles,
        terminals,
    })
}
