//! Free-form space: the description supplies nodes, edges, optional tiles,
//! and terminals directly instead of deriving them from a token grid.

use std::collections::BTreeMap;

use log::debug;
use unordered_pair::UnorderedPair;

use crate::error::Error;
use crate::graph::{Graph, Node, NodeId};
use crate::puzzle::{Color, TileId};
use crate::space::SpaceParts;

/// Assemble a space from explicit parts. Tiles default to one per node when
/// not supplied. Bad edges and malformed terminal pairs are user input here,
/// so they surface as parse/validation errors rather than graph invariants.
pub fn build(
    nodes: Vec<Node>,
    edges: &[(NodeId, NodeId)],
    tiles: Option<BTreeMap<TileId, Vec<NodeId>>>,
    terminals: &BTreeMap<String, Vec<NodeId>>,
) -> Result<SpaceParts, Error> {
    let mut graph = Graph::new();
    for node in nodes {
        graph.add_node(node).map_err(|e| {
            Error::InputParse(format!("bad node in graph space: {e}"))
        })?;
    }

    for (u, v) in edges {
        graph
            .add_edge(u, v)
            .map_err(|e| Error::InputParse(format!("bad edge [{u:?}, {v:?}]: {e}")))?;
    }

    let tiles = match tiles {
        Some(tiles) => tiles,
        None => graph
            .node_ids()
            .map(|id| (id.clone(), vec![id.clone()]))
            .collect(),
    };

    let mut pairs = BTreeMap::new();
    for (label, ids) in terminals {
        let color = parse_color(label)?;
        match ids.as_slice() {
            [a, b] => {
                pairs.insert(color, UnorderedPair(a.clone(), b.clone()));
            }
            _ => {
                return Err(Error::TerminalValidation(format!(
                    "terminal pair for {label:?} must list exactly 2 node ids (found {})",
                    ids.len()
                )))
            }
        }
    }
    if pairs.is_empty() {
        return Err(Error::TerminalValidation(
            "no terminals found (need at least one A-Z pair)".into(),
        ));
    }

    debug!(
        "graph space: {} nodes, {} edges, {} colors",
        graph.len(),
        graph.edge_count(),
        pairs.len()
    );

    Ok(SpaceParts {
        graph,
        tiles,
        terminals: pairs,
    })
}

fn parse_color(label: &str) -> Result<Color, Error> {
    let mut chars = label.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => Ok(c),
        _ => Err(Error::TerminalValidation(format!(
            "color label must be a single uppercase letter, got {label:?}"
        ))),
    }
}
