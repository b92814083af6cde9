//! Circular spaces: a 1D ring of nodes, or concentric rings of angular
//! sectors with optional hub node at the origin. The caller picks the mode.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::f64::consts::PI;

use log::debug;
use serde_json::Value;

use crate::error::Error;
use crate::graph::{Graph, Node, NodeKind};
use crate::space::{reject_bridge, token_grid, SpaceParts, TerminalLedger, Token};

/// Build a 1D ring from a token sequence: node `i` sits at angle `2πi/n` and
/// connects to `i±1` with wrap-around. Holes break the ring at that gap.
pub fn from_ring_tokens(tokens: &[String]) -> Result<SpaceParts, Error> {
    let n = tokens.len();
    if n == 0 {
        return Err(Error::InputParse("circle token list is empty".into()));
    }

    let mut graph = Graph::new();
    let mut tiles = BTreeMap::new();
    let mut ledger = TerminalLedger::default();
    let mut present: BTreeMap<usize, String> = BTreeMap::new();

    // ~1 unit of spacing along the arc
    let r = (n as f64 / (2.0 * PI)).max(1.0);

    for (i, raw) in tokens.iter().enumerate() {
        let id = i.to_string();
        let theta = 2.0 * PI * i as f64 / n as f64;
        let pos = [r * theta.cos(), r * theta.sin(), 0.0];

        match Token::classify(raw) {
            Token::Hole => continue,
            Token::Bridge => return Err(reject_bridge("circle", i, 0)),
            Token::Terminal(color) => {
                graph.add_node(
                    Node::new(id.clone(), pos, NodeKind::Terminal)
                        .with_data("tile", id.clone())
                        .with_data("color", color.to_string()),
                )?;
                ledger.record(color, &id);
            }
            Token::Cell(text) => {
                graph.add_node(
                    Node::new(id.clone(), pos, NodeKind::Cell)
                        .with_data("tile", id.clone())
                        .with_data("token", Value::String(text)),
                )?;
            }
        }

        tiles.insert(id.clone(), vec![id.clone()]);
        present.insert(i, id);
    }

    for (i, u) in &present {
        let j = (i + 1) % n;
        if j == *i {
            continue;
        }
        if let Some(v) = present.get(&j) {
            graph.add_edge(u, v)?;
        }
    }

    let terminals = ledger.finish()?;
    debug!(
        "ring space: {n} tokens -> {} nodes, {} edges",
        graph.len(),
        graph.edge_count()
    );

    Ok(SpaceParts {
        graph,
        tiles,
        terminals,
    })
}

/// Build a rings-and-sectors space from token rows: each row is a concentric
/// ring (inner to outer), each column an angular sector. Angular adjacency
/// wraps within a ring; radial adjacency joins a sector to the same sector
/// one ring out. With `core`, a hub node at the origin connects to every
/// non-hole cell of the innermost ring.
pub fn from_token_rows(rows: &[Vec<String>], core: bool) -> Result<SpaceParts, Error> {
    let grid = token_grid(rows)?;
    let (rings, width) = grid.dim();

    let mut graph = Graph::new();
    let mut tiles = BTreeMap::new();
    let mut ledger = TerminalLedger::default();
    let mut present: HashMap<(usize, usize), String> = HashMap::new();

    // adjacent sectors sit ~1 unit apart on the inner ring
    let base_r = (width as f64 / (2.0 * PI)).max(1.0);

    for ((y, x), tok) in grid.indexed_iter() {
        let id = format!("{x},{y}");
        let r = base_r + y as f64;
        let theta = 2.0 * PI * x as f64 / width as f64;
        let pos = [r * theta.cos(), r * theta.sin(), 0.0];

        match tok {
            Token::Hole => continue,
            Token::Bridge => return Err(reject_bridge("circle", x, y)),
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

    // angular wrap within each ring
    for ((x, y), u) in &present {
        let nx = (x + 1) % width;
        if nx == *x {
            continue;
        }
        if let Some(v) = present.get(&(nx, *y)) {
            graph.add_edge(u, v)?;
        }
    }

    // radial edges between consecutive rings
    for ((x, y), u) in &present {
        if let Some(v) = present.get(&(*x, y + 1)) {
            graph.add_edge(u, v)?;
        }
    }

    if core {
        let core_id = "core".to_string();
        graph.add_node(
            Node::new(core_id.clone(), [0.0, 0.0, 0.0], NodeKind::Core)
                .with_data("tile", core_id.clone()),
        )?;
        tiles.insert(core_id.clone(), vec![core_id.clone()]);

        for x in 0..width {
            if let Some(v) = present.get(&(x, 0)) {
                graph.add_edge(&core_id, v)?;
            }
        }
    }

    let terminals = ledger.finish()?;
    debug!(
        "circle space: {rings} rings x {width} sectors (core: {core}) -> {} nodes, {} edges",
        graph.len(),
        graph.edge_count()
    );

    Ok(SpaceParts {
        graph,
        tiles,
        terminals,
    })
}
