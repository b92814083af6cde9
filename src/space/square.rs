//! Rectilinear grid space. The only space with bridge tiles: a `+` cell
//! carries two internal nodes (horizontal and vertical channels) grouped in
//! one tile, so a path crosses the cell without interacting with the
//! perpendicular path.

use std::collections::BTreeMap;
use std::collections::HashMap;

use log::debug;
use serde_json::Value;

use crate::error::Error;
use crate::graph::{Graph, Node, NodeKind};
use crate::space::{token_grid, SpaceParts, TerminalLedger, Token};

/// Which internal node each cardinal direction reaches. Plain cells route
/// every direction to the same node; bridge cells split N/S from E/W.
struct Ports {
    north: String,
    south: String,
    east: String,
    west: String,
}

impl Ports {
    fn uniform(id: &str) -> Self {
        Self {
            north: id.to_owned(),
            south: id.to_owned(),
            east: id.to_owned(),
            west: id.to_owned(),
        }
    }
}

fn cell_id(x: usize, y: usize) -> String {
    format!("{x},{y}")
}

/// Build a square-grid space from token rows.
pub fn from_tokens(rows: &[Vec<String>]) -> Result<SpaceParts, Error> {
    let grid = token_grid(rows)?;
    let (height, width) = grid.dim();

    let mut graph = Graph::new();
    let mut tiles = BTreeMap::new();
    let mut ledger = TerminalLedger::default();
    let mut ports: HashMap<(usize, usize), Ports> = HashMap::new();

    for ((y, x), tok) in grid.indexed_iter() {
        let tile = cell_id(x, y);
        let pos = [x as f64, -(y as f64), 0.0];

        match tok {
            Token::Hole => continue,
            Token::Bridge => {
                let h_id = format!("{tile}:h");
                let v_id = format!("{tile}:v");
                graph.add_node(
                    Node::new(h_id.clone(), [pos[0], pos[1], 0.15], NodeKind::BridgeH)
                        .with_data("tile", tile.clone()),
                )?;
                graph.add_node(
                    Node::new(v_id.clone(), [pos[0], pos[1], -0.15], NodeKind::BridgeV)
                        .with_data("tile", tile.clone()),
                )?;
                tiles.insert(tile, vec![h_id.clone(), v_id.clone()]);
                ports.insert(
                    (x, y),
                    Ports {
                        north: v_id.clone(),
                        south: v_id,
                        east: h_id.clone(),
                        west: h_id,
                    },
                );
            }
            Token::Terminal(color) => {
                graph.add_node(
                    Node::new(tile.clone(), pos, NodeKind::Terminal)
                        .with_data("tile", tile.clone())
                        .with_data("color", color.to_string()),
                )?;
                ledger.record(*color, &tile);
                tiles.insert(tile.clone(), vec![tile.clone()]);
                ports.insert((x, y), Ports::uniform(&tile));
            }
            Token::Cell(text) => {
                graph.add_node(
                    Node::new(tile.clone(), pos, NodeKind::Cell)
                        .with_data("tile", tile.clone())
                        .with_data("token", Value::String(text.clone())),
                )?;
                tiles.insert(tile.clone(), vec![tile.clone()]);
                ports.insert((x, y), Ports::uniform(&tile));
            }
        }
    }

    // Join east and south neighbors through the ports, so bridge channels
    // pick up exactly their axis-aligned edges.
    for y in 0..height {
        for x in 0..width {
            let Some(here) = ports.get(&(x, y)) else {
                continue;
            };
            if let Some(right) = ports.get(&(x + 1, y)) {
                graph.add_edge(&here.east, &right.west)?;
            }
            if let Some(below) = ports.get(&(x, y + 1)) {
                graph.add_edge(&here.south, &below.north)?;
            }
        }
    }

    let terminals = ledger.finish()?;
    debug!(
        "square space: {width}x{height} tokens -> {} nodes, {} edges, {} colors",
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

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&str]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|l| l.chars().map(String::from).collect())
            .collect()
    }

    #[test]
    fn plain_grid_geometry() {
        let parts = from_tokens(&rows(&["A.", ".A"])).unwrap();
        assert_eq!(parts.graph.len(), 4);
        // 2x2 grid has 4 edges
        assert_eq!(parts.graph.edge_count(), 4);
        assert_eq!(parts.graph.get("1,0").unwrap().pos, [1.0, 0.0, 0.0]);
        assert_eq!(parts.graph.get("0,1").unwrap().pos, [0.0, -1.0, 0.0]);
        assert_eq!(parts.terminals[&'A'].0, "0,0");
        assert_eq!(parts.terminals[&'A'].1, "1,1");
        assert_eq!(parts.tiles.len(), 4);
    }

    #[test]
    fn holes_break_adjacency() {
        let parts = from_tokens(&rows(&["A#A"])).unwrap();
        assert_eq!(parts.graph.len(), 2);
        assert_eq!(parts.graph.edge_count(), 0);
        assert!(!parts.tiles.contains_key("1,0"));
    }

    #[test]
    fn bridge_splits_channels() {
        let parts = from_tokens(&rows(&["A.B", ".+.", "B.A"])).unwrap();

        let h = parts.graph.get("1,1:h").unwrap();
        let v = parts.graph.get("1,1:v").unwrap();
        assert_eq!(h.kind, NodeKind::BridgeH);
        assert_eq!(v.kind, NodeKind::BridgeV);
        assert_eq!(h.pos[2], 0.15);
        assert_eq!(v.pos[2], -0.15);

        // one tile holds both channels
        assert_eq!(parts.tiles["1,1"], vec!["1,1:h", "1,1:v"]);

        // horizontal channel sees east/west, vertical sees north/south
        assert_eq!(parts.graph.neighbors("1,1:h"), ["0,1", "2,1"]);
        assert_eq!(parts.graph.neighbors("1,1:v"), ["1,0", "1,2"]);
    }

    #[test]
    fn unknown_tokens_become_cells() {
        let parts = from_tokens(&rows(&["A*A"])).unwrap();
        let node = parts.graph.get("1,0").unwrap();
        assert_eq!(node.kind, NodeKind::Cell);
        assert_eq!(node.data["token"], Value::String("*".into()));
    }

    #[test]
    fn unbalanced_terminals_rejected() {
        assert!(matches!(
            from_tokens(&rows(&["A.A", "..A"])),
            Err(Error::TerminalValidation(_))
        ));
        assert!(matches!(
            from_tokens(&rows(&["..", ".."])),
            Err(Error::TerminalValidation(_))
        ));
    }

    #[test]
    fn ragged_rows_rejected() {
        let mut bad = rows(&["A.", ".A"]);
        bad[1].push(".".into());
        assert!(matches!(from_tokens(&bad), Err(Error::InputParse(_))));
    }
}
