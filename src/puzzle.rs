//! Puzzle assembly: glue the space builders to the `.flow` and JSON board
//! descriptions, validate terminals and tiles, and carry metadata through.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unordered_pair::UnorderedPair;

use crate::error::Error;
use crate::graph::{Graph, Node, NodeId, NodeKind};
use crate::space;
use crate::space::SpaceParts;

/// A color label: a single ASCII uppercase letter.
pub type Color = char;

/// Tile identity. Space builders reuse the cell id of the tile's position.
pub type TileId = String;

/// A Flow/Numberlink puzzle over an arbitrary undirected graph.
///
/// Immutable once built: solvers borrow it and keep all working state to
/// themselves, so concurrent solves of the same puzzle need no locking.
#[derive(Clone, Debug)]
pub struct Puzzle {
    /// Connectivity and node metadata.
    pub graph: Graph,
    /// Groups of nodes representing one physical board cell each; the unit
    /// of fill accounting. Multi-node tiles exist only for bridges.
    pub tiles: BTreeMap<TileId, Vec<NodeId>>,
    /// Each color's two endpoint nodes.
    pub terminals: BTreeMap<Color, UnorderedPair<NodeId>>,
    /// When set, every tile must be occupied by some colored node.
    pub fill: bool,
    /// Opaque metadata for downstream consumers; solvers ignore it.
    pub meta: BTreeMap<String, Value>,
}

impl Puzzle {
    /// Assemble and validate a puzzle. See the invariants on each error
    /// path; builders uphold them by construction, free-form input gets
    /// checked here.
    pub fn new(
        graph: Graph,
        tiles: BTreeMap<TileId, Vec<NodeId>>,
        terminals: BTreeMap<Color, UnorderedPair<NodeId>>,
        fill: bool,
        meta: BTreeMap<String, Value>,
    ) -> Result<Self, Error> {
        if terminals.is_empty() {
            return Err(Error::TerminalValidation(
                "puzzle has no terminals".into(),
            ));
        }

        // tiles partition the node set
        let mut node_tile: HashMap<&str, &TileId> = HashMap::new();
        for (tile, members) in &tiles {
            for id in members {
                if !graph.contains(id) {
                    return Err(Error::InputParse(format!(
                        "tile {tile:?} references unknown node {id:?}"
                    )));
                }
                if node_tile.insert(id.as_str(), tile).is_some() {
                    return Err(Error::InputParse(format!(
                        "node {id:?} appears in more than one tile"
                    )));
                }
            }
        }
        for id in graph.node_ids() {
            if !node_tile.contains_key(id.as_str()) {
                return Err(Error::InputParse(format!(
                    "node {id:?} belongs to no tile"
                )));
            }
        }

        let mut node_color: HashMap<&str, Color> = HashMap::new();
        let mut tile_color: HashMap<&str, Color> = HashMap::new();
        for (color, pair) in &terminals {
            let UnorderedPair(a, b) = pair;
            if a == b {
                return Err(Error::TerminalValidation(format!(
                    "terminal endpoints for {color:?} must be distinct"
                )));
            }
            for id in [a, b] {
                if !graph.contains(id) {
                    return Err(Error::TerminalValidation(format!(
                        "terminal node {id:?} for {color:?} does not exist"
                    )));
                }
                if let Some(prev) = node_color.insert(id.as_str(), *color) {
                    return Err(Error::TerminalValidation(format!(
                        "node {id:?} is a terminal of both {prev:?} and {color:?}"
                    )));
                }
                let tile = node_tile[id.as_str()].as_str();
                match tile_color.insert(tile, *color) {
                    Some(prev) if prev != *color => {
                        return Err(Error::TerminalValidation(format!(
                            "tile {tile:?} contains terminals of {prev:?} and {color:?}"
                        )));
                    }
                    _ => {}
                }
            }
        }

        Ok(Self {
            graph,
            tiles,
            terminals,
            fill,
            meta,
        })
    }

    /// Assemble from builder output.
    pub fn from_space(
        parts: SpaceParts,
        fill: bool,
        meta: BTreeMap<String, Value>,
    ) -> Result<Self, Error> {
        Self::new(parts.graph, parts.tiles, parts.terminals, fill, meta)
    }

    /// Colors in sorted order.
    pub fn colors(&self) -> Vec<Color> {
        self.terminals.keys().copied().collect()
    }

    /// Terminal node to color lookup.
    pub fn terminal_nodes(&self) -> BTreeMap<&str, Color> {
        let mut out = BTreeMap::new();
        for (color, UnorderedPair(a, b)) in &self.terminals {
            out.insert(a.as_str(), *color);
            out.insert(b.as_str(), *color);
        }
        out
    }

    /// Parse the line-oriented `.flow` format.
    ///
    /// `#` is overloaded: `# key: value` is a directive, `#` followed by
    /// whitespace (and no colon) is a comment, and any other `#`-initial
    /// line is a grid row in which `#` means hole. Rows like `#B#` depend
    /// on this rule.
    pub fn from_flow_text(text: &str) -> Result<Self, Error> {
        let mut grid_lines: Vec<&str> = Vec::new();
        let mut meta: BTreeMap<String, Value> = BTreeMap::new();
        let mut fill = true;
        let mut board_type = "square".to_string();

        for line in text.lines() {
            let raw = line.trim();
            if raw.is_empty() {
                continue;
            }
            if let Some(rest) = raw.strip_prefix('#') {
                if let Some((k, v)) = rest.trim().split_once(':') {
                    let key = k.trim();
                    let value = v.trim();
                    match key.to_lowercase().as_str() {
                        "type" => board_type = value.to_lowercase(),
                        "fill" => fill = truthy(value),
                        _ => {
                            meta.insert(key.to_owned(), Value::String(value.to_owned()));
                        }
                    }
                    continue;
                }
                if rest.chars().next().is_some_and(char::is_whitespace) {
                    continue;
                }
                // no colon, no whitespace after '#': a grid row like "#B#"
            }
            grid_lines.push(line);
        }

        let token_rows = tokenize(&grid_lines);
        if token_rows.is_empty() {
            return Err(Error::InputParse("no grid found in .flow input".into()));
        }
        let width = token_rows[0].len();
        if token_rows.iter().any(|r| r.len() != width) {
            return Err(Error::InputParse(
                "all grid rows must have the same number of tokens".into(),
            ));
        }

        debug!(
            "flow input: type={board_type} fill={fill} rows={} width={width}",
            token_rows.len()
        );

        let parts = match board_type.as_str() {
            "square" => space::square::from_tokens(&token_rows)?,
            "hex" => space::hex::from_tokens(&token_rows)?,
            "circle" => {
                let core = meta
                    .get("core")
                    .and_then(Value::as_str)
                    .is_some_and(truthy);
                space::circle::from_token_rows(&token_rows, core)?
            }
            other => {
                return Err(Error::InputParse(format!(
                    "unsupported board type {other:?} (supported: square, hex, circle)"
                )))
            }
        };

        Self::from_space(parts, fill, meta)
    }

    /// Parse the JSON puzzle format (`space.type` of `graph` or `square`).
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        let doc: PuzzleDoc = serde_json::from_str(text)
            .map_err(|e| Error::InputParse(format!("invalid puzzle JSON: {e}")))?;

        match doc.space {
            SpaceDoc::Square { grid } => {
                let parts = space::square::from_tokens(&grid)?;
                Self::new(parts.graph, parts.tiles, parts.terminals, doc.fill, doc.meta)
            }
            SpaceDoc::Graph { nodes, edges } => {
                let mut node_list = Vec::with_capacity(nodes.len());
                for (id, nd) in nodes {
                    let pos = match nd.pos.as_slice() {
                        [] => [0.0, 0.0, 0.0],
                        [x, y] => [*x, *y, 0.0],
                        [x, y, z] => [*x, *y, *z],
                        other => {
                            return Err(Error::InputParse(format!(
                                "node {id:?} has a position of {} coordinates (want 2 or 3)",
                                other.len()
                            )))
                        }
                    };
                    let kind = nd.kind.map(NodeKind::from).unwrap_or_default();
                    node_list.push(Node {
                        id,
                        pos,
                        kind,
                        data: nd.data,
                    });
                }

                let terminals = doc.terminals.ok_or_else(|| {
                    Error::TerminalValidation(
                        "graph-space puzzle declares no terminals".into(),
                    )
                })?;
                let parts = space::free::build(node_list, &edges, doc.tiles, &terminals)?;
                Self::new(parts.graph, parts.tiles, parts.terminals, doc.fill, doc.meta)
            }
        }
    }

    /// Re-serialize as graph-space JSON. Any puzzle, whatever space built
    /// it, round-trips through this representation.
    pub fn to_json_string(&self) -> Result<String, Error> {
        let nodes = self
            .graph
            .nodes()
            .map(|n| {
                (
                    n.id.clone(),
                    NodeDoc {
                        pos: n.pos.to_vec(),
                        kind: Some(n.kind.to_string()),
                        data: n.data.clone(),
                    },
                )
            })
            .collect();
        let edges = self
            .graph
            .edges()
            .into_iter()
            .map(|(u, v)| (u.clone(), v.clone()))
            .collect();
        let terminals = self
            .terminals
            .iter()
            .map(|(color, UnorderedPair(a, b))| (color.to_string(), vec![a.clone(), b.clone()]))
            .collect();

        let doc = PuzzleDoc {
            space: SpaceDoc::Graph { nodes, edges },
            terminals: Some(terminals),
            tiles: Some(self.tiles.clone()),
            fill: self.fill,
            meta: self.meta.clone(),
        };
        serde_json::to_string_pretty(&doc)
            .map_err(|e| Error::Internal(format!("puzzle serialization: {e}")))
    }
}

/// Grid-row tokenization: whitespace-separated tokens if the trimmed row
/// contains interior whitespace, one token per character otherwise.
fn tokenize(grid_lines: &[&str]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(grid_lines.len());
    for line in grid_lines {
        let body = line.trim();
        let toks: Vec<String> = if body.chars().any(char::is_whitespace) {
            body.split_whitespace().map(str::to_owned).collect()
        } else {
            body.chars().map(String::from).collect()
        };
        if !toks.is_empty() {
            rows.push(toks);
        }
    }
    rows
}

pub(crate) fn truthy(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn default_fill() -> bool {
    true
}

#[derive(Deserialize, Serialize)]
struct PuzzleDoc {
    space: SpaceDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    terminals: Option<BTreeMap<String, Vec<NodeId>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tiles: Option<BTreeMap<TileId, Vec<NodeId>>>,
    #[serde(default = "default_fill")]
    fill: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    meta: BTreeMap<String, Value>,
}

#[derive(Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SpaceDoc {
    Graph {
        nodes: BTreeMap<NodeId, NodeDoc>,
        #[serde(default)]
        edges: Vec<(NodeId, NodeId)>,
    },
    Square {
        grid: Vec<Vec<String>>,
    },
}

#[derive(Deserialize, Serialize)]
struct NodeDoc {
    #[serde(default)]
    pos: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    data: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn directives_comments_and_hash_rows() {
        let text = "\
# type: square
# fill: yes
# author: someone
#  a comment, ignored entirely
A#B
#.#
B#A
";
        let p = Puzzle::from_flow_text(text).unwrap();
        assert!(p.fill);
        assert_eq!(p.meta["author"], Value::String("someone".into()));
        // holes punched the corners of rows 0 and 2 and the sides of row 1
        assert_eq!(p.graph.len(), 5);
        assert_eq!(p.terminals[&'A'], UnorderedPair("0,0".into(), "2,2".into()));
        assert_eq!(p.terminals[&'B'], UnorderedPair("2,0".into(), "0,2".into()));
    }

    #[test]
    fn lone_hash_line_is_a_grid_row() {
        // a bare "#" is a one-token row of hole, which widens nothing and
        // leaves no node behind; here it makes rows ragged instead
        let text = "A.\n#\n.A\n";
        assert!(matches!(
            Puzzle::from_flow_text(text),
            Err(Error::InputParse(_))
        ));
    }

    #[test]
    fn whitespace_rows_split_into_tokens() {
        let text = "# fill: no\nA . B\nB . A\n";
        let p = Puzzle::from_flow_text(text).unwrap();
        assert!(!p.fill);
        assert_eq!(p.graph.len(), 6);
        assert!(p.graph.contains("2,1"));
    }

    #[test]
    fn empty_input_rejected() {
        for text in ["", "# type: square\n# just a comment here\n"] {
            assert!(matches!(
                Puzzle::from_flow_text(text),
                Err(Error::InputParse(_))
            ));
        }
    }

    #[test]
    fn ragged_grid_rejected() {
        assert!(matches!(
            Puzzle::from_flow_text("AB\nA.B\n"),
            Err(Error::InputParse(_))
        ));
    }

    #[test]
    fn unknown_board_type_rejected() {
        assert!(matches!(
            Puzzle::from_flow_text("# type: moebius\nAA\n"),
            Err(Error::InputParse(_))
        ));
    }

    #[test]
    fn circle_core_directive() {
        let text = "# type: circle\n# core: yes\nA.B\nB.A\n";
        let p = Puzzle::from_flow_text(text).unwrap();
        assert!(p.graph.contains("core"));
        assert_eq!(p.graph.degree("core"), 3);
    }

    #[test]
    fn json_graph_space() {
        let text = r#"{
            "space": {
                "type": "graph",
                "nodes": {
                    "n1": {"pos": [0, 0]},
                    "n2": {"pos": [1, 0], "kind": "terminal"},
                    "n3": {"pos": [0.5, 1, 0.25]}
                },
                "edges": [["n1", "n2"], ["n2", "n3"], ["n3", "n1"]]
            },
            "terminals": {"A": ["n1", "n2"]},
            "fill": false,
            "meta": {"name": "triangle"}
        }"#;
        let p = Puzzle::from_json_str(text).unwrap();
        assert!(!p.fill);
        assert_eq!(p.graph.len(), 3);
        assert_eq!(p.graph.get("n3").unwrap().pos, [0.5, 1.0, 0.25]);
        assert_eq!(p.graph.get("n2").unwrap().kind, NodeKind::Terminal);
        assert_eq!(p.tiles.len(), 3);
        assert_eq!(p.meta["name"], Value::String("triangle".into()));
    }

    #[test]
    fn json_square_space() {
        let text = r#"{"space": {"type": "square", "grid": [["A", "."], [".", "A"]]}}"#;
        let p = Puzzle::from_json_str(text).unwrap();
        assert!(p.fill);
        assert_eq!(p.graph.len(), 4);
        assert_eq!(p.terminals[&'A'], UnorderedPair("0,0".into(), "1,1".into()));
    }

    #[test]
    fn json_unknown_space_type_rejected() {
        assert!(matches!(
            Puzzle::from_json_str(r#"{"space": {"type": "moebius"}}"#),
            Err(Error::InputParse(_))
        ));
    }

    #[test]
    fn json_graph_space_requires_terminals() {
        let text = r#"{
            "space": {"type": "graph", "nodes": {"n1": {}, "n2": {}}, "edges": [["n1", "n2"]]}
        }"#;
        assert!(matches!(
            Puzzle::from_json_str(text),
            Err(Error::TerminalValidation(_))
        ));
    }

    #[test]
    fn validation_rejects_overlapping_tiles() {
        let text = r#"{
            "space": {"type": "graph", "nodes": {"n1": {}, "n2": {}}, "edges": [["n1", "n2"]]},
            "terminals": {"A": ["n1", "n2"]},
            "tiles": {"t1": ["n1", "n2"], "t2": ["n2"]}
        }"#;
        assert!(matches!(
            Puzzle::from_json_str(text),
            Err(Error::InputParse(_))
        ));
    }

    #[test]
    fn validation_rejects_identical_endpoints() {
        let text = r#"{
            "space": {"type": "graph", "nodes": {"n1": {}, "n2": {}}, "edges": [["n1", "n2"]]},
            "terminals": {"A": ["n1", "n1"]}
        }"#;
        assert!(matches!(
            Puzzle::from_json_str(text),
            Err(Error::TerminalValidation(_))
        ));
    }

    #[test]
    fn flow_round_trips_through_json() {
        let text = "# type: square\n# fill: yes\nA.B\n.+.\nB.A\n";
        let first = Puzzle::from_flow_text(text).unwrap();
        let second = Puzzle::from_json_str(&first.to_json_string().unwrap()).unwrap();

        assert_eq!(
            first.graph.node_ids().sorted().collect_vec(),
            second.graph.node_ids().sorted().collect_vec()
        );
        assert_eq!(first.graph.edges(), second.graph.edges());
        assert_eq!(first.tiles, second.tiles);
        assert_eq!(first.terminals, second.terminals);
        assert_eq!(first.fill, second.fill);
        for (id, node) in first.graph.nodes().map(|n| (&n.id, n)) {
            let back = second.graph.get(id).unwrap();
            assert_eq!(node.pos, back.pos);
            assert_eq!(node.kind, back.kind);
        }
    }
}
