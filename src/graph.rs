use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use petgraph::graphmap::UnGraphMap;
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::Error;

/// Opaque node identity. Space builders mint ids like `"2,1"` or `"2,1:h"`;
/// free-form puzzles may use anything.
pub type NodeId = String;

/// Advisory node tag. Solvers ignore it; terminal nodes additionally carry
/// their color in [`Node::data`].
#[derive(Clone, Debug, Default, Display, EnumString, Eq, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    /// Ordinary traversable cell.
    #[default]
    Cell,
    /// One endpoint of a color's path.
    Terminal,
    /// East-west channel of a bridge cell.
    BridgeH,
    /// North-south channel of a bridge cell.
    BridgeV,
    /// Hub node at the center of a circular board.
    Core,
    /// Any tag this crate does not mint itself.
    #[strum(default)]
    Other(String),
}

impl From<String> for NodeKind {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(_) => Self::Other(value),
        }
    }
}

impl From<NodeKind> for String {
    fn from(value: NodeKind) -> Self {
        value.to_string()
    }
}

/// A single graph vertex: identity, a position for downstream rendering, an
/// advisory kind, and free-form metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Unique identity within the graph.
    pub id: NodeId,
    /// Render position; solvers never look at it.
    pub pos: [f64; 3],
    /// Advisory tag, see [`NodeKind`].
    pub kind: NodeKind,
    /// Free-form metadata (`tile`, `color`, `token`, ...).
    pub data: BTreeMap<String, Value>,
}

impl Node {
    /// A node with empty metadata.
    pub fn new(id: impl Into<NodeId>, pos: [f64; 3], kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            pos,
            kind,
            data: BTreeMap::new(),
        }
    }

    /// Attach one metadata entry, builder-style.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// An undirected graph over string node ids.
///
/// Nodes iterate in insertion order and neighbor views are sorted by id;
/// the DFS solver's tie-breaking and the SMT variable order both lean on
/// this determinism.
///
/// Internally, adjacency lives in a [`UnGraphMap`] over dense `u32` indices
/// (node ids are heap strings, which a graphmap cannot hold directly).
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<NodeId, u32>,
    adj: UnGraphMap<u32, ()>,
}

impl Graph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. Fails if the id is already present.
    pub fn add_node(&mut self, node: Node) -> Result<(), Error> {
        if self.index.contains_key(&node.id) {
            return Err(Error::GraphInvariant(format!(
                "node already exists: {:?}",
                node.id
            )));
        }

        let ix = self.nodes.len() as u32;
        self.index.insert(node.id.clone(), ix);
        self.nodes.push(node);
        self.adj.add_node(ix);
        Ok(())
    }

    /// Connect `u` and `v`. Fails on a self-loop or an unknown endpoint;
    /// adding the same edge twice is a no-op.
    pub fn add_edge(&mut self, u: &str, v: &str) -> Result<(), Error> {
        if u == v {
            return Err(Error::GraphInvariant(format!(
                "self-loop requested on {u:?}"
            )));
        }
        let iu = self.index_of(u)?;
        let iv = self.index_of(v)?;
        self.adj.add_edge(iu, iv, ());
        Ok(())
    }

    fn index_of(&self, id: &str) -> Result<u32, Error> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| Error::GraphInvariant(format!("unknown endpoint: {id:?}")))
    }

    /// Whether a node with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Look a node up by id.
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|ix| &self.nodes[*ix as usize])
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter().map(|n| &n.id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Neighbors of `id`, sorted by id. Unknown ids have no neighbors.
    pub fn neighbors(&self, id: &str) -> Vec<&NodeId> {
        match self.index.get(id) {
            None => Vec::new(),
            Some(ix) => self
                .adj
                .neighbors(*ix)
                .map(|other| &self.nodes[other as usize].id)
                .sorted()
                .collect_vec(),
        }
    }

    /// Number of neighbors of `id`.
    pub fn degree(&self, id: &str) -> usize {
        match self.index.get(id) {
            None => 0,
            Some(ix) => self.adj.neighbors(*ix).count(),
        }
    }

    /// Whether `u` and `v` are adjacent.
    pub fn has_edge(&self, u: &str, v: &str) -> bool {
        match (self.index.get(u), self.index.get(v)) {
            (Some(iu), Some(iv)) => self.adj.contains_edge(*iu, *iv),
            _ => false,
        }
    }

    /// Every undirected edge exactly once, as `(low, high)` pairs in
    /// lexicographic order.
    pub fn edges(&self) -> Vec<(&NodeId, &NodeId)> {
        self.adj
            .all_edges()
            .map(|(a, b, _)| {
                let ida = &self.nodes[a as usize].id;
                let idb = &self.nodes[b as usize].id;
                if ida <= idb {
                    (ida, idb)
                } else {
                    (idb, ida)
                }
            })
            .sorted()
            .collect_vec()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adj.edge_count()
    }
}
