//! Backtracking path-growth solver. Every color keeps two heads that start
//! on its terminals and grow toward each other; a connect move closes the
//! color. Reachability pruning after every extension keeps the search from
//! wandering into states where some color can no longer finish.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use itertools::Itertools;
use log::debug;

use crate::error::Error;
use crate::graph::NodeId;
use crate::puzzle::{Color, Puzzle};
use crate::solver::{walk_unique_path, SolveResult};

/// Wall-clock is polled once per this many recursive entries.
const TIMEOUT_POLL_INTERVAL: u64 = 1000;

#[derive(Clone, Copy, Eq, PartialEq)]
enum MoveKind {
    Connect,
    Extend,
}

#[derive(Clone, Copy)]
struct Move {
    kind: MoveKind,
    node: usize,
}

pub(crate) fn solve(puzzle: &Puzzle, timeout: Option<Duration>) -> Result<SolveResult, Error> {
    let mut search = DfsSearch::new(puzzle, timeout)?;
    search.check_deadline()?;
    if !search.search()? {
        return Err(Error::Unsat);
    }
    debug!("dfs: solved after {} steps", search.steps);
    search.into_result()
}

/// All search state for one solve call, over dense node indices. Node and
/// color orderings are fixed up front (insertion order, sorted neighbors,
/// sorted colors), which makes runs reproducible.
struct DfsSearch<'p> {
    puzzle: &'p Puzzle,
    ids: Vec<&'p NodeId>,
    id_ix: HashMap<&'p str, usize>,
    neighbors: Vec<Vec<usize>>,
    degree: Vec<usize>,
    node_tile: Vec<usize>,
    colors: Vec<Color>,

    assigned: Vec<Option<u8>>,
    /// Bit `c` set when color `c` occupies some node of the tile.
    tile_used: Vec<u32>,
    terminal: Vec<bool>,
    heads: Vec<[usize; 2]>,
    done: Vec<bool>,
    /// Explicit path edges per color; reconstruction walks these, not the
    /// underlying graph.
    path_adj: Vec<HashMap<usize, Vec<usize>>>,

    deadline: Option<(Instant, Duration)>,
    steps: u64,
}

impl<'p> DfsSearch<'p> {
    fn new(puzzle: &'p Puzzle, timeout: Option<Duration>) -> Result<Self, Error> {
        let ids = puzzle.graph.node_ids().collect_vec();
        let id_ix: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let lookup = |id: &str| -> Result<usize, Error> {
            id_ix
                .get(id)
                .copied()
                .ok_or_else(|| Error::Internal(format!("puzzle references unknown node {id:?}")))
        };

        let neighbors = ids
            .iter()
            .map(|id| {
                puzzle
                    .graph
                    .neighbors(id)
                    .into_iter()
                    .map(|n| lookup(n))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let degree = neighbors.iter().map(Vec::len).collect_vec();

        let mut node_tile = vec![usize::MAX; ids.len()];
        for (ti, members) in puzzle.tiles.values().enumerate() {
            for id in members {
                node_tile[lookup(id)?] = ti;
            }
        }
        if node_tile.contains(&usize::MAX) {
            return Err(Error::Internal("tiles do not cover the graph".into()));
        }

        let colors = puzzle.colors();
        let mut assigned = vec![None; ids.len()];
        let mut tile_used = vec![0u32; puzzle.tiles.len()];
        let mut terminal = vec![false; ids.len()];
        let mut heads = Vec::with_capacity(colors.len());

        for (ci, color) in colors.iter().enumerate() {
            let pair = &puzzle.terminals[color];
            let a = lookup(&pair.0)?;
            let b = lookup(&pair.1)?;
            heads.push([a, b]);
            for node in [a, b] {
                terminal[node] = true;
                let tile = node_tile[node];
                if tile_used[tile] & (1 << ci) != 0 {
                    // both endpoints in one tile: tile exclusion can never hold
                    return Err(Error::Unsat);
                }
                assigned[node] = Some(ci as u8);
                tile_used[tile] |= 1 << ci;
            }
        }

        debug!(
            "dfs: {} nodes, {} tiles, {} colors, fill={}",
            ids.len(),
            tile_used.len(),
            colors.len(),
            puzzle.fill
        );

        Ok(Self {
            puzzle,
            neighbors,
            degree,
            node_tile,
            assigned,
            tile_used,
            terminal,
            heads,
            done: vec![false; colors.len()],
            path_adj: vec![HashMap::new(); colors.len()],
            deadline: timeout.map(|budget| (Instant::now(), budget)),
            steps: 0,
            ids,
            id_ix,
            colors,
        })
    }

    fn check_deadline(&self) -> Result<(), Error> {
        if let Some((started, budget)) = self.deadline {
            if started.elapsed() > budget {
                return Err(Error::Timeout(budget));
            }
        }
        Ok(())
    }

    fn linked(&self, ci: usize, a: usize, b: usize) -> bool {
        self.path_adj[ci]
            .get(&a)
            .is_some_and(|nbs| nbs.contains(&b))
    }

    fn available_moves(&self, ci: usize, head_idx: usize) -> Vec<Move> {
        let head = self.heads[ci][head_idx];
        let other = self.heads[ci][1 - head_idx];
        let mut moves = Vec::new();

        for &nb in &self.neighbors[head] {
            match self.assigned[nb] {
                None => {
                    if self.tile_used[self.node_tile[nb]] & (1 << ci) == 0 {
                        moves.push(Move {
                            kind: MoveKind::Extend,
                            node: nb,
                        });
                    }
                }
                Some(c) => {
                    if c as usize == ci
                        && nb == other
                        && !self.linked(ci, head, other)
                        && self.closes_simple_path(ci)
                    {
                        moves.push(Move {
                            kind: MoveKind::Connect,
                            node: nb,
                        });
                    }
                }
            }
        }
        moves
    }

    fn assign(&mut self, ci: usize, node: usize) {
        self.assigned[node] = Some(ci as u8);
        self.tile_used[self.node_tile[node]] |= 1 << ci;
    }

    fn unassign(&mut self, ci: usize, node: usize) {
        debug_assert!(!self.terminal[node]);
        self.assigned[node] = None;
        self.tile_used[self.node_tile[node]] &= !(1 << ci);
    }

    fn link(&mut self, ci: usize, a: usize, b: usize) {
        self.path_adj[ci].entry(a).or_default().push(b);
        self.path_adj[ci].entry(b).or_default().push(a);
    }

    fn unlink(&mut self, ci: usize, a: usize, b: usize) {
        if let Some(nbs) = self.path_adj[ci].get_mut(&a) {
            nbs.retain(|x| *x != b);
        }
        if let Some(nbs) = self.path_adj[ci].get_mut(&b) {
            nbs.retain(|x| *x != a);
        }
    }

    /// Would closing `ci` right now leave its nodes forming a simple path in
    /// the graph itself: two same-color neighbors per interior node, one per
    /// terminal? A path folded against itself fails this and can never
    /// recover, since same-color adjacency only grows along a branch.
    fn closes_simple_path(&self, ci: usize) -> bool {
        for node in 0..self.ids.len() {
            if self.assigned[node] != Some(ci as u8) {
                continue;
            }
            let same = self.neighbors[node]
                .iter()
                .filter(|&&nb| self.assigned[nb] == Some(ci as u8))
                .count();
            let want = if self.terminal[node] { 1 } else { 2 };
            if same != want {
                return false;
            }
        }
        true
    }

    /// Can `ci` still route through `node`?
    fn usable(&self, ci: usize, node: usize) -> bool {
        match self.assigned[node] {
            None => self.tile_used[self.node_tile[node]] & (1 << ci) == 0,
            Some(c) => c as usize == ci,
        }
    }

    /// Residual-graph search between the two heads of `ci`. Nodes already on
    /// this color's path are only traversable along the path itself.
    fn heads_reachable(&self, ci: usize) -> bool {
        let [start, target] = self.heads[ci];
        if start == target {
            return true;
        }

        let mut visited = vec![false; self.ids.len()];
        let mut stack = vec![start];
        visited[start] = true;

        while let Some(cur) = stack.pop() {
            if cur == target {
                return true;
            }
            let mid_path =
                self.assigned[cur] == Some(ci as u8) && cur != start && cur != target;
            if mid_path {
                if let Some(nbs) = self.path_adj[ci].get(&cur) {
                    for &nb in nbs {
                        if !visited[nb] && self.usable(ci, nb) {
                            visited[nb] = true;
                            stack.push(nb);
                        }
                    }
                }
            } else {
                for &nb in &self.neighbors[cur] {
                    if !visited[nb] && self.usable(ci, nb) {
                        visited[nb] = true;
                        stack.push(nb);
                    }
                }
            }
        }
        false
    }

    fn all_heads_reachable(&self) -> bool {
        (0..self.colors.len()).all(|ci| self.done[ci] || self.heads_reachable(ci))
    }

    fn all_tiles_used(&self) -> bool {
        self.tile_used.iter().all(|mask| *mask != 0)
    }

    fn search(&mut self) -> Result<bool, Error> {
        self.steps += 1;
        if self.steps % TIMEOUT_POLL_INTERVAL == 0 {
            self.check_deadline()?;
        }

        if self.done.iter().all(|d| *d) {
            return Ok(!self.puzzle.fill || self.all_tiles_used());
        }

        // minimum-remaining-values: branch on the head with the fewest
        // moves; a moveless head of an undone color can never recover
        // inside this branch, so fail at once
        let mut best: Option<(usize, usize, Vec<Move>)> = None;
        for ci in 0..self.colors.len() {
            if self.done[ci] {
                continue;
            }
            for head_idx in 0..2 {
                let moves = self.available_moves(ci, head_idx);
                if moves.is_empty() {
                    return Ok(false);
                }
                if best
                    .as_ref()
                    .map_or(true, |(_, _, held)| moves.len() < held.len())
                {
                    best = Some((ci, head_idx, moves));
                }
            }
        }

        let Some((ci, head_idx, mut moves)) = best else {
            return Ok(false);
        };
        moves.sort_by_key(|mv| match mv.kind {
            MoveKind::Connect => (0, 0),
            MoveKind::Extend => (1, self.degree[mv.node]),
        });

        for mv in moves {
            match mv.kind {
                MoveKind::Extend => {
                    let prev = self.heads[ci][head_idx];
                    self.assign(ci, mv.node);
                    self.link(ci, prev, mv.node);
                    self.heads[ci][head_idx] = mv.node;

                    if self.all_heads_reachable() && self.search()? {
                        return Ok(true);
                    }

                    self.heads[ci][head_idx] = prev;
                    self.unlink(ci, prev, mv.node);
                    self.unassign(ci, mv.node);
                }
                MoveKind::Connect => {
                    let head = self.heads[ci][head_idx];
                    let other = self.heads[ci][1 - head_idx];
                    self.link(ci, head, other);
                    self.done[ci] = true;

                    if self.search()? {
                        return Ok(true);
                    }

                    self.done[ci] = false;
                    self.unlink(ci, head, other);
                }
            }
        }
        Ok(false)
    }

    fn into_result(self) -> Result<SolveResult, Error> {
        let mut node_color = BTreeMap::new();
        for (i, id) in self.ids.iter().enumerate() {
            node_color.insert(
                (*id).clone(),
                self.assigned[i].map(|c| self.colors[c as usize]),
            );
        }

        let mut paths = BTreeMap::new();
        for (ci, color) in self.colors.iter().enumerate() {
            let pair = &self.puzzle.terminals[color];
            let adj = &self.path_adj[ci];
            let path = walk_unique_path(*color, &pair.0, &pair.1, self.ids.len(), |cur| {
                match self.id_ix.get(cur) {
                    None => Vec::new(),
                    Some(ix) => adj
                        .get(ix)
                        .map(|nbs| nbs.iter().map(|&nb| self.ids[nb].clone()).collect_vec())
                        .unwrap_or_default(),
                }
            })?;
            paths.insert(*color, path);
        }

        Ok(SolveResult { node_color, paths })
    }
}
