//! Integer constraint encoding of a puzzle, decided by Z3.
//!
//! One `Int` per node holds either -1 (unused) or a color index. Degree and
//! tile constraints force every color class into a disjoint union of simple
//! paths and cycles with the two terminals as the only odd ends; a per-color
//! BFS-distance witness from the first terminal then rules the cycles out.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use itertools::Itertools;
use log::debug;
use z3::ast::{Ast, Bool, Int};
use z3::{Config, Context, SatResult, Solver};

use crate::error::Error;
use crate::puzzle::Puzzle;
use crate::solver::{walk_unique_path, SolveResult};

/// Node ids are opaque strings that may contain characters the solver's
/// term language will not take; names are therefore a role prefix plus the
/// URL-safe base64 of the raw id, which is reversible and collision-free.
fn var_name(prefix: &str, raw: &str) -> String {
    let mut encoded = URL_SAFE_NO_PAD.encode(raw.as_bytes());
    if encoded.is_empty() {
        encoded.push_str("empty");
    }
    format!("{prefix}_{encoded}")
}

pub(crate) fn solve(puzzle: &Puzzle, timeout: Option<Duration>) -> Result<SolveResult, Error> {
    let colors = puzzle.colors();
    let k = colors.len() as i64;
    let terminal_nodes = puzzle.terminal_nodes();

    let mut cfg = Config::new();
    if let Some(budget) = timeout {
        cfg.set_timeout_msec(budget.as_millis() as u64);
    }
    let ctx = Context::new(&cfg);
    let solver = Solver::new(&ctx);

    let node_ids = puzzle.graph.node_ids().collect_vec();
    let col: BTreeMap<&str, Int> = node_ids
        .iter()
        .map(|n| (n.as_str(), Int::new_const(&ctx, var_name("col", n))))
        .collect();

    let minus_one = Int::from_i64(&ctx, -1);
    let zero = Int::from_i64(&ctx, 0);
    let one = Int::from_i64(&ctx, 1);
    let two = Int::from_i64(&ctx, 2);
    let color_count = Int::from_i64(&ctx, k);

    // domain: -1 or a color index
    for n in &node_ids {
        let c = &col[n.as_str()];
        solver.assert(&Bool::and(
            &ctx,
            &[&c.ge(&minus_one), &c.lt(&color_count)],
        ));
    }

    // fill: some node of every tile is used
    if puzzle.fill {
        for members in puzzle.tiles.values() {
            let used = members
                .iter()
                .map(|n| col[n.as_str()]._eq(&minus_one).not())
                .collect_vec();
            solver.assert(&Bool::or(&ctx, &used.iter().collect_vec()));
        }
    }

    // bridge-style tiles: one color may not occupy two channels of a tile
    for members in puzzle.tiles.values().filter(|m| m.len() > 1) {
        for (a, b) in members.iter().tuple_combinations() {
            let ca = &col[a.as_str()];
            let cb = &col[b.as_str()];
            solver.assert(&Bool::or(
                &ctx,
                &[
                    &ca._eq(&minus_one),
                    &cb._eq(&minus_one),
                    &ca._eq(cb).not(),
                ],
            ));
        }
    }

    // terminals hold their declared color
    for (color, pair) in &puzzle.terminals {
        let index = colors.iter().position(|c| c == color).unwrap_or_default() as i64;
        let ci = Int::from_i64(&ctx, index);
        solver.assert(&col[pair.0.as_str()]._eq(&ci));
        solver.assert(&col[pair.1.as_str()]._eq(&ci));
    }

    // degree: terminals have one same-color neighbor, used nodes two
    for n in &node_ids {
        let cn = &col[n.as_str()];
        let same = puzzle
            .graph
            .neighbors(n)
            .iter()
            .map(|m| col[m.as_str()]._eq(cn).ite(&one, &zero))
            .collect_vec();
        let same_deg = if same.is_empty() {
            zero.clone()
        } else {
            Int::add(&ctx, &same.iter().collect_vec())
        };

        if terminal_nodes.contains_key(n.as_str()) {
            solver.assert(&same_deg._eq(&one));
        } else {
            solver.assert(&cn._eq(&minus_one).not().implies(&same_deg._eq(&two)));
        }
    }

    // connectivity: a BFS-distance witness from the first terminal keeps
    // each color in one component (degree constraints already forbid
    // branching, so this kills detached cycles)
    for (color, pair) in &puzzle.terminals {
        let index = colors.iter().position(|c| c == color).unwrap_or_default() as i64;
        let ci = Int::from_i64(&ctx, index);
        let start = pair.0.as_str();

        let dist: BTreeMap<&str, Int> = node_ids
            .iter()
            .map(|n| {
                (
                    n.as_str(),
                    Int::new_const(&ctx, var_name("dist", &format!("{color}::{n}"))),
                )
            })
            .collect();

        for n in &node_ids {
            let cn = &col[n.as_str()];
            let dn = &dist[n.as_str()];
            solver.assert(&cn._eq(&ci).implies(&dn.ge(&zero)));
            solver.assert(&cn._eq(&ci).not().implies(&dn._eq(&minus_one)));
        }
        solver.assert(&dist[start]._eq(&zero));

        for n in &node_ids {
            if n.as_str() == start {
                continue;
            }
            let cn = &col[n.as_str()];
            let dn = &dist[n.as_str()];
            let preds = puzzle
                .graph
                .neighbors(n)
                .iter()
                .map(|m| {
                    Bool::and(
                        &ctx,
                        &[
                            &col[m.as_str()]._eq(&ci),
                            &dist[m.as_str()]._eq(&Int::sub(&ctx, &[dn, &one])),
                        ],
                    )
                })
                .collect_vec();

            if preds.is_empty() {
                // an isolated node cannot carry this color
                solver.assert(&cn._eq(&ci).not());
            } else {
                let step = Bool::and(
                    &ctx,
                    &[&dn.ge(&one), &Bool::or(&ctx, &preds.iter().collect_vec())],
                );
                solver.assert(&cn._eq(&ci).implies(&step));
            }
        }
    }

    debug!(
        "smt: encoded {} nodes x {k} colors, checking",
        node_ids.len()
    );

    match solver.check() {
        SatResult::Unknown => Err(Error::Unknown(
            solver
                .get_reason_unknown()
                .unwrap_or_else(|| "unspecified".into()),
        )),
        SatResult::Unsat => Err(Error::Unsat),
        SatResult::Sat => {
            let model = solver
                .get_model()
                .ok_or_else(|| Error::Internal("sat verdict without a model".into()))?;

            let mut node_color = BTreeMap::new();
            for n in &node_ids {
                let value = model
                    .eval(&col[n.as_str()], true)
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| {
                        Error::Internal(format!("no model value for node {n:?}"))
                    })?;
                let assigned = match value {
                    -1 => None,
                    v => Some(*colors.get(v as usize).ok_or_else(|| {
                        Error::Internal(format!("model put node {n:?} outside the color range"))
                    })?),
                };
                node_color.insert((*n).clone(), assigned);
            }

            let mut paths = BTreeMap::new();
            for (color, pair) in &puzzle.terminals {
                let path = walk_unique_path(
                    *color,
                    &pair.0,
                    &pair.1,
                    puzzle.graph.len(),
                    |cur| {
                        puzzle
                            .graph
                            .neighbors(cur)
                            .into_iter()
                            .filter(|m| node_color.get(m.as_str()) == Some(&Some(*color)))
                            .cloned()
                            .collect_vec()
                    },
                )?;
                paths.insert(*color, path);
            }

            Ok(SolveResult { node_color, paths })
        }
    }
}
