#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::time::Duration;

    use itertools::Itertools;
    use unordered_pair::UnorderedPair;

    use crate::error::Error;
    use crate::puzzle::Puzzle;
    use crate::solver::{solve, Backend, SolveResult};
    use crate::space;

    const BACKENDS: [Backend; 2] = [Backend::Constraint, Backend::Dfs];

    /// Assert everything a correct solution must satisfy: terminals keep
    /// their declared colors, every color class is exactly its walked path
    /// and forms a simple terminal-to-terminal path in the graph, classes
    /// are disjoint, and (under fill) every tile is used.
    fn assert_valid(puzzle: &Puzzle, result: &SolveResult) {
        let ids: BTreeSet<_> = puzzle.graph.node_ids().collect();
        assert_eq!(result.node_color.keys().collect::<BTreeSet<_>>(), ids);

        let terminal_colors = puzzle.terminal_nodes();
        for (node, color) in &terminal_colors {
            assert_eq!(result.node_color[*node], Some(*color));
        }

        for color in puzzle.colors() {
            let path = &result.paths[&color];
            let UnorderedPair(a, b) = &puzzle.terminals[&color];
            assert_eq!(path.first(), Some(a));
            assert_eq!(path.last(), Some(b));

            let on_path: BTreeSet<_> = path.iter().collect();
            assert_eq!(on_path.len(), path.len(), "path for {color:?} repeats a node");
            for (u, v) in path.iter().tuple_windows() {
                assert!(puzzle.graph.has_edge(u, v), "{color:?} jumps {u} -> {v}");
            }

            let class: BTreeSet<_> = result
                .node_color
                .iter()
                .filter(|(_, c)| **c == Some(color))
                .map(|(n, _)| n)
                .collect();
            assert_eq!(on_path, class, "stray {color:?} nodes off the path");

            for node in &class {
                let same = puzzle
                    .graph
                    .neighbors(node)
                    .into_iter()
                    .filter(|m| result.node_color[m.as_str()] == Some(color))
                    .count();
                let want = if terminal_colors.contains_key(node.as_str()) {
                    1
                } else {
                    2
                };
                assert_eq!(same, want, "induced degree of {node} for {color:?}");
            }
        }

        if puzzle.fill {
            for (tile, members) in &puzzle.tiles {
                assert!(
                    members
                        .iter()
                        .any(|n| result.node_color[n.as_str()].is_some()),
                    "tile {tile} left unused despite fill"
                );
            }
        }
    }

    fn solve_both(puzzle: &Puzzle) -> Vec<SolveResult> {
        BACKENDS
            .iter()
            .map(|backend| {
                let result = solve(puzzle, *backend, Some(Duration::from_secs(30)))
                    .unwrap_or_else(|e| panic!("{backend} failed: {e}"));
                assert_valid(puzzle, &result);
                result
            })
            .collect()
    }

    #[test]
    fn unsat_when_paths_must_cross() {
        // two pairs on a 2x2 can only join by crossing
        let puzzle = Puzzle::from_flow_text("AB\nBA\n").unwrap();
        for backend in BACKENDS {
            assert!(matches!(
                solve(&puzzle, backend, None),
                Err(Error::Unsat)
            ));
        }
    }

    #[test]
    fn corner_to_corner_path_without_fill() {
        let puzzle = Puzzle::from_flow_text("# fill: no\nA..\n...\n..A\n").unwrap();
        for result in solve_both(&puzzle) {
            // a corner-to-corner path uses at least 5 nodes
            assert!(result.paths[&'A'].len() >= 5);
        }
    }

    #[test]
    fn single_color_cannot_cover_with_fill() {
        // filling all nine tiles would give interior nodes more than two
        // same-color neighbors
        let puzzle = Puzzle::from_flow_text("A..\n...\n..A\n").unwrap();
        for backend in BACKENDS {
            assert!(matches!(
                solve(&puzzle, backend, None),
                Err(Error::Unsat)
            ));
        }
    }

    #[test]
    fn bridge_channels_carry_two_colors() {
        let puzzle = Puzzle::from_flow_text("A.B\n.+.\nB.A\n").unwrap();
        for result in solve_both(&puzzle) {
            let h = result.node_color["1,1:h"];
            let v = result.node_color["1,1:v"];
            assert!(h.is_some() && v.is_some());
            assert_ne!(h, v);
        }
    }

    #[test]
    fn hex_path_leaves_rest_unused() {
        let puzzle =
            Puzzle::from_flow_text("# type: hex\n# fill: no\nA..\n...\n..A\n").unwrap();
        for result in solve_both(&puzzle) {
            let colored = result.node_color.values().filter(|c| c.is_some()).count();
            assert_eq!(colored, result.paths[&'A'].len());
        }
    }

    #[test]
    fn ring_splits_into_arcs() {
        let tokens: Vec<String> = "ABBA..".chars().map(String::from).collect();
        let parts = space::circle::from_ring_tokens(&tokens).unwrap();
        let puzzle = Puzzle::from_space(parts, true, BTreeMap::new()).unwrap();

        let results = solve_both(&puzzle);
        // the solution is forced: B takes its short arc, A the long way round
        for result in &results {
            assert_eq!(result.paths[&'A'], ["0", "5", "4", "3"]);
            assert_eq!(result.paths[&'B'], ["1", "2"]);
        }
        assert_eq!(results[0].node_color, results[1].node_color);
    }

    const TRIANGLE: &str = r#"{
        "space": {
            "type": "graph",
            "nodes": {
                "n1": {"pos": [0, 0]},
                "n2": {"pos": [1, 0]},
                "n3": {"pos": [0.5, 1]}
            },
            "edges": [["n1", "n2"], ["n2", "n3"], ["n3", "n1"]]
        },
        "terminals": {"A": ["n1", "n2"]},
        "fill": FILL
    }"#;

    #[test]
    fn triangle_takes_the_direct_edge() {
        let puzzle = Puzzle::from_json_str(&TRIANGLE.replace("FILL", "false")).unwrap();
        for result in solve_both(&puzzle) {
            assert_eq!(result.paths[&'A'], ["n1", "n2"]);
            assert_eq!(result.node_color["n3"], None);
        }
    }

    #[test]
    fn triangle_unsat_with_fill() {
        // the third node cannot be covered: routing through it would leave
        // both terminals with two same-color neighbors
        let puzzle = Puzzle::from_json_str(&TRIANGLE.replace("FILL", "true")).unwrap();
        for backend in BACKENDS {
            assert!(matches!(
                solve(&puzzle, backend, None),
                Err(Error::Unsat)
            ));
        }
    }

    #[test]
    fn classic_five_color_board() {
        // flow free classic pack level 1
        let puzzle = Puzzle::from_flow_text(
            "A.B.D\n..C.E\n.....\n.B.D.\n.ACE.\n",
        )
        .unwrap();
        assert!(puzzle.fill);
        solve_both(&puzzle);
    }

    #[test]
    fn dfs_times_out_on_an_exhausted_budget() {
        let puzzle = Puzzle::from_flow_text(
            "A......B\n........\n........\n........\n........\n........\n........\nB......A\n",
        )
        .unwrap();
        assert!(matches!(
            solve(&puzzle, Backend::Dfs, Some(Duration::ZERO)),
            Err(Error::Timeout(_))
        ));
    }

    #[test]
    fn constraint_backend_goes_unknown_on_an_exhausted_budget() {
        // large enough that the decision procedure cannot finish inside a
        // millisecond; expiry surfaces as unknown-with-reason, not Timeout
        let mut rows = vec!["A..............B".to_string()];
        rows.extend(std::iter::repeat(".".repeat(16)).take(14));
        rows.push("B..............A".to_string());
        let puzzle = Puzzle::from_flow_text(&rows.join("\n")).unwrap();

        assert!(matches!(
            solve(&puzzle, Backend::Constraint, Some(Duration::from_millis(1))),
            Err(Error::Unknown(_))
        ));
    }

    #[test]
    fn shared_tile_terminal_pair_is_unsat() {
        // a two-node tile holding both of one color's endpoints: tile
        // exclusion can never hold, whichever engine looks at it
        let text = r#"{
            "space": {
                "type": "graph",
                "nodes": {"n1": {"pos": [0, 0]}, "n2": {"pos": [1, 0]}},
                "edges": [["n1", "n2"]]
            },
            "terminals": {"A": ["n1", "n2"]},
            "tiles": {"t1": ["n1", "n2"]},
            "fill": false
        }"#;
        let puzzle = Puzzle::from_json_str(text).unwrap();
        for backend in BACKENDS {
            assert!(matches!(
                solve(&puzzle, backend, None),
                Err(Error::Unsat)
            ));
        }
    }
}
