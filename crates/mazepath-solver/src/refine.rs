//! Post-search path improvement for the fast solver
//!
//! Two phases run on the best path the backtracking search found:
//!
//! 1. Endpoint refinement: the last few nodes at each end are cut off and
//!    re-solved exhaustively on the region reachable from the cut point
//!    without touching the rest of the path.
//! 2. Local moves: random extensions of either end and random detours
//!    spliced between two path nodes.
//!
//! A candidate replaces the current path only when it is longer and still a
//! simple path in the graph.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::debug;

use crate::fast::backtrack;
use crate::graph::{Graph, NodeSet};

/// Shorter paths are not worth refining
const REFINE_MIN_LEN: usize = 6;

/// Nodes re-solved at each end
const REFINE_TAIL: usize = 4;

/// Expansion budget for each exhaustive endpoint search
const REFINE_EXPANSIONS: usize = 50_000;

/// Local-move rounds per component
const IMPROVE_ROUNDS: usize = 200;

/// Longest random extension walk
const EXTEND_STEPS: usize = 100;

/// Longest detour walk
const DETOUR_STEPS: usize = 50;

/// Re-solve both ends of `path`; returns the longest path seen
pub(crate) fn refine_endpoints(
    graph: &Graph,
    adjacency: &[Vec<usize>],
    path: Vec<usize>,
    deadline: Instant,
) -> Vec<usize> {
    if path.len() < REFINE_MIN_LEN {
        return path;
    }
    let path = refine_tail(graph, adjacency, path, deadline);
    let mut reversed = path;
    reversed.reverse();
    let mut refined = refine_tail(graph, adjacency, reversed, deadline);
    refined.reverse();
    refined
}

/// Cut the last `REFINE_TAIL` nodes and search the freed region again
fn refine_tail(graph: &Graph, adjacency: &[Vec<usize>], path: Vec<usize>, deadline: Instant) -> Vec<usize> {
    if path.len() < REFINE_MIN_LEN || Instant::now() >= deadline {
        return path;
    }
    let cut = path.len() - REFINE_TAIL - 1;
    let anchor = path[cut];

    let mut blocked = NodeSet::new(graph.len());
    for &node in &path[..cut] {
        blocked.insert(node);
    }
    let tail = backtrack(adjacency, anchor, blocked, deadline, REFINE_EXPANSIONS, graph.len());

    let mut candidate = path[..cut].to_vec();
    candidate.extend(tail);
    if candidate.len() > path.len() && is_simple_path(graph, &candidate) {
        debug!(before = path.len(), after = candidate.len(), "Endpoint refinement extended path");
        return candidate;
    }
    path
}

/// Random extensions and detours; returns the longest path seen
pub(crate) fn improve(graph: &Graph, path: Vec<usize>, seed: u64, deadline: Instant) -> Vec<usize> {
    if path.is_empty() {
        return path;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut best = path;
    let start_len = best.len();

    for round in 0..IMPROVE_ROUNDS {
        if best.len() == graph.len() || (round % 16 == 0 && Instant::now() >= deadline) {
            break;
        }
        let candidate = if rng.gen_bool(0.5) {
            extend(graph, &best, &mut rng)
        } else {
            detour(graph, &best, &mut rng)
        };
        if let Some(candidate) = candidate {
            if candidate.len() > best.len() && is_simple_path(graph, &candidate) {
                best = candidate;
            }
        }
    }

    if best.len() > start_len {
        debug!(before = start_len, after = best.len(), "Local moves extended path");
    }
    best
}

/// Random walk off one end through nodes not on the path
fn extend(graph: &Graph, path: &[usize], rng: &mut StdRng) -> Option<Vec<usize>> {
    let mut extended = path.to_vec();
    if rng.gen_bool(0.5) {
        extended.reverse();
    }
    let mut on_path = NodeSet::new(graph.len());
    for &node in &extended {
        on_path.insert(node);
    }

    let mut current = *extended.last()?;
    for _ in 0..EXTEND_STEPS {
        let options: Vec<usize> = graph
            .neighbors(current)
            .iter()
            .copied()
            .filter(|&n| !on_path.contains(n))
            .collect();
        if options.is_empty() {
            break;
        }
        current = options[rng.gen_range(0..options.len())];
        on_path.insert(current);
        extended.push(current);
    }

    (extended.len() > path.len()).then_some(extended)
}

/// Leave the path at a random node, wander through unused nodes and rejoin
/// it further along, dropping the skipped stretch
fn detour(graph: &Graph, path: &[usize], rng: &mut StdRng) -> Option<Vec<usize>> {
    if path.len() < 2 {
        return None;
    }
    let mut position: Vec<Option<usize>> = vec![None; graph.len()];
    for (index, &node) in path.iter().enumerate() {
        position[node] = Some(index);
    }

    let leave = rng.gen_range(0..path.len() - 1);
    let mut used = NodeSet::new(graph.len());
    let mut walk: Vec<usize> = Vec::new();
    let mut current = path[leave];
    for _ in 0..DETOUR_STEPS {
        let options: Vec<usize> = graph
            .neighbors(current)
            .iter()
            .copied()
            .filter(|&n| position[n].is_none() && !used.contains(n))
            .collect();
        if options.is_empty() {
            break;
        }
        current = options[rng.gen_range(0..options.len())];
        used.insert(current);
        walk.push(current);
    }

    // Best rejoin point: the walk prefix that gains the most over the
    // stretch it replaces
    let mut best: Option<(usize, usize, usize)> = None;
    for (k, &node) in walk.iter().enumerate() {
        let Some(rejoin) = graph
            .neighbors(node)
            .iter()
            .filter_map(|&n| position[n])
            .filter(|&r| r > leave)
            .min()
        else {
            continue;
        };
        let skipped = rejoin - leave - 1;
        let gain = (k + 1).saturating_sub(skipped);
        if gain > 0 && best.map_or(true, |(g, _, _)| gain > g) {
            best = Some((gain, k, rejoin));
        }
    }

    let (_, k, rejoin) = best?;
    let mut spliced = path[..=leave].to_vec();
    spliced.extend_from_slice(&walk[..=k]);
    spliced.extend_from_slice(&path[rejoin..]);
    Some(spliced)
}

/// Distinct nodes joined by edges
fn is_simple_path(graph: &Graph, path: &[usize]) -> bool {
    let mut seen = NodeSet::new(graph.len());
    path.iter().all(|&n| n < graph.len() && seen.insert(n))
        && path.windows(2).all(|pair| graph.has_edge(pair[0], pair[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{chain, ring};
    use mazepath_types::Component;
    use std::time::Duration;

    fn indices(graph: &Graph, labels: &[&str]) -> Vec<usize> {
        labels.iter().filter_map(|l| graph.index_of(l)).collect()
    }

    fn adjacency(graph: &Graph) -> Vec<Vec<usize>> {
        (0..graph.len()).map(|n| graph.neighbors(n).to_vec()).collect()
    }

    fn later() -> Instant {
        Instant::now() + Duration::from_secs(2)
    }

    /// A chain 0..=7 with a pocket p0-p1-p2 hanging between 5 and 7
    fn pocket() -> Component {
        let mut edges: Vec<(String, String)> = (1..8).map(|i| ((i - 1).to_string(), i.to_string())).collect();
        edges.push(("5".to_string(), "p0".to_string()));
        edges.push(("p0".to_string(), "p1".to_string()));
        edges.push(("p1".to_string(), "p2".to_string()));
        edges.push(("p2".to_string(), "7".to_string()));
        Component::from_edges(edges)
    }

    #[test]
    fn test_refinement_reroutes_tail_through_pocket() {
        let graph = Graph::from_component(&pocket());
        let path = indices(&graph, &["0", "1", "2", "3", "4", "5", "6", "7"]);

        let refined = refine_endpoints(&graph, &adjacency(&graph), path, later());

        assert_eq!(refined.len(), graph.len());
        assert!(is_simple_path(&graph, &refined));
        assert_eq!(graph.label(refined[0]), "0");
    }

    #[test]
    fn test_refinement_leaves_short_paths_alone() {
        let graph = Graph::from_component(&chain(5));
        let path = indices(&graph, &["1", "2", "3"]);

        assert_eq!(refine_endpoints(&graph, &adjacency(&graph), path.clone(), later()), path);
    }

    #[test]
    fn test_local_moves_grow_partial_ring_path() {
        let graph = Graph::from_component(&Component::from_edges(ring("r", 30)));
        let path = indices(&graph, &["r10", "r11", "r12"]);

        let improved = improve(&graph, path, 11, later());

        assert_eq!(improved.len(), 30);
        assert!(is_simple_path(&graph, &improved));
    }

    #[test]
    fn test_detour_splices_unused_nodes() {
        let graph = Graph::from_component(&pocket());
        let path = indices(&graph, &["4", "5", "6", "7"]);
        let mut rng = StdRng::seed_from_u64(1);

        let spliced = (0..64).find_map(|_| detour(&graph, &path, &mut rng)).unwrap();

        assert_eq!(spliced.len(), 6);
        assert!(is_simple_path(&graph, &spliced));
    }

    #[test]
    fn test_simple_path_check() {
        let graph = Graph::from_component(&chain(4));

        assert!(is_simple_path(&graph, &indices(&graph, &["0", "1", "2"])));
        assert!(!is_simple_path(&graph, &indices(&graph, &["0", "2"])));
        assert!(!is_simple_path(&graph, &indices(&graph, &["0", "1", "0"])));
    }
}
