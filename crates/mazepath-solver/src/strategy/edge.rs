//! Edge-based formulation
//!
//! A solution is a selection over the graph's edges where every node has
//! zero, one (endpoint) or two (interior) selected incident edges. The search
//! keeps the selection as a single path: it extends at the tail and, when the
//! tail is stuck, rotates by selecting a chord from the tail and deselecting
//! the path edge right after the chord's other end.

use mazepath_types::StrategyKind;
use rand::rngs::StdRng;
use rand::Rng;
use std::time::Instant;
use tracing::debug;

use super::{ordered_options, pick_start, PathStrategy, SearchContext};
use crate::error::StrategyError;
use crate::graph::{Graph, NodeSet};

const STRATEGY_NAME: &str = "edge";

/// Iterations between deadline checks
const CHECK_INTERVAL: usize = 64;

/// Chance of flipping the path to work on the other endpoint
const FLIP_PROBABILITY: f64 = 0.1;

/// Per-edge path membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSelection {
    edges: Vec<(usize, usize)>,
    selected: Vec<bool>,
    degree: Vec<u8>,
}

impl EdgeSelection {
    /// Empty selection over every edge of `graph`
    pub fn new(graph: &Graph) -> Self {
        let edges: Vec<(usize, usize)> = (0..graph.len())
            .flat_map(|a| {
                graph
                    .neighbors(a)
                    .iter()
                    .filter(move |&&b| a < b)
                    .map(move |&b| (a, b))
            })
            .collect();
        Self {
            selected: vec![false; edges.len()],
            degree: vec![0; graph.len()],
            edges,
        }
    }

    /// Selection whose edges are exactly the consecutive pairs of `path`
    pub fn from_path(graph: &Graph, path: &[usize]) -> Self {
        let mut selection = Self::new(graph);
        for pair in path.windows(2) {
            selection.select(pair[0], pair[1]);
        }
        selection
    }

    fn index(&self, a: usize, b: usize) -> Option<usize> {
        let key = if a < b { (a, b) } else { (b, a) };
        self.edges.binary_search(&key).ok()
    }

    /// Select edge `a - b`; refused when it would push a node past degree 2
    pub fn select(&mut self, a: usize, b: usize) -> bool {
        let Some(edge) = self.index(a, b) else {
            return false;
        };
        if self.selected[edge] || self.degree[a] >= 2 || self.degree[b] >= 2 {
            return false;
        }
        self.selected[edge] = true;
        self.degree[a] += 1;
        self.degree[b] += 1;
        true
    }

    pub fn deselect(&mut self, a: usize, b: usize) -> bool {
        let Some(edge) = self.index(a, b) else {
            return false;
        };
        if !self.selected[edge] {
            return false;
        }
        self.selected[edge] = false;
        self.degree[a] -= 1;
        self.degree[b] -= 1;
        true
    }

    pub fn is_selected(&self, a: usize, b: usize) -> bool {
        self.index(a, b).map(|e| self.selected[e]).unwrap_or(false)
    }

    /// Objective value: nodes touching at least one selected edge
    pub fn covered_count(&self) -> usize {
        self.degree.iter().filter(|&&d| d > 0).count()
    }

    /// Read the path back out of the selection
    ///
    /// Requires exactly two degree-1 nodes; any other count yields `None`.
    pub fn reconstruct(&self) -> Option<Vec<usize>> {
        let endpoints: Vec<usize> = (0..self.degree.len())
            .filter(|&n| self.degree[n] == 1)
            .collect();
        if endpoints.len() != 2 {
            return None;
        }

        let mut incident: Vec<Vec<usize>> = vec![Vec::new(); self.degree.len()];
        for (edge, &(a, b)) in self.edges.iter().enumerate() {
            if self.selected[edge] {
                incident[a].push(b);
                incident[b].push(a);
            }
        }

        let mut path = vec![endpoints[0]];
        let mut previous = usize::MAX;
        let mut current = endpoints[0];
        while current != endpoints[1] {
            let next = incident[current].iter().copied().find(|&n| n != previous)?;
            path.push(next);
            previous = current;
            current = next;
        }
        Some(path)
    }
}

/// Rotation/extension local search with randomized restarts
#[derive(Debug, Clone, Default)]
pub struct EdgeStrategy;

impl EdgeStrategy {
    pub fn new() -> Self {
        Self
    }
}

/// Mutable search state for one restart
struct Walk {
    path: Vec<usize>,
    position: Vec<usize>,
    on_path: NodeSet,
    selection: EdgeSelection,
}

impl Walk {
    fn new(graph: &Graph, start: usize) -> Self {
        let mut on_path = NodeSet::new(graph.len());
        on_path.insert(start);
        let mut position = vec![usize::MAX; graph.len()];
        position[start] = 0;
        Self {
            path: vec![start],
            position,
            on_path,
            selection: EdgeSelection::new(graph),
        }
    }

    fn tail(&self) -> usize {
        self.path[self.path.len() - 1]
    }

    fn extend(&mut self, next: usize) {
        let tail = self.tail();
        self.selection.select(tail, next);
        self.position[next] = self.path.len();
        self.path.push(next);
        self.on_path.insert(next);
    }

    /// Swap edge `path[i] - path[i+1]` for chord `path[i] - tail`
    fn rotate(&mut self, i: usize) {
        let tail = self.tail();
        self.selection.deselect(self.path[i], self.path[i + 1]);
        self.selection.select(self.path[i], tail);
        self.path[i + 1..].reverse();
        self.reindex(i + 1);
    }

    fn flip(&mut self) {
        self.path.reverse();
        self.reindex(0);
    }

    fn reindex(&mut self, from: usize) {
        for (offset, &node) in self.path[from..].iter().enumerate() {
            self.position[node] = from + offset;
        }
    }

    fn head_can_extend(&self, graph: &Graph) -> bool {
        graph
            .neighbors(self.path[0])
            .iter()
            .any(|&n| !self.on_path.contains(n))
    }
}

impl PathStrategy for EdgeStrategy {
    fn solve(&self, graph: &Graph, ctx: &SearchContext) -> Result<Option<Vec<usize>>, StrategyError> {
        if graph.is_empty() {
            return Ok(None);
        }

        let started = Instant::now();
        let target = graph.largest_piece();
        let stall_limit = 4 * graph.len() + 100;
        let mut rng = ctx.rng(0);
        let mut best = EdgeSelection::new(graph);
        let mut best_len = 0usize;
        let mut restarts = 0usize;
        let mut iterations = 0usize;

        'restarts: while best_len < target && !ctx.expired() {
            restarts += 1;
            let mut walk = Walk::new(graph, pick_start(graph, &mut rng));
            let mut stall = 0usize;
            if best_len == 0 {
                best_len = 1;
                best = walk.selection.clone();
                continue;
            }

            while stall <= stall_limit {
                iterations += 1;
                if iterations % CHECK_INTERVAL == 0 && ctx.expired() {
                    break 'restarts;
                }

                if rng.gen_bool(FLIP_PROBABILITY) && walk.head_can_extend(graph) {
                    walk.flip();
                }

                let tail = walk.tail();
                if let Some(&next) = ordered_options(graph, tail, &walk.on_path, &mut rng).first() {
                    walk.extend(next);
                    if walk.path.len() > best_len {
                        best_len = walk.path.len();
                        best = walk.selection.clone();
                        stall = 0;
                        if best_len >= target {
                            break 'restarts;
                        }
                    }
                    continue;
                }

                if walk.head_can_extend(graph) {
                    walk.flip();
                    continue;
                }

                match rotation_pivot(graph, &walk, &mut rng) {
                    Some(i) => {
                        walk.rotate(i);
                        stall += 1;
                    }
                    None => break,
                }
            }
        }

        debug!(
            nodes = graph.len(),
            best = best_len,
            restarts = restarts,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Edge search finished"
        );

        Ok(best.reconstruct())
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::EdgeBased
    }

    fn name(&self) -> &'static str {
        STRATEGY_NAME
    }
}

/// Random path position `i` whose node is a chord neighbor of the tail
fn rotation_pivot(graph: &Graph, walk: &Walk, rng: &mut StdRng) -> Option<usize> {
    let last = walk.path.len() - 1;
    let pivots: Vec<usize> = graph
        .neighbors(walk.tail())
        .iter()
        .filter(|&&n| walk.on_path.contains(n))
        .map(|&n| walk.position[n])
        .filter(|&i| i + 1 < last)
        .collect();
    if pivots.is_empty() {
        return None;
    }
    Some(pivots[rng.gen_range(0..pivots.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{chain, ring};
    use mazepath_types::Component;
    use std::time::Duration;

    fn ctx() -> SearchContext {
        SearchContext::new(Instant::now() + Duration::from_secs(3), 7)
    }

    #[test]
    fn test_selection_enforces_degree_two() {
        let graph = Graph::from_component(&Component::from_edges(
            ["a", "b", "c"].iter().map(|leaf| ("hub".to_string(), leaf.to_string())),
        ));
        let hub = graph.index_of("hub").unwrap();
        let mut selection = EdgeSelection::new(&graph);

        assert!(selection.select(hub, graph.index_of("a").unwrap()));
        assert!(selection.select(hub, graph.index_of("b").unwrap()));
        assert!(!selection.select(hub, graph.index_of("c").unwrap()));
        assert_eq!(selection.covered_count(), 3);
    }

    #[test]
    fn test_reconstruct_walks_from_endpoint() {
        let graph = Graph::from_component(&chain(5));
        let selection = EdgeSelection::from_path(&graph, &[1, 2, 3]);

        let path = selection.reconstruct().unwrap();
        assert!(path == vec![1, 2, 3] || path == vec![3, 2, 1]);
    }

    #[test]
    fn test_reconstruct_rejects_cycle() {
        let graph = Graph::from_component(&Component::from_edges(ring("r", 4)));
        let mut selection = EdgeSelection::from_path(&graph, &[0, 1, 2, 3]);
        selection.select(3, 0);

        assert!(selection.reconstruct().is_none());
    }

    #[test]
    fn test_empty_selection_yields_nothing() {
        let graph = Graph::from_component(&chain(3));

        assert!(EdgeSelection::new(&graph).reconstruct().is_none());
    }

    #[test]
    fn test_rotation_keeps_selection_consistent() {
        let graph = Graph::from_component(&Component::from_edges(ring("r", 6)));
        let mut walk = Walk::new(&graph, 0);
        for next in 1..6 {
            walk.extend(next);
        }
        walk.rotate(0);

        assert!(walk.selection.is_selected(0, 5));
        assert!(!walk.selection.is_selected(0, 1));
        assert_eq!(walk.path, vec![0, 5, 4, 3, 2, 1]);
        assert_eq!(walk.selection.reconstruct().unwrap().len(), 6);
    }

    #[test]
    fn test_single_node_has_no_edge_path() {
        let mut component = Component::new();
        component.add_node("solo".to_string());
        let graph = Graph::from_component(&component);

        assert!(EdgeStrategy::new().solve(&graph, &ctx()).unwrap().is_none());
    }

    #[test]
    fn test_finds_hamiltonian_path_on_grid() {
        let mut edges = Vec::new();
        for row in 0..4 {
            for col in 0..4 {
                let node = format!("{}-{}", row, col);
                if col < 3 {
                    edges.push((node.clone(), format!("{}-{}", row, col + 1)));
                }
                if row < 3 {
                    edges.push((node, format!("{}-{}", row + 1, col)));
                }
            }
        }
        let graph = Graph::from_component(&Component::from_edges(edges));
        let path = EdgeStrategy::new().solve(&graph, &ctx()).unwrap().unwrap();

        assert_eq!(path.len(), 16);
        assert!(path.windows(2).all(|p| graph.has_edge(p[0], p[1])));
    }
}
