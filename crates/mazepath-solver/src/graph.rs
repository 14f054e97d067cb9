//! Index-based graph used by every search
//!
//! Strategies work on dense `usize` node indices instead of string labels.
//! Labels are sorted, so the same component always yields the same indices.

use mazepath_types::{Component, NodeId, Path};
use std::collections::VecDeque;

/// Fixed-width node set backed by 64-bit words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSet {
    words: Vec<u64>,
    count: usize,
}

impl NodeSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
            count: 0,
        }
    }

    pub fn insert(&mut self, node: usize) -> bool {
        let (word, bit) = (node / 64, 1u64 << (node % 64));
        if self.words[word] & bit != 0 {
            return false;
        }
        self.words[word] |= bit;
        self.count += 1;
        true
    }

    pub fn remove(&mut self, node: usize) -> bool {
        let (word, bit) = (node / 64, 1u64 << (node % 64));
        if self.words[word] & bit == 0 {
            return false;
        }
        self.words[word] &= !bit;
        self.count -= 1;
        true
    }

    pub fn contains(&self, node: usize) -> bool {
        self.words[node / 64] & (1u64 << (node % 64)) != 0
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Dense undirected graph over node indices
#[derive(Debug, Clone)]
pub struct Graph {
    labels: Vec<NodeId>,
    adjacency: Vec<Vec<usize>>,
}

impl Graph {
    /// Index a component; adjacency comes out symmetric and sorted
    pub fn from_component(component: &Component) -> Self {
        let labels: Vec<NodeId> = component.nodes().cloned().collect();
        let adjacency = labels
            .iter()
            .map(|label| {
                component
                    .neighbors(label)
                    .filter_map(|n| labels.binary_search(n).ok())
                    .collect()
            })
            .collect();
        Self { labels, adjacency }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, node: usize) -> &NodeId {
        &self.labels[node]
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.binary_search_by(|l| l.as_str().cmp(label)).ok()
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.adjacency[a].binary_search(&b).is_ok()
    }

    pub fn to_labels(&self, path: &[usize]) -> Path {
        path.iter().map(|&n| self.labels[n].clone()).collect()
    }

    /// Graph induced by `nodes`, keeping their labels
    pub fn induced(&self, nodes: &[usize]) -> Graph {
        let mut keep: Vec<usize> = nodes.to_vec();
        keep.sort_by(|a, b| self.labels[*a].cmp(&self.labels[*b]));
        keep.dedup();

        let mut remap = vec![usize::MAX; self.len()];
        for (new, &old) in keep.iter().enumerate() {
            remap[old] = new;
        }

        let labels = keep.iter().map(|&old| self.labels[old].clone()).collect();
        let adjacency = keep
            .iter()
            .map(|&old| {
                let mut neighbors: Vec<usize> = self.adjacency[old]
                    .iter()
                    .map(|&n| remap[n])
                    .filter(|&n| n != usize::MAX)
                    .collect();
                neighbors.sort_unstable();
                neighbors
            })
            .collect();
        Graph { labels, adjacency }
    }

    /// Number of unvisited nodes reachable from `from` through unvisited nodes
    ///
    /// `from` itself is not counted.
    pub fn reachable_unvisited(&self, from: usize, visited: &NodeSet, scratch: &mut Reach) -> usize {
        scratch.begin(self.len());
        scratch.mark(from);
        scratch.queue.push_back(from);
        let mut count = 0;
        while let Some(node) = scratch.queue.pop_front() {
            for &next in &self.adjacency[node] {
                if !visited.contains(next) && scratch.mark(next) {
                    count += 1;
                    scratch.queue.push_back(next);
                }
            }
        }
        count
    }

    /// Size of the connected piece containing `start`
    pub fn piece_size(&self, start: usize) -> usize {
        let mut scratch = Reach::default();
        self.reachable_unvisited(start, &NodeSet::new(self.len()), &mut scratch) + 1
    }

    /// Size of the largest connected piece
    pub fn largest_piece(&self) -> usize {
        let removed = NodeSet::new(self.len());
        self.pieces_excluding(&removed)
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    /// Connected pieces left after removing `node`
    pub fn pieces_without(&self, node: usize) -> Vec<Vec<usize>> {
        let mut removed = NodeSet::new(self.len());
        removed.insert(node);
        self.pieces_excluding(&removed)
    }

    fn pieces_excluding(&self, removed: &NodeSet) -> Vec<Vec<usize>> {
        let mut seen = removed.clone();
        let mut pieces = Vec::new();
        let mut queue = VecDeque::new();
        for root in 0..self.len() {
            if !seen.insert(root) {
                continue;
            }
            let mut piece = vec![root];
            queue.push_back(root);
            while let Some(node) = queue.pop_front() {
                for &next in &self.adjacency[node] {
                    if seen.insert(next) {
                        piece.push(next);
                        queue.push_back(next);
                    }
                }
            }
            pieces.push(piece);
        }
        pieces
    }

    /// Articulation points, found with an iterative low-link DFS
    pub fn articulation_points(&self) -> Vec<usize> {
        let n = self.len();
        let mut disc = vec![0usize; n];
        let mut low = vec![0usize; n];
        let mut parent = vec![usize::MAX; n];
        let mut is_cut = vec![false; n];
        let mut timer = 1;
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..n {
            if disc[root] != 0 {
                continue;
            }
            disc[root] = timer;
            low[root] = timer;
            timer += 1;
            let mut root_children = 0;
            stack.push((root, 0));

            while let Some(top) = stack.len().checked_sub(1) {
                let (node, cursor) = stack[top];
                if cursor < self.adjacency[node].len() {
                    stack[top].1 += 1;
                    let next = self.adjacency[node][cursor];
                    if disc[next] == 0 {
                        parent[next] = node;
                        disc[next] = timer;
                        low[next] = timer;
                        timer += 1;
                        if node == root {
                            root_children += 1;
                        }
                        stack.push((next, 0));
                    } else if next != parent[node] {
                        low[node] = low[node].min(disc[next]);
                    }
                } else {
                    stack.pop();
                    if let Some(&(up, _)) = stack.last() {
                        low[up] = low[up].min(low[node]);
                        if up != root && low[node] >= disc[up] {
                            is_cut[up] = true;
                        }
                    }
                }
            }

            if root_children > 1 {
                is_cut[root] = true;
            }
        }

        (0..n).filter(|&node| is_cut[node]).collect()
    }
}

/// Reusable BFS scratch space
///
/// Marks are generation-stamped so repeated searches skip the clearing pass.
#[derive(Debug, Default)]
pub struct Reach {
    stamps: Vec<u32>,
    generation: u32,
    queue: VecDeque<usize>,
}

impl Reach {
    fn begin(&mut self, size: usize) {
        if self.stamps.len() < size {
            self.stamps.resize(size, 0);
        }
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.stamps.iter_mut().for_each(|s| *s = 0);
            self.generation = 1;
        }
        self.queue.clear();
    }

    fn mark(&mut self, node: usize) -> bool {
        if self.stamps[node] == self.generation {
            return false;
        }
        self.stamps[node] = self.generation;
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Ring of `size` nodes labelled `{prefix}{i}`
    pub(crate) fn ring(prefix: &str, size: usize) -> Vec<(String, String)> {
        (0..size)
            .map(|i| (format!("{}{}", prefix, i), format!("{}{}", prefix, (i + 1) % size)))
            .collect()
    }

    /// Simple chain `0 - 1 - ... - (size-1)`
    pub(crate) fn chain(size: usize) -> Component {
        Component::from_edges((1..size).map(|i| ((i - 1).to_string(), i.to_string())))
    }

    #[test]
    fn test_node_set_basic() {
        let mut set = NodeSet::new(130);

        assert!(set.insert(0));
        assert!(set.insert(129));
        assert!(!set.insert(129));
        assert_eq!(set.len(), 2);
        assert!(set.contains(129));
        assert!(set.remove(0));
        assert!(!set.contains(0));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_graph_indices_follow_label_order() {
        let graph = Graph::from_component(&chain(3));

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.index_of("1"), Some(1));
        assert!(graph.has_edge(0, 1));
        assert!(!graph.has_edge(0, 2));
        assert_eq!(graph.to_labels(&[2, 1]), vec!["2".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_reachable_respects_visited() {
        let graph = Graph::from_component(&chain(5));
        let mut visited = NodeSet::new(5);
        visited.insert(2);
        let mut scratch = Reach::default();

        assert_eq!(graph.reachable_unvisited(0, &visited, &mut scratch), 1);
        assert_eq!(graph.reachable_unvisited(4, &visited, &mut scratch), 1);
        assert_eq!(graph.piece_size(0), 5);
    }

    #[test]
    fn test_articulation_points_of_chain() {
        let graph = Graph::from_component(&chain(4));
        let labels: Vec<&str> = graph
            .articulation_points()
            .into_iter()
            .map(|n| graph.label(n).as_str())
            .collect();

        assert_eq!(labels, vec!["1", "2"]);
    }

    #[test]
    fn test_ring_has_no_articulation_points() {
        let graph = Graph::from_component(&Component::from_edges(ring("r", 6)));

        assert!(graph.articulation_points().is_empty());
    }

    #[test]
    fn test_pieces_without_bridge_node() {
        let mut edges = ring("a", 5);
        edges.extend(ring("b", 5));
        edges.push(("a0".to_string(), "x".to_string()));
        edges.push(("x".to_string(), "b0".to_string()));
        let graph = Graph::from_component(&Component::from_edges(edges));
        let bridge = graph.index_of("x").unwrap();

        assert!(graph.articulation_points().contains(&bridge));
        let pieces = graph.pieces_without(bridge);
        assert_eq!(pieces.len(), 2);
        assert!(pieces.iter().all(|p| p.len() == 5));
    }

    #[test]
    fn test_induced_subgraph_keeps_labels() {
        let graph = Graph::from_component(&chain(4));
        let sub = graph.induced(&[3, 2]);

        assert_eq!(sub.len(), 2);
        assert_eq!(sub.label(0), "2");
        assert!(sub.has_edge(0, 1));
    }
}
