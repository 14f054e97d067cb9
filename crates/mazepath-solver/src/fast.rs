//! Fast solver collaborator
//!
//! The dispatcher hands the whole fast-route set to a [`FastSolver`] as one
//! batch and expects one path per component back, in order. The solver is a
//! trait so an out-of-process implementation can be plugged in;
//! [`BacktrackingSolver`] is the in-process default.

use mazepath_types::{Component, Path};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::FastSolverError;
use crate::graph::{Graph, NodeSet};
use crate::refine::{improve, refine_endpoints};
use crate::strategy::{derive_seed, time_seed};
use parking_lot::Mutex;

/// One batched fast-solver call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastBatch {
    #[serde(rename = "largeComponents")]
    pub components: Vec<Component>,
}

impl FastBatch {
    pub fn new(components: Vec<Component>) -> Self {
        Self { components }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// JSON payload for an out-of-process solver
    pub fn to_payload(&self) -> Result<String, FastSolverError> {
        serde_json::to_string(self).map_err(|e| FastSolverError::Payload(e.to_string()))
    }

    pub fn from_payload(payload: &str) -> Result<Self, FastSolverError> {
        serde_json::from_str(payload).map_err(|e| FastSolverError::Payload(e.to_string()))
    }
}

/// Batched longest-path solver for small components
///
/// Implementations are blocking; the dispatcher runs them on the worker pool.
pub trait FastSolver: Send + Sync {
    /// Solver name for logging
    fn name(&self) -> &'static str;

    /// Solve every component of `batch`, returning one path per component
    fn solve_batch(&self, batch: &FastBatch) -> Result<Vec<Path>, FastSolverError>;
}

/// Components at or below this size are searched exhaustively
pub const DEFAULT_EXACT_LIMIT: usize = 100;

/// Start nodes tried on components above the exact limit
pub const DEFAULT_MAX_STARTS: usize = 254;

/// Neighbor lists are degree-sorted above this size
const DEGREE_ORDER_THRESHOLD: usize = 180;

/// Expansions allowed per start node in the heuristic search
const EXPANSIONS_PER_START: usize = 200_000;

/// Parallel depth-first backtracking solver
#[derive(Debug, Clone)]
pub struct BacktrackingSolver {
    exact_limit: usize,
    max_starts: usize,
    time_limit: Duration,
    seed: Option<u64>,
}

impl Default for BacktrackingSolver {
    fn default() -> Self {
        Self {
            exact_limit: DEFAULT_EXACT_LIMIT,
            max_starts: DEFAULT_MAX_STARTS,
            time_limit: Duration::from_secs(12),
            seed: None,
        }
    }
}

impl BacktrackingSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-component search time limit
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_exact_limit(mut self, exact_limit: usize) -> Self {
        self.exact_limit = exact_limit;
        self
    }

    /// Pin the seed of the local-move phase
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn solve_component(&self, component: &Component) -> Path {
        let started = Instant::now();
        let graph = Graph::from_component(component);
        if graph.is_empty() {
            return Vec::new();
        }

        let deadline = started + self.time_limit;
        let exact = graph.len() <= self.exact_limit;
        let starts = if exact {
            exact_starts(&graph)
        } else {
            bucketed_starts(&graph, self.max_starts)
        };
        let expansion_cap = if exact { usize::MAX } else { EXPANSIONS_PER_START };
        let ordered = ordered_neighbors(&graph);
        let target = graph.largest_piece();

        let best_len = AtomicUsize::new(0);
        let best_path: Mutex<Vec<usize>> = Mutex::new(Vec::new());
        starts.par_iter().for_each(|&start| {
            if best_len.load(Ordering::Acquire) >= target || Instant::now() >= deadline {
                return;
            }
            let visited = NodeSet::new(graph.len());
            let path = backtrack(&ordered, start, visited, deadline, expansion_cap, target);
            if path.len() > best_len.load(Ordering::Acquire) {
                let mut best = best_path.lock();
                if path.len() > best.len() {
                    best_len.store(path.len(), Ordering::Release);
                    *best = path;
                }
            }
        });

        let mut path = std::mem::take(&mut *best_path.lock());
        let searched = path.len();
        if searched < target && Instant::now() < deadline {
            path = refine_endpoints(&graph, &ordered, path, deadline);
            let seed = derive_seed(self.seed.unwrap_or_else(time_seed), graph.len() as u64);
            path = improve(&graph, path, seed, deadline);
        }
        debug!(
            nodes = graph.len(),
            searched = searched,
            len = path.len(),
            exact = exact,
            starts = starts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Backtracking search finished"
        );
        graph.to_labels(&path)
    }
}

impl FastSolver for BacktrackingSolver {
    fn name(&self) -> &'static str {
        "backtracking"
    }

    fn solve_batch(&self, batch: &FastBatch) -> Result<Vec<Path>, FastSolverError> {
        let started = Instant::now();
        let paths: Vec<Path> = batch
            .components
            .par_iter()
            .map(|component| self.solve_component(component))
            .collect();

        info!(
            components = batch.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fast batch solved"
        );
        Ok(paths)
    }
}

/// Low-degree nodes, or every node when fewer than two exist
fn exact_starts(graph: &Graph) -> Vec<usize> {
    let low: Vec<usize> = (0..graph.len()).filter(|&n| graph.degree(n) <= 2).collect();
    if low.len() < 2 {
        (0..graph.len()).collect()
    } else {
        low
    }
}

/// Up to `limit` start nodes: all degree 1, then degree 2, then the rest
fn bucketed_starts(graph: &Graph, limit: usize) -> Vec<usize> {
    if graph.len() <= limit {
        return (0..graph.len()).collect();
    }
    let mut starts: Vec<usize> = (0..graph.len()).collect();
    starts.sort_by_key(|&n| (graph.degree(n).clamp(1, 3), n % 97));
    starts.truncate(limit);
    starts
}

/// Neighbor lists, fewest-degree first on larger graphs
fn ordered_neighbors(graph: &Graph) -> Vec<Vec<usize>> {
    (0..graph.len())
        .map(|n| {
            let mut neighbors = graph.neighbors(n).to_vec();
            if graph.len() > DEGREE_ORDER_THRESHOLD {
                neighbors.sort_by_key(|&m| graph.degree(m));
            }
            neighbors
        })
        .collect()
}

/// Depth-first search from `start` avoiding `visited`, best path found
/// before the limits
pub(crate) fn backtrack(
    adjacency: &[Vec<usize>],
    start: usize,
    mut visited: NodeSet,
    deadline: Instant,
    expansion_cap: usize,
    target: usize,
) -> Vec<usize> {
    let mut path = vec![start];
    let mut cursors = vec![0usize];
    let mut best = path.clone();
    let mut expansions = 0usize;
    visited.insert(start);

    while let Some(&node) = path.last() {
        let top = cursors.len() - 1;
        let cursor = cursors[top];
        if cursor >= adjacency[node].len() {
            cursors.pop();
            path.pop();
            visited.remove(node);
            continue;
        }
        cursors[top] += 1;

        let next = adjacency[node][cursor];
        if !visited.insert(next) {
            continue;
        }
        path.push(next);
        cursors.push(0);
        expansions += 1;

        if path.len() > best.len() {
            best.clone_from(&path);
            if best.len() >= target {
                break;
            }
        }
        if expansions >= expansion_cap || (expansions % 1024 == 0 && Instant::now() >= deadline) {
            break;
        }
    }
    best
}
