//! Rank-based formulation
//!
//! Every node carries a rank: `-1` when it is off the path, otherwise its
//! position. Ranks are unique and gap-free, and consecutive ranks sit on
//! adjacent nodes. The search assigns ranks one at a time along a depth-first
//! walk, so those three constraints hold by construction and only the
//! objective (in-path count) needs searching.
//!
//! Workers run on a dedicated rayon pool and share one incumbent. Each worker
//! restarts from a fresh start node after a fixed expansion budget.

use mazepath_types::StrategyKind;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, warn};

use super::{ordered_options, pick_start, Incumbent, PathStrategy, SearchContext};
use crate::error::StrategyError;
use crate::graph::{Graph, NodeSet, Reach};

const STRATEGY_NAME: &str = "rank";

/// Minimum expansions before a worker restarts
const MIN_RESTART_EXPANSIONS: usize = 10_000;

/// How many expansions pass between deadline checks
const CHECK_INTERVAL: usize = 256;

/// Rank per node; `-1` marks a node outside the path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankAssignment {
    ranks: Vec<i64>,
}

impl RankAssignment {
    /// Assignment for `path` over a graph of `node_count` nodes
    pub fn from_path(node_count: usize, path: &[usize]) -> Self {
        let mut ranks = vec![-1; node_count];
        for (rank, &node) in path.iter().enumerate() {
            ranks[node] = rank as i64;
        }
        Self { ranks }
    }

    pub fn from_ranks(ranks: Vec<i64>) -> Self {
        Self { ranks }
    }

    pub fn rank(&self, node: usize) -> Option<usize> {
        self.ranks
            .get(node)
            .and_then(|&r| if r >= 0 { Some(r as usize) } else { None })
    }

    /// Objective value
    pub fn in_path_count(&self) -> usize {
        self.ranks.iter().filter(|&&r| r >= 0).count()
    }

    /// Check the rank constraints against `graph`
    pub fn satisfies(&self, graph: &Graph) -> bool {
        if self.ranks.len() != graph.len() {
            return false;
        }
        let ordered = self.ordered();
        let contiguous = ordered
            .iter()
            .enumerate()
            .all(|(expected, &(rank, _))| rank as usize == expected);
        contiguous
            && ordered
                .windows(2)
                .all(|pair| graph.has_edge(pair[0].1, pair[1].1))
    }

    /// Nodes in rank order
    pub fn into_path(self) -> Vec<usize> {
        self.ordered().into_iter().map(|(_, node)| node).collect()
    }

    fn ordered(&self) -> Vec<(i64, usize)> {
        let mut ordered: Vec<(i64, usize)> = self
            .ranks
            .iter()
            .enumerate()
            .filter(|(_, &r)| r >= 0)
            .map(|(node, &r)| (r, node))
            .collect();
        ordered.sort_unstable();
        ordered
    }
}

/// Parallel randomized branch and bound over rank assignments
#[derive(Debug, Clone)]
pub struct RankStrategy {
    workers: usize,
}

impl RankStrategy {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Search with rank 0 optionally pinned to `start`
    pub fn solve_from(
        &self,
        graph: &Graph,
        ctx: &SearchContext,
        start: Option<usize>,
    ) -> Result<Option<RankAssignment>, StrategyError> {
        if graph.is_empty() {
            return Ok(None);
        }
        if let Some(start) = start {
            if start >= graph.len() {
                return Err(StrategyError::Setup(
                    STRATEGY_NAME,
                    format!("start node {} outside graph of {} nodes", start, graph.len()),
                ));
            }
        }

        let started = Instant::now();
        let target = match start {
            Some(start) => graph.piece_size(start),
            None => graph.largest_piece(),
        };
        let incumbent = Incumbent::default();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| StrategyError::Setup(STRATEGY_NAME, e.to_string()))?;

        pool.install(|| {
            (0..self.workers).into_par_iter().for_each(|worker| {
                search_worker(graph, ctx, start, target, &incumbent, worker as u64);
            })
        });

        let path = incumbent.take();
        debug!(
            nodes = graph.len(),
            best = path.len(),
            target = target,
            workers = self.workers,
            fixed_start = start.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rank search finished"
        );

        if path.is_empty() {
            return Ok(None);
        }
        let assignment = RankAssignment::from_path(graph.len(), &path);
        if !assignment.satisfies(graph) {
            warn!(best = path.len(), "Rank search produced an inconsistent assignment");
            return Ok(None);
        }
        Ok(Some(assignment))
    }
}

impl PathStrategy for RankStrategy {
    fn solve(&self, graph: &Graph, ctx: &SearchContext) -> Result<Option<Vec<usize>>, StrategyError> {
        Ok(self.solve_from(graph, ctx, None)?.map(RankAssignment::into_path))
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::RankBased
    }

    fn name(&self) -> &'static str {
        STRATEGY_NAME
    }
}

/// Options still to try below one path position
struct Frame {
    options: Vec<usize>,
    next: usize,
}

fn search_worker(
    graph: &Graph,
    ctx: &SearchContext,
    start: Option<usize>,
    target: usize,
    incumbent: &Incumbent,
    stream: u64,
) {
    let mut rng = ctx.rng(stream);
    let restart_budget = MIN_RESTART_EXPANSIONS.max(50 * graph.len());
    let mut visited = NodeSet::new(graph.len());
    let mut scratch = Reach::default();
    let mut path: Vec<usize> = Vec::with_capacity(graph.len());
    let mut frames: Vec<Frame> = Vec::with_capacity(graph.len());

    while !incumbent.is_done() && !ctx.expired() {
        let root = start.unwrap_or_else(|| pick_start(graph, &mut rng));
        visited.insert(root);
        path.push(root);
        if incumbent.offer(&path) && path.len() >= target {
            incumbent.finish();
        }
        frames.push(Frame {
            options: ordered_options(graph, root, &visited, &mut rng),
            next: 0,
        });

        let mut expansions = 0usize;
        let mut interrupted = false;
        while let Some(frame) = frames.last_mut() {
            if frame.next >= frame.options.len() {
                frames.pop();
                if let Some(node) = path.pop() {
                    visited.remove(node);
                }
                continue;
            }
            let node = frame.options[frame.next];
            frame.next += 1;
            if visited.contains(node) {
                continue;
            }

            visited.insert(node);
            path.push(node);
            expansions += 1;

            if path.len() > incumbent.len() && incumbent.offer(&path) && path.len() >= target {
                incumbent.finish();
                interrupted = true;
                break;
            }

            let bound = path.len() + graph.reachable_unvisited(node, &visited, &mut scratch);
            if bound <= incumbent.len() {
                path.pop();
                visited.remove(node);
            } else {
                frames.push(Frame {
                    options: ordered_options(graph, node, &visited, &mut rng),
                    next: 0,
                });
            }

            if expansions >= restart_budget
                || (expansions % CHECK_INTERVAL == 0 && (ctx.expired() || incumbent.is_done()))
            {
                interrupted = true;
                break;
            }
        }

        // A pinned start whose tree was fully explored is proven optimal
        if start.is_some() && !interrupted {
            incumbent.finish();
        }

        for node in path.drain(..) {
            visited.remove(node);
        }
        frames.clear();
    }
}
