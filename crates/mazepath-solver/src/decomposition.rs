//! Cut-vertex decomposition for oversized components
//!
//! ```text
//!   side 1            cut            side 2
//!  ┌───────┐          (c)          ┌───────┐
//!  │  ...  ├──────────  ───────────┤  ...  │
//!  └───────┘                       └───────┘
//!
//!  p1 = longest path in side1 ∪ {c} starting at c
//!  p2 = longest path in side2 ∪ {c} starting at c
//!  merged = reverse(p1) ++ p2[1..]
//! ```
//!
//! Candidate cut vertices are articulation points of degree exactly 2 whose
//! removal leaves two pieces of at least `max(1, N/10)` nodes each.

use mazepath_core::ServiceConfig;
use mazepath_types::{Component, ComponentOutcome, StrategyKind};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::graph::Graph;
use crate::strategy::{derive_seed, run_guarded, time_seed, RankStrategy, SearchContext};
use crate::validator::is_valid_path;

/// A cut vertex with the two pieces its removal leaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancedCut {
    pub vertex: usize,
    pub sides: [Vec<usize>; 2],
}

impl BalancedCut {
    /// Size of the smaller piece
    pub fn balance(&self) -> usize {
        self.sides[0].len().min(self.sides[1].len())
    }
}

/// Solver for components too large for the strategy portfolio
pub struct DecompositionSolver {
    rank: RankStrategy,
    side_budget: Duration,
    total_budget: Duration,
    seed: Option<u64>,
}

impl DecompositionSolver {
    pub fn new(config: &ServiceConfig) -> Self {
        let budgets = &config.budgets;
        Self {
            rank: RankStrategy::new(config.search.workers),
            side_budget: budgets.rank() / 2,
            total_budget: budgets.rank() + budgets.edge() + budgets.beam(),
            seed: config.search.seed,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Balanced degree-2 cut vertices, most balanced first
    pub fn balanced_cuts(graph: &Graph) -> Vec<BalancedCut> {
        let min_side = (graph.len() / 10).max(1);
        let mut cuts: Vec<BalancedCut> = graph
            .articulation_points()
            .into_iter()
            .filter(|&vertex| graph.degree(vertex) == 2)
            .filter_map(|vertex| {
                let pieces = graph.pieces_without(vertex);
                if pieces.len() != 2 || pieces.iter().any(|p| p.len() < min_side) {
                    return None;
                }
                let mut pieces = pieces.into_iter();
                let first = pieces.next()?;
                let second = pieces.next()?;
                Some(BalancedCut {
                    vertex,
                    sides: [first, second],
                })
            })
            .collect();
        cuts.sort_by(|a, b| b.balance().cmp(&a.balance()).then(a.vertex.cmp(&b.vertex)));
        cuts
    }

    /// Solve one component through its balanced cut vertices
    ///
    /// A component without a balanced cut comes back unresolved.
    pub fn solve(&self, component: &Component) -> ComponentOutcome {
        let started = Instant::now();
        let deadline = started + self.total_budget;
        let graph = Graph::from_component(component);
        let cuts = Self::balanced_cuts(&graph);
        let seed = self.seed.unwrap_or_else(time_seed);

        debug!(nodes = graph.len(), candidates = cuts.len(), "Decomposing component");

        let mut best: Vec<usize> = Vec::new();
        for (index, cut) in cuts.iter().enumerate() {
            if Instant::now() >= deadline {
                debug!(tried = index, "Decomposition budget exhausted");
                break;
            }

            let Some(merged) = self.solve_cut(&graph, cut, derive_seed(seed, index as u64), deadline) else {
                continue;
            };
            if !is_valid_path(component, &graph.to_labels(&merged)) {
                warn!(cut = %graph.label(cut.vertex), "Discarding invalid stitched path");
                continue;
            }
            if merged.len() > best.len() {
                debug!(cut = %graph.label(cut.vertex), len = merged.len(), "New best stitched path");
                best = merged;
            }
            if best.len() == graph.len() {
                break;
            }
        }

        let elapsed = started.elapsed();
        if best.is_empty() {
            warn!(nodes = graph.len(), "No balanced cut vertex produced a path");
            return ComponentOutcome::unresolved(elapsed);
        }
        info!(
            nodes = graph.len(),
            len = best.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Component solved by decomposition"
        );
        ComponentOutcome::new(graph.to_labels(&best), StrategyKind::Decomposition, elapsed)
    }

    /// Solve both sides anchored on the cut vertex and stitch them
    fn solve_cut(&self, graph: &Graph, cut: &BalancedCut, seed: u64, deadline: Instant) -> Option<Vec<usize>> {
        let mut halves: Vec<Vec<usize>> = Vec::with_capacity(2);
        for (side_index, side) in cut.sides.iter().enumerate() {
            let mut nodes = side.clone();
            nodes.push(cut.vertex);
            let sub = graph.induced(&nodes);
            let anchor = sub.index_of(graph.label(cut.vertex))?;

            let side_deadline = (Instant::now() + self.side_budget).min(deadline);
            let ctx = SearchContext::new(side_deadline, derive_seed(seed, side_index as u64));
            let assignment = match run_guarded("rank", || self.rank.solve_from(&sub, &ctx, Some(anchor))) {
                Ok(Some(assignment)) => assignment,
                Ok(None) => return None,
                Err(e) => {
                    warn!(error = %e, "Fixed-start search failed");
                    return None;
                }
            };

            // Map back into the parent graph's indices
            let half: Option<Vec<usize>> = assignment
                .into_path()
                .into_iter()
                .map(|n| graph.index_of(sub.label(n)))
                .collect();
            halves.push(half?);
        }

        let second = halves.pop()?;
        let mut merged = halves.pop()?;
        if merged.first() != Some(&cut.vertex) || second.first() != Some(&cut.vertex) {
            return None;
        }
        merged.reverse();
        merged.extend_from_slice(&second[1..]);
        Some(merged)
    }
}
