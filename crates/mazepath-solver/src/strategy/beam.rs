//! Multi-start beam search

use mazepath_types::StrategyKind;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Instant;
use tracing::debug;

use super::{PathStrategy, SearchContext};
use crate::error::StrategyError;
use crate::graph::{Graph, NodeSet};

const STRATEGY_NAME: &str = "beam";

/// Partial simple path on the frontier
#[derive(Debug, Clone)]
struct Candidate {
    path: Vec<usize>,
    visited: NodeSet,
}

impl Candidate {
    fn seed(graph: &Graph, node: usize) -> Self {
        let mut visited = NodeSet::new(graph.len());
        visited.insert(node);
        Self {
            path: vec![node],
            visited,
        }
    }

    fn tail(&self) -> usize {
        self.path[self.path.len() - 1]
    }

    fn extended(&self, next: usize) -> Self {
        let mut child = self.clone();
        child.path.push(next);
        child.visited.insert(next);
        child
    }

    fn onward(&self, graph: &Graph) -> usize {
        graph
            .neighbors(self.tail())
            .iter()
            .filter(|&&n| !self.visited.contains(n))
            .count()
    }
}

/// Greedy width-bounded frontier of partial paths from several seeds
#[derive(Debug, Clone)]
pub struct BeamStrategy {
    width: usize,
    seeds: usize,
    coverage: f64,
}

impl BeamStrategy {
    pub fn new(width: usize, seeds: usize, coverage: f64) -> Self {
        Self {
            width: width.max(1),
            seeds: seeds.max(1),
            coverage,
        }
    }

    /// Degree-1 nodes first, then degree-2, padded with random nodes
    fn seed_nodes(&self, graph: &Graph, rng: &mut StdRng) -> Vec<usize> {
        let mut ends: Vec<usize> = (0..graph.len()).filter(|&n| graph.degree(n) == 1).collect();
        let mut corridors: Vec<usize> = (0..graph.len()).filter(|&n| graph.degree(n) == 2).collect();
        let mut rest: Vec<usize> = (0..graph.len()).filter(|&n| graph.degree(n) > 2 || graph.degree(n) == 0).collect();
        ends.shuffle(rng);
        corridors.shuffle(rng);
        rest.shuffle(rng);

        ends.into_iter()
            .chain(corridors)
            .chain(rest)
            .take(self.seeds)
            .collect()
    }
}

impl PathStrategy for BeamStrategy {
    fn solve(&self, graph: &Graph, ctx: &SearchContext) -> Result<Option<Vec<usize>>, StrategyError> {
        if graph.is_empty() {
            return Ok(None);
        }

        let started = Instant::now();
        let mut rng = ctx.rng(0);
        let goal = ((self.coverage * graph.len() as f64).ceil() as usize).clamp(1, graph.len());
        let mut best: Vec<usize> = Vec::new();
        let mut rounds = 0usize;

        'seeds: for seed in self.seed_nodes(graph, &mut rng) {
            let mut beam = vec![Candidate::seed(graph, seed)];
            if best.is_empty() {
                best = vec![seed];
            }

            while !beam.is_empty() {
                if ctx.expired() {
                    break 'seeds;
                }
                rounds += 1;

                let mut next = Vec::with_capacity(beam.len() * 2);
                for candidate in &beam {
                    let options: Vec<usize> = graph
                        .neighbors(candidate.tail())
                        .iter()
                        .copied()
                        .filter(|&n| !candidate.visited.contains(n))
                        .collect();
                    if options.is_empty() && candidate.path.len() > best.len() {
                        best = candidate.path.clone();
                    }
                    next.extend(options.into_iter().map(|n| candidate.extended(n)));
                }

                // Dead ends go last; among the rest, fewest onward options first
                let mut scored: Vec<(bool, usize, u32, Candidate)> = next
                    .into_iter()
                    .map(|c| {
                        let onward = c.onward(graph);
                        (onward == 0, onward, rng.gen::<u32>(), c)
                    })
                    .collect();
                scored.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));
                scored.truncate(self.width);
                beam = scored.into_iter().map(|(_, _, _, c)| c).collect();

                if let Some(longest) = beam.first() {
                    if longest.path.len() > best.len() {
                        best = longest.path.clone();
                    }
                }
                if best.len() >= goal {
                    break 'seeds;
                }
            }
        }

        debug!(
            nodes = graph.len(),
            best = best.len(),
            goal = goal,
            rounds = rounds,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Beam search finished"
        );

        Ok(if best.is_empty() { None } else { Some(best) })
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::BeamSearch
    }

    fn name(&self) -> &'static str {
        STRATEGY_NAME
    }
}
