//! Multi-strategy component solver
//!
//! Runs the rank, edge and beam strategies in order under their own caps,
//! skipping the later ones once the elapsed-time gates pass, and keeps the
//! longest path that validates.

use mazepath_core::{ServiceConfig, StrategyBudgets};
use mazepath_types::{Component, ComponentOutcome, StrategyKind};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::graph::Graph;
use crate::strategy::{
    derive_seed, run_guarded, time_seed, BeamStrategy, EdgeStrategy, PathStrategy, RankStrategy,
    SearchContext,
};
use crate::validator::{is_likely_suboptimal, is_valid_path};

/// Whole-component solver behind the heuristic route
pub trait ComponentSolver: Send + Sync {
    /// Solve one component; unresolved components come back with an empty path
    fn solve(&self, component: &Component) -> ComponentOutcome;
}

/// One portfolio slot
struct Slot {
    strategy: Box<dyn PathStrategy>,
    cap: Duration,
    /// Skip the slot once this much time has elapsed
    gate: Option<Duration>,
}

/// Longest path solver for one component
pub struct MultiStrategySolver {
    slots: Vec<Slot>,
    seed: Option<u64>,
}

impl MultiStrategySolver {
    /// Create the standard rank, edge, beam portfolio
    pub fn new(config: &ServiceConfig) -> Self {
        let budgets: &StrategyBudgets = &config.budgets;
        let search = &config.search;
        let slots = vec![
            Slot {
                strategy: Box::new(RankStrategy::new(search.workers)),
                cap: budgets.rank(),
                gate: None,
            },
            Slot {
                strategy: Box::new(EdgeStrategy::new()),
                cap: budgets.edge(),
                gate: Some(budgets.edge_gate()),
            },
            Slot {
                strategy: Box::new(BeamStrategy::new(
                    search.beam_width,
                    search.beam_seeds,
                    search.beam_coverage,
                )),
                cap: budgets.beam(),
                gate: Some(budgets.beam_gate()),
            },
        ];
        Self {
            slots,
            seed: search.seed,
        }
    }

    /// Pin the base seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the portfolio with a custom strategy list
    pub fn with_strategies(mut self, strategies: Vec<(Box<dyn PathStrategy>, Duration)>) -> Self {
        self.slots = strategies
            .into_iter()
            .map(|(strategy, cap)| Slot {
                strategy,
                cap,
                gate: None,
            })
            .collect();
        self
    }

    /// Solve one component
    ///
    /// Never fails: a component no strategy resolves comes back with an
    /// empty path.
    pub fn solve(&self, component: &Component) -> ComponentOutcome {
        let started = Instant::now();
        let graph = Graph::from_component(component);
        if graph.is_empty() {
            return ComponentOutcome::unresolved(started.elapsed());
        }

        let seed = self.seed.unwrap_or_else(time_seed);
        let mut best: Option<(Vec<usize>, StrategyKind)> = None;

        for (index, slot) in self.slots.iter().enumerate() {
            let name = slot.strategy.name();
            if let Some(gate) = slot.gate {
                if started.elapsed() >= gate {
                    debug!(strategy = name, elapsed_ms = started.elapsed().as_millis() as u64, "Skipping strategy past its gate");
                    continue;
                }
            }
            if best.as_ref().map(|(path, _)| path.len()) == Some(graph.len()) {
                break;
            }

            let ctx = SearchContext::new(Instant::now() + slot.cap, derive_seed(seed, index as u64));
            match run_guarded(name, || slot.strategy.solve(&graph, &ctx)) {
                Ok(Some(path)) => {
                    if !is_valid_path(component, &graph.to_labels(&path)) {
                        warn!(strategy = name, len = path.len(), "Discarding invalid path");
                        continue;
                    }
                    debug!(strategy = name, len = path.len(), "Strategy produced a path");
                    let longer = best.as_ref().map_or(true, |(b, _)| path.len() > b.len());
                    if longer {
                        best = Some((path, slot.strategy.kind()));
                    }
                }
                Ok(None) => debug!(strategy = name, "Strategy produced no path"),
                Err(e) => warn!(strategy = name, error = %e, "Strategy failed"),
            }
        }

        let elapsed = started.elapsed();
        match best {
            Some((path, kind)) => {
                let labels = graph.to_labels(&path);
                if is_likely_suboptimal(component, &labels) {
                    debug!(strategy = %kind, len = labels.len(), "Path is likely extendable");
                }
                info!(
                    nodes = graph.len(),
                    len = labels.len(),
                    strategy = %kind,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Component solved"
                );
                ComponentOutcome::new(labels, kind, elapsed)
            }
            None => {
                warn!(nodes = graph.len(), "No strategy resolved the component");
                ComponentOutcome::unresolved(elapsed)
            }
        }
    }
}

impl ComponentSolver for MultiStrategySolver {
    fn solve(&self, component: &Component) -> ComponentOutcome {
        MultiStrategySolver::solve(self, component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StrategyError;
    use crate::graph::tests::{chain, ring};

    fn config() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.budgets = StrategyBudgets::uniform(500);
        config.search.workers = 2;
        config.search.seed = Some(3);
        config
    }

    struct Panicking;

    impl PathStrategy for Panicking {
        fn solve(&self, _: &Graph, _: &SearchContext) -> Result<Option<Vec<usize>>, StrategyError> {
            panic!("search exploded")
        }

        fn kind(&self) -> StrategyKind {
            StrategyKind::EdgeBased
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    /// Returns a fixed, possibly bogus path
    struct Fixed(Vec<usize>, StrategyKind);

    impl PathStrategy for Fixed {
        fn solve(&self, _: &Graph, _: &SearchContext) -> Result<Option<Vec<usize>>, StrategyError> {
            Ok(Some(self.0.clone()))
        }

        fn kind(&self) -> StrategyKind {
            self.1
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_solves_chain_fully() {
        let component = chain(20);
        let outcome = MultiStrategySolver::new(&config()).solve(&component);

        assert_eq!(outcome.len(), 20);
        assert_eq!(outcome.strategy, Some(StrategyKind::RankBased));
        assert!(is_valid_path(&component, &outcome.path));
    }

    #[test]
    fn test_empty_component_is_unresolved() {
        let outcome = MultiStrategySolver::new(&config()).solve(&Component::new());

        assert!(!outcome.is_resolved());
        assert_eq!(outcome.strategy, None);
    }

    #[test]
    fn test_panicking_strategy_degrades() {
        let component = chain(4);
        let solver = MultiStrategySolver::new(&config()).with_strategies(vec![
            (Box::new(Panicking) as Box<dyn PathStrategy>, Duration::from_millis(100)),
            (Box::new(Fixed(vec![0, 1], StrategyKind::BeamSearch)) as Box<dyn PathStrategy>, Duration::from_millis(100)),
        ]);
        let outcome = solver.solve(&component);

        assert_eq!(outcome.path, vec!["0".to_string(), "1".to_string()]);
        assert_eq!(outcome.strategy, Some(StrategyKind::BeamSearch));
    }

    #[test]
    fn test_invalid_path_is_discarded() {
        let component = chain(4);
        let solver = MultiStrategySolver::new(&config()).with_strategies(vec![
            (Box::new(Fixed(vec![0, 2, 3], StrategyKind::RankBased)) as Box<dyn PathStrategy>, Duration::from_millis(100)),
            (Box::new(Fixed(vec![1, 2], StrategyKind::EdgeBased)) as Box<dyn PathStrategy>, Duration::from_millis(100)),
        ]);
        let outcome = solver.solve(&component);

        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome.strategy, Some(StrategyKind::EdgeBased));
    }

    #[test]
    fn test_tie_keeps_earlier_strategy() {
        let component = chain(4);
        let solver = MultiStrategySolver::new(&config()).with_strategies(vec![
            (Box::new(Fixed(vec![0, 1], StrategyKind::RankBased)) as Box<dyn PathStrategy>, Duration::from_millis(100)),
            (Box::new(Fixed(vec![2, 3], StrategyKind::BeamSearch)) as Box<dyn PathStrategy>, Duration::from_millis(100)),
        ]);

        assert_eq!(solver.solve(&component).strategy, Some(StrategyKind::RankBased));
    }

    #[test]
    fn test_nothing_valid_gives_empty_path() {
        let component = Component::from_edges(ring("r", 5));
        let solver = MultiStrategySolver::new(&config()).with_strategies(vec![(
            Box::new(Panicking) as Box<dyn PathStrategy>,
            Duration::from_millis(100),
        )]);
        let outcome = solver.solve(&component);

        assert!(outcome.is_empty());
        assert!(!outcome.is_resolved());
    }
}
