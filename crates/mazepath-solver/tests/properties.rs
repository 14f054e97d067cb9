//! Randomized checks of the path invariants shared by every solver
//!
//! Whatever the graph and seed, a returned path is a simple path over the
//! component's own nodes and never longer than the component.

use mazepath_core::{ServiceConfig, StrategyBudgets};
use mazepath_solver::{
    is_valid_path, BacktrackingSolver, DecompositionSolver, FastBatch, FastSolver, Graph,
    MultiStrategySolver,
};
use mazepath_types::{Component, Path, StrategyKind};
use proptest::prelude::*;
use std::time::Duration;

fn config(budget_ms: u64) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.budgets = StrategyBudgets::uniform(budget_ms);
    config.search.workers = 2;
    config
}

fn holds_for(component: &Component, path: &Path) -> bool {
    is_valid_path(component, path)
        && path.len() <= component.node_count()
        && path.iter().all(|n| component.contains(n))
}

/// Up to 30 nodes with random edges; isolated nodes and several pieces allowed
fn random_component() -> impl Strategy<Value = Component> {
    (1usize..30).prop_flat_map(|n| {
        prop::collection::vec((0..n, 0..n), 0..n * 2).prop_map(move |pairs| {
            let mut component = Component::new();
            for node in 0..n {
                component.add_node(node.to_string());
            }
            for (a, b) in pairs {
                component.add_edge(a.to_string(), b.to_string());
            }
            component
        })
    })
}

/// Two chorded rings joined through the degree-2 bridge node `x`
fn bridged_rings() -> impl Strategy<Value = Component> {
    (3usize..25, 3usize..25).prop_flat_map(|(left, right)| {
        (
            Just(left),
            Just(right),
            prop::collection::vec((0..left, 0..left), 0..4),
            prop::collection::vec((0..right, 0..right), 0..4),
        )
            .prop_map(|(left, right, left_chords, right_chords)| {
                let mut component = Component::new();
                for (prefix, size, chords) in [("a", left, left_chords), ("b", right, right_chords)] {
                    for i in 0..size {
                        component.add_edge(format!("{}{}", prefix, i), format!("{}{}", prefix, (i + 1) % size));
                    }
                    for (i, j) in chords {
                        component.add_edge(format!("{}{}", prefix, i), format!("{}{}", prefix, j));
                    }
                }
                component.add_edge("a0".to_string(), "x".to_string());
                component.add_edge("x".to_string(), "b0".to_string());
                component
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_portfolio_paths_are_simple(component in random_component(), seed in any::<u64>()) {
        let outcome = MultiStrategySolver::new(&config(40)).with_seed(seed).solve(&component);

        prop_assert!(holds_for(&component, &outcome.path));
    }

    #[test]
    fn test_backtracking_paths_are_simple(
        components in prop::collection::vec(random_component(), 1..4),
        seed in any::<u64>(),
    ) {
        let solver = BacktrackingSolver::new()
            .with_seed(seed)
            .with_time_limit(Duration::from_millis(50));
        let paths = solver.solve_batch(&FastBatch::new(components.clone())).unwrap();

        prop_assert_eq!(paths.len(), components.len());
        for (component, path) in components.iter().zip(&paths) {
            prop_assert!(holds_for(component, path));
        }
    }

    #[test]
    fn test_decomposition_paths_are_simple(component in bridged_rings(), seed in any::<u64>()) {
        let outcome = DecompositionSolver::new(&config(100)).with_seed(seed).solve(&component);
        let balanced = !DecompositionSolver::balanced_cuts(&Graph::from_component(&component)).is_empty();

        prop_assert!(holds_for(&component, &outcome.path));
        if balanced {
            prop_assert_eq!(outcome.strategy, Some(StrategyKind::Decomposition));
            prop_assert!(outcome.path.iter().any(|n| n == "x"));
        } else {
            prop_assert!(!outcome.is_resolved());
        }
    }
}
