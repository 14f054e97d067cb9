//! Component Classifier
//!
//! Decides which route each component of a job takes.
//!
//! # Routing Decision Tree
//!
//! ```text
//! Component arrives
//!        │
//!        ▼
//! skip_fast_path? ──Yes──► Heuristic
//!        │
//!        No
//!        │
//!        ▼
//! nodes > threshold? ──Yes──► Heuristic
//!        │
//!        No
//!        ▼
//!      Fast
//! ```
//!
//! The skip flag is the union of the configured flag and the request flag.

use mazepath_core::RoutingConfig;
use mazepath_types::Component;
use tracing::debug;

use crate::types::{Route, RoutePlan};

/// Size-threshold classifier
#[derive(Debug, Clone)]
pub struct ComponentClassifier {
    fast_threshold: usize,
    skip_fast_path: bool,
}

impl Default for ComponentClassifier {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}

impl ComponentClassifier {
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            fast_threshold: config.fast_threshold,
            skip_fast_path: config.skip_fast_path,
        }
    }

    /// Create with a custom threshold
    pub fn with_threshold(fast_threshold: usize) -> Self {
        Self {
            fast_threshold,
            skip_fast_path: false,
        }
    }

    /// Route one component
    pub fn classify(&self, component: &Component, skip_fast_path: bool) -> Route {
        if self.skip_fast_path || skip_fast_path || component.node_count() > self.fast_threshold {
            Route::Heuristic
        } else {
            Route::Fast
        }
    }

    /// Route a job's slots; `None` slots were dropped during intake
    pub fn classify_batch(&self, components: &[Option<Component>], skip_fast_path: bool) -> RoutePlan {
        let mut plan = RoutePlan::default();
        for (slot, component) in components.iter().enumerate() {
            match component {
                Some(component) => match self.classify(component, skip_fast_path) {
                    Route::Fast => plan.fast.push(slot),
                    Route::Heuristic => plan.heuristic.push(slot),
                },
                None => plan.dropped.push(slot),
            }
        }
        debug!(
            fast = plan.fast.len(),
            heuristic = plan.heuristic.len(),
            dropped = plan.dropped.len(),
            "Classified components"
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(size: usize) -> Component {
        Component::from_edges((1..size).map(|i| ((i - 1).to_string(), i.to_string())))
    }

    #[test]
    fn test_threshold_boundary() {
        let classifier = ComponentClassifier::default();

        assert_eq!(classifier.classify(&chain(240), false), Route::Fast);
        assert_eq!(classifier.classify(&chain(241), false), Route::Heuristic);
    }

    #[test]
    fn test_request_skip_flag_forces_heuristic() {
        let classifier = ComponentClassifier::default();

        assert_eq!(classifier.classify(&chain(3), true), Route::Heuristic);
    }

    #[test]
    fn test_configured_skip_flag_forces_heuristic() {
        let config = RoutingConfig {
            skip_fast_path: true,
            ..RoutingConfig::default()
        };
        let classifier = ComponentClassifier::new(&config);

        assert_eq!(classifier.classify(&chain(3), false), Route::Heuristic);
    }

    #[test]
    fn test_batch_keeps_slot_order() {
        let classifier = ComponentClassifier::with_threshold(5);
        let plan = classifier.classify_batch(
            &[Some(chain(10)), Some(chain(2)), None, Some(chain(3)), Some(chain(6))],
            false,
        );

        assert_eq!(plan.fast, vec![1, 3]);
        assert_eq!(plan.heuristic, vec![0, 4]);
        assert_eq!(plan.dropped, vec![2]);
        assert_eq!(plan.slot_count(), 5);
        assert_eq!(plan.route_of(2), None);
        assert_eq!(plan.route_of(4), Some(Route::Heuristic));
    }
}
