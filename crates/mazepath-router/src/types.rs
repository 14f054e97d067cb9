//! Common types for the router module

use serde::{Deserialize, Serialize};

/// Which route a component takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    /// Batched external fast solver
    Fast,
    /// Per-component multi-strategy solver
    Heuristic,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Fast => write!(f, "fast"),
            Route::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// Input slot indices grouped by route
///
/// Order inside each group follows the input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePlan {
    pub fast: Vec<usize>,
    pub heuristic: Vec<usize>,
    /// Slots whose component was dropped during intake
    pub dropped: Vec<usize>,
}

impl RoutePlan {
    pub fn slot_count(&self) -> usize {
        self.fast.len() + self.heuristic.len() + self.dropped.len()
    }

    pub fn route_of(&self, slot: usize) -> Option<Route> {
        if self.fast.contains(&slot) {
            Some(Route::Fast)
        } else if self.heuristic.contains(&slot) {
            Some(Route::Heuristic)
        } else {
            None
        }
    }
}
