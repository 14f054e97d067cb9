//! Paths and per-component solve outcomes

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::component::NodeId;

/// Ordered node sequence through a component
pub type Path = Vec<NodeId>;

/// Which solver produced a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Batched external fast solver
    Fast,
    /// Rank-based formulation search
    RankBased,
    /// Edge-based formulation search
    EdgeBased,
    /// Multi-start beam search
    BeamSearch,
    /// Cut-vertex decomposition
    Decomposition,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Fast => write!(f, "fast"),
            StrategyKind::RankBased => write!(f, "rank"),
            StrategyKind::EdgeBased => write!(f, "edge"),
            StrategyKind::BeamSearch => write!(f, "beam"),
            StrategyKind::Decomposition => write!(f, "decomposition"),
        }
    }
}

/// Result for one component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentOutcome {
    /// Best path found, empty when unresolved
    pub path: Path,

    /// Strategy that produced `path`
    pub strategy: Option<StrategyKind>,

    /// Wall-clock time spent on this component
    pub elapsed: Duration,
}

impl ComponentOutcome {
    pub fn new(path: Path, strategy: StrategyKind, elapsed: Duration) -> Self {
        Self {
            path,
            strategy: Some(strategy),
            elapsed,
        }
    }

    /// Outcome for a component no solver resolved
    pub fn unresolved(elapsed: Duration) -> Self {
        Self {
            path: Vec::new(),
            strategy: None,
            elapsed,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}
