//! Longest Path Strategies
//!
//! This module contains the strategies the multi-strategy solver runs:
//!
//! - `RankStrategy`: rank-based formulation, parallel branch and bound
//! - `EdgeStrategy`: edge-based formulation, rotation/extension search
//! - `BeamStrategy`: multi-start beam search
//!
//! # Strategy Portfolio
//!
//! ```text
//! Component
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │   RankStrategy          │  always (30s cap)
//! └───────────┬─────────────┘
//!             │ elapsed < 40s
//!             ▼
//! ┌─────────────────────────┐
//! │   EdgeStrategy          │  (30s cap)
//! └───────────┬─────────────┘
//!             │ elapsed < 45s
//!             ▼
//! ┌─────────────────────────┐
//! │   BeamStrategy          │  (15s cap)
//! └─────────────────────────┘
//! ```
//!
//! Every strategy receives an explicit seed, so a fixed seed reproduces a run.

mod beam;
mod edge;
mod rank;

pub use beam::BeamStrategy;
pub use edge::{EdgeSelection, EdgeStrategy};
pub use rank::{RankAssignment, RankStrategy};

use mazepath_types::StrategyKind;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use crate::error::StrategyError;
use crate::graph::Graph;

/// Per-call search parameters
#[derive(Debug, Clone, Copy)]
pub struct SearchContext {
    /// Hard stop for the search
    pub deadline: Instant,

    /// Base seed; workers derive their own streams from it
    pub seed: u64,
}

impl SearchContext {
    pub fn new(deadline: Instant, seed: u64) -> Self {
        Self { deadline, seed }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Independent RNG for worker `stream`
    pub fn rng(&self, stream: u64) -> StdRng {
        StdRng::seed_from_u64(derive_seed(self.seed, stream))
    }
}

/// Trait for longest simple path strategies
pub trait PathStrategy: Send + Sync {
    /// Search `graph` until the context deadline
    ///
    /// Returns node indices of the best path found, or `None` when the
    /// strategy produced nothing usable.
    fn solve(&self, graph: &Graph, ctx: &SearchContext) -> Result<Option<Vec<usize>>, StrategyError>;

    /// Which strategy this is
    fn kind(&self) -> StrategyKind;

    /// Strategy name for logging
    fn name(&self) -> &'static str;
}

/// Run a strategy call, turning a panic into `StrategyError::Panicked`
pub fn run_guarded<T, F>(name: &'static str, call: F) -> Result<T, StrategyError>
where
    F: FnOnce() -> Result<T, StrategyError>,
{
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(StrategyError::Panicked(name, message))
        }
    }
}

/// Time-derived seed used when the caller does not pin one
pub fn time_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9E37_79B9_7F4A_7C15)
}

/// Mix a base seed with a stream number (splitmix64 finalizer)
pub fn derive_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed.wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Pick a start node, favouring likely endpoints (degree 1, then 2)
pub(crate) fn pick_start(graph: &Graph, rng: &mut StdRng) -> usize {
    let low: Vec<usize> = (0..graph.len()).filter(|&n| graph.degree(n) <= 1).collect();
    if !low.is_empty() && rng.gen_bool(0.6) {
        return low[rng.gen_range(0..low.len())];
    }
    let mid: Vec<usize> = (0..graph.len()).filter(|&n| graph.degree(n) == 2).collect();
    if !mid.is_empty() && rng.gen_bool(0.5) {
        return mid[rng.gen_range(0..mid.len())];
    }
    rng.gen_range(0..graph.len())
}

/// Unvisited neighbors of `node`, fewest onward options first
///
/// Ties are broken randomly so restarts explore different branches.
pub(crate) fn ordered_options(
    graph: &Graph,
    node: usize,
    visited: &crate::graph::NodeSet,
    rng: &mut StdRng,
) -> Vec<usize> {
    let mut options: Vec<usize> = graph
        .neighbors(node)
        .iter()
        .copied()
        .filter(|&n| !visited.contains(n))
        .collect();
    options.shuffle(rng);
    options.sort_by_key(|&n| {
        graph
            .neighbors(n)
            .iter()
            .filter(|&&m| !visited.contains(m))
            .count()
    });
    options
}

/// Best path shared between parallel workers
#[derive(Debug, Default)]
pub(crate) struct Incumbent {
    len: AtomicUsize,
    path: Mutex<Vec<usize>>,
    done: AtomicBool,
}

impl Incumbent {
    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Record `path` if it beats the incumbent
    pub(crate) fn offer(&self, path: &[usize]) -> bool {
        if path.len() <= self.len() {
            return false;
        }
        let mut best = self.path.lock();
        if path.len() <= best.len() {
            return false;
        }
        best.clear();
        best.extend_from_slice(path);
        self.len.store(path.len(), Ordering::Release);
        true
    }

    pub(crate) fn finish(&self) {
        self.done.store(true, Ordering::Release);
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub(crate) fn take(&self) -> Vec<usize> {
        std::mem::take(&mut *self.path.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_seed_separates_streams() {
        assert_ne!(derive_seed(7, 0), derive_seed(7, 1));
        assert_eq!(derive_seed(7, 3), derive_seed(7, 3));
    }

    #[test]
    fn test_run_guarded_catches_panic() {
        let result: Result<(), StrategyError> = run_guarded("broken", || panic!("boom"));

        match result {
            Err(StrategyError::Panicked(name, message)) => {
                assert_eq!(name, "broken");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_incumbent_keeps_longest() {
        let incumbent = Incumbent::default();

        assert!(incumbent.offer(&[1, 2]));
        assert!(!incumbent.offer(&[3]));
        assert!(incumbent.offer(&[1, 2, 3]));
        assert_eq!(incumbent.len(), 3);
        assert_eq!(incumbent.take(), vec![1, 2, 3]);
    }
}
