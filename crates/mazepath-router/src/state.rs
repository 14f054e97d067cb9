//! Dispatch state machine
//!
//! ```text
//! NotStarted ──► FastAttempted ──► HeuristicAttempted
//!                                        │
//!          ┌──────── fast failed ────────┤
//!          ▼                             │ heuristic failed
//! CrossFallbackFastToHeuristic           ▼
//!          │               CrossFallbackHeuristicToFast
//!          │                             │
//!          └──────────┬──────────────────┘
//!                     ▼
//!      decomposable? ──Yes──► Decomposed ──► Done
//!                     │
//!                     No ───────────────────► Done
//! ```
//!
//! The two primary routes run concurrently; `FastAttempted` and
//! `HeuristicAttempted` mark the points where each route's result has been
//! folded into the job.

use serde::{Deserialize, Serialize};

/// Where a job is in its dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchState {
    NotStarted,
    FastAttempted,
    HeuristicAttempted,
    CrossFallbackFastToHeuristic,
    CrossFallbackHeuristicToFast,
    Decomposed,
    Done,
}

/// What the routes reported so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteReport {
    /// The fast route failed outright
    pub fast_failed: bool,

    /// At least one heuristic task failed
    pub heuristic_failed: bool,

    /// Some component at or above the decomposition threshold is waiting
    /// for decomposition or is still unresolved
    pub decomposable: bool,
}

impl DispatchState {
    /// Pure transition function
    pub fn next(self, report: &RouteReport) -> DispatchState {
        match self {
            DispatchState::NotStarted => DispatchState::FastAttempted,
            DispatchState::FastAttempted => DispatchState::HeuristicAttempted,
            DispatchState::HeuristicAttempted if report.fast_failed => {
                DispatchState::CrossFallbackFastToHeuristic
            }
            DispatchState::HeuristicAttempted if report.heuristic_failed => {
                DispatchState::CrossFallbackHeuristicToFast
            }
            // A fast-to-heuristic fallback never leads back to the fast route
            DispatchState::HeuristicAttempted
            | DispatchState::CrossFallbackFastToHeuristic
            | DispatchState::CrossFallbackHeuristicToFast => {
                if report.decomposable {
                    DispatchState::Decomposed
                } else {
                    DispatchState::Done
                }
            }
            DispatchState::Decomposed | DispatchState::Done => DispatchState::Done,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == DispatchState::Done
    }
}

impl std::fmt::Display for DispatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DispatchState::NotStarted => "not_started",
            DispatchState::FastAttempted => "fast_attempted",
            DispatchState::HeuristicAttempted => "heuristic_attempted",
            DispatchState::CrossFallbackFastToHeuristic => "cross_fallback_fast_to_heuristic",
            DispatchState::CrossFallbackHeuristicToFast => "cross_fallback_heuristic_to_fast",
            DispatchState::Decomposed => "decomposed",
            DispatchState::Done => "done",
        };
        write!(f, "{}", name)
    }
}
