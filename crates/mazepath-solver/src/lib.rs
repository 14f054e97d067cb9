//! Mazepath Solver - Longest Simple Path Search
//!
//! Finds long simple paths through undirected maze components.
//!
//! # Architecture
//!
//! ```text
//! Component
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │  DecompositionSolver    │  ≥ 350 nodes: split at a balanced cut
//! │                         │  vertex, fixed-start rank search per side
//! └───────────┬─────────────┘
//!             │ < 350 nodes, or no balanced cut
//!             ▼
//! ┌─────────────────────────┐
//! │  MultiStrategySolver    │  rank → edge → beam, keep longest valid
//! └─────────────────────────┘
//!
//! FastBatch ──► FastSolver (BacktrackingSolver by default, then endpoint
//!               refinement and local moves)
//! ```
//!
//! Every path leaves this crate only after `is_valid_path` accepts it.
//!
//! # Example
//!
//! ```rust,ignore
//! use mazepath_core::ServiceConfig;
//! use mazepath_solver::MultiStrategySolver;
//!
//! let solver = MultiStrategySolver::new(&ServiceConfig::default()).with_seed(7);
//! let outcome = solver.solve(&component);
//! ```

// Core modules
mod error;
mod graph;
mod validator;

// Strategy module (contains the three search strategies)
pub mod strategy;

// Solvers
mod decomposition;
mod fast;
mod portfolio;
mod refine;

// Re-exports: Error types
pub use error::{FastSolverError, StrategyError};

// Re-exports: Graph and validation
pub use graph::{Graph, NodeSet, Reach};
pub use validator::{is_likely_suboptimal, is_valid_path};

// Re-exports: Strategies
pub use strategy::{
    BeamStrategy, EdgeSelection, EdgeStrategy, PathStrategy, RankAssignment, RankStrategy,
    SearchContext,
};

// Re-exports: Solvers
pub use decomposition::{BalancedCut, DecompositionSolver};
pub use fast::{BacktrackingSolver, FastBatch, FastSolver};
pub use portfolio::{ComponentSolver, MultiStrategySolver};
