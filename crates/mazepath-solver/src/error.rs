//! Error types for the solver module

use thiserror::Error;

/// Strategy-level failures
///
/// None of these fail a job: the portfolio moves on to the next strategy and
/// an exhausted portfolio yields an empty path.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The strategy panicked while searching
    #[error("Strategy {0} panicked: {1}")]
    Panicked(&'static str, String),

    /// The formulation search could not start
    #[error("Strategy {0} could not run: {1}")]
    Setup(&'static str, String),
}

/// Fast solver failures, each of which fails the whole fast route
#[derive(Debug, Error)]
pub enum FastSolverError {
    /// The batch could not be serialized or the reply could not be parsed
    #[error("Fast solver payload error: {0}")]
    Payload(String),

    /// The solver ran but did not produce a usable batch result
    #[error("Fast solver failed: {0}")]
    Failed(String),
}
