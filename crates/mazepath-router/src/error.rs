//! Error types for the router module

use mazepath_solver::FastSolverError;
use thiserror::Error;

/// Worker pool errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was closed and accepts no more work
    #[error("Worker pool closed")]
    Closed,

    /// The task panicked on its worker thread
    #[error("Worker task panicked: {0}")]
    Panicked(String),

    /// The runtime dropped the task before it finished
    #[error("Worker task cancelled")]
    Cancelled,
}

/// Why a whole route failed
#[derive(Debug, Error)]
pub enum RouteError {
    /// No fast solver is configured
    #[error("Fast solver unavailable")]
    Unavailable,

    /// The fast solver did not answer within the call timeout
    #[error("Fast solver timed out after {0} ms")]
    Timeout(u64),

    /// The fast solver reported an error
    #[error(transparent)]
    Solver(#[from] FastSolverError),

    /// The pool could not run the call
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The fast solver answered with the wrong number of paths
    #[error("Fast solver returned {got} paths for {expected} components")]
    CountMismatch { expected: usize, got: usize },

    /// The job was cancelled while the route was running
    #[error("Route cancelled")]
    Cancelled,
}

/// Dispatch errors; everything else degrades to empty paths
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The job's cancellation token fired
    #[error("Dispatch cancelled")]
    Cancelled,
}
