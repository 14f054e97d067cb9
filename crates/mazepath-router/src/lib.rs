//! Mazepath Router - Component Routing and Dispatch
//!
//! Routes each component of a job to the fast or heuristic route and
//! recovers from route failures.
//!
//! # Architecture
//!
//! ```text
//! Job components
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │  ComponentClassifier    │  Decides: fast vs heuristic
//! │   (Which route?)        │
//! └───────────┬─────────────┘
//!             │
//!             ▼
//! ┌─────────────────────────┐
//! │      Dispatcher         │  Runs both routes on the WorkerPool,
//! │  (DispatchState walk)   │  cross-fallback, decomposition
//! └─────────────────────────┘
//! ```
//!
//! # Cancellation
//!
//! Every await point observes the job's [`CancelToken`]. While the fast
//! solver runs, a liveness poll cancels the token if the connection drops.
//! Work already running on the pool is not interrupted; its result is
//! dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use mazepath_router::{CancelToken, Dispatcher};
//!
//! let dispatcher = Dispatcher::new(&config);
//! let outcome = dispatcher
//!     .dispatch(components, false, &CancelToken::new(), None)
//!     .await?;
//! ```

// Core modules
mod error;
mod types;

// Routing
mod classifier;
mod state;

// Execution
mod cancel;
mod dispatcher;
mod pool;

// Re-exports: Error types
pub use error::{DispatchError, PoolError, RouteError};

// Re-exports: Core types
pub use types::{Route, RoutePlan};

// Re-exports: Routing
pub use classifier::ComponentClassifier;
pub use state::{DispatchState, RouteReport};

// Re-exports: Execution
pub use cancel::{watch_liveness, CancelToken, Liveness};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use pool::WorkerPool;

// Re-exports: Fast solver collaborator
pub use mazepath_solver::{BacktrackingSolver, FastBatch, FastSolver, FastSolverError};
