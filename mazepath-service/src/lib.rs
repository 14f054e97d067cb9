//! Mazepath Service - Job queue and cancellation fabric
//!
//! Wraps the dispatcher with per-connection job bookkeeping:
//!
//! - streaming requests are checked, queued FIFO and drained one at a time
//! - each running job registers a cancellation token under its connection
//! - a closed connection cancels its running job and purges its queued ones
//! - direct calls bypass the queue and return their result in place
//!
//! The transport and the result cache are collaborators, reached through
//! the [`Connection`] and [`ResultCache`] traits.

// Core modules
mod error;

// Collaborators
mod cache;
mod connection;

// Job bookkeeping
mod intake;
mod job_queue;
mod registry;
mod service;

// Re-exports: Error types
pub use error::{ConnectionError, InputError, QueueError, ServiceError};

// Re-exports: Collaborators
pub use cache::{CacheEntry, MemoryCache, NoopCache, ResultCache};
pub use connection::{ChannelConnection, Connection, ConnectionId, ConnectionLiveness};

// Re-exports: Job bookkeeping
pub use intake::check_request;
pub use job_queue::{Job, JobId, JobQueue};
pub use registry::{CancellationRegistry, Registration};
pub use service::SolveService;
