//! Shared types for mazepath
//!
//! Graph components, paths, and the request/response payloads that cross
//! the boundary between the solving core and its callers.

// ========== Core Modules ==========
pub mod component;
pub mod message;
pub mod path;

// Export commonly used types
pub use component::{Component, NodeId, NormalizeError};
pub use message::{generate_session_id, Dimensions, ServerMessage, SessionId, SolveRequest, SolveResponse};
pub use path::{ComponentOutcome, Path, StrategyKind};
