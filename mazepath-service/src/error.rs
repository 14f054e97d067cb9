//! Error types for the service layer

use mazepath_router::DispatchError;
use thiserror::Error;

/// Job queue errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is full (max size: {0})")]
    QueueFull(usize),

    #[error("Duplicate job: {0}")]
    DuplicateJob(String),
}

/// Request rejected before queuing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Request has no components")]
    MissingComponents,

    #[error("Component list is empty")]
    EmptyComponents,

    #[error("None of the {0} components could be normalized")]
    NoUsableComponents(usize),
}

/// A streaming connection refused a message
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Connection {0} is closed")]
    Closed(String),
}

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Internal error: {0}")]
    Internal(String),
}
