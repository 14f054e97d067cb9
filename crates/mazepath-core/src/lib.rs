//! Mazepath Core - Shared configuration for the solver, router and service
//!
//! This crate provides the configuration used by every layer of the
//! workspace, so thresholds and budgets are tuned in one place.

pub mod config;

pub use config::{
    default_search_workers, ConfigError, FastSolverConfig, PoolConfig, QueueConfig,
    RoutingConfig, SearchConfig, ServiceConfig, StrategyBudgets, MAX_SEARCH_WORKERS,
};
