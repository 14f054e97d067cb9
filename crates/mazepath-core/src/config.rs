//! Configuration module for mazepath services

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Upper bound on formulation-search workers regardless of core count
pub const MAX_SEARCH_WORKERS: usize = 12;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} must be between 0 and 1, got {1}")]
    OutOfRange(&'static str, String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Component routing thresholds
    pub routing: RoutingConfig,

    /// Per-strategy time budgets for the heuristic route
    pub budgets: StrategyBudgets,

    /// Search tuning shared by the strategies
    pub search: SearchConfig,

    /// Worker pool sizing
    pub pool: PoolConfig,

    /// External fast solver settings
    pub fast: FastSolverConfig,

    /// Job queue settings
    pub queue: QueueConfig,
}

/// Component routing thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Components with more nodes than this take the heuristic route
    pub fast_threshold: usize,

    /// Unresolved components with at least this many nodes are decomposed
    pub decomposition_threshold: usize,

    /// Force every component onto the heuristic route
    pub skip_fast_path: bool,
}

/// Per-strategy time budgets, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyBudgets {
    /// Cap for the rank-based formulation
    pub rank_ms: u64,

    /// Cap for the edge-based formulation
    pub edge_ms: u64,

    /// Cap for the beam search
    pub beam_ms: u64,

    /// The edge-based formulation is skipped once this much time has elapsed
    pub edge_gate_ms: u64,

    /// The beam search is skipped once this much time has elapsed
    pub beam_gate_ms: u64,
}

/// Search tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Parallel workers inside one formulation search
    pub workers: usize,

    /// Frontier width of the beam search
    pub beam_width: usize,

    /// Maximum number of beam search seed nodes
    pub beam_seeds: usize,

    /// Beam search stops once this fraction of nodes is covered
    pub beam_coverage: f64,

    /// Fixed seed for reproducible runs; time-derived when absent
    pub seed: Option<u64>,
}

/// Worker pool sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Concurrent CPU-bound tasks
    pub cpu_limit: usize,
}

/// External fast solver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FastSolverConfig {
    /// Whether the fast solver is loaded at all
    pub enabled: bool,

    /// Call-level timeout for one batch
    pub timeout_ms: u64,
}

/// Job queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum queued jobs
    pub max_size: usize,

    /// How often connection liveness is polled during a fast solver call
    pub liveness_interval_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 240,
            decomposition_threshold: 350,
            skip_fast_path: false,
        }
    }
}

impl Default for StrategyBudgets {
    fn default() -> Self {
        Self {
            rank_ms: 30_000,
            edge_ms: 30_000,
            beam_ms: 15_000,
            edge_gate_ms: 40_000,
            beam_gate_ms: 45_000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            workers: default_search_workers(),
            beam_width: 100,
            beam_seeds: 15,
            beam_coverage: 0.9,
            seed: None,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { cpu_limit: 4 }
    }
}

impl Default for FastSolverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 360_000,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: 256,
            liveness_interval_ms: 1_000,
        }
    }
}

impl StrategyBudgets {
    pub fn rank(&self) -> Duration {
        Duration::from_millis(self.rank_ms)
    }

    pub fn edge(&self) -> Duration {
        Duration::from_millis(self.edge_ms)
    }

    pub fn beam(&self) -> Duration {
        Duration::from_millis(self.beam_ms)
    }

    pub fn edge_gate(&self) -> Duration {
        Duration::from_millis(self.edge_gate_ms)
    }

    pub fn beam_gate(&self) -> Duration {
        Duration::from_millis(self.beam_gate_ms)
    }

    /// Budgets scaled down uniformly, keeping the gate ordering intact
    pub fn uniform(strategy_ms: u64) -> Self {
        Self {
            rank_ms: strategy_ms,
            edge_ms: strategy_ms,
            beam_ms: strategy_ms,
            edge_gate_ms: strategy_ms * 4,
            beam_gate_ms: strategy_ms * 5,
        }
    }
}

impl FastSolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl QueueConfig {
    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }
}

/// min(12, available cores)
pub fn default_search_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_SEARCH_WORKERS)
}

impl ServiceConfig {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables leave the default in place.
    pub fn from_env() -> Self {
        let mut config = ServiceConfig::default();

        // Routing
        set_from_env("MAZEPATH_FAST_THRESHOLD", &mut config.routing.fast_threshold);
        set_from_env(
            "MAZEPATH_DECOMPOSITION_THRESHOLD",
            &mut config.routing.decomposition_threshold,
        );
        set_from_env("MAZEPATH_SKIP_FAST_PATH", &mut config.routing.skip_fast_path);

        // Budgets
        set_from_env("MAZEPATH_RANK_MS", &mut config.budgets.rank_ms);
        set_from_env("MAZEPATH_EDGE_MS", &mut config.budgets.edge_ms);
        set_from_env("MAZEPATH_BEAM_MS", &mut config.budgets.beam_ms);
        set_from_env("MAZEPATH_EDGE_GATE_MS", &mut config.budgets.edge_gate_ms);
        set_from_env("MAZEPATH_BEAM_GATE_MS", &mut config.budgets.beam_gate_ms);

        // Search
        set_from_env("MAZEPATH_SEARCH_WORKERS", &mut config.search.workers);
        config.search.workers = config.search.workers.min(MAX_SEARCH_WORKERS);
        set_from_env("MAZEPATH_BEAM_WIDTH", &mut config.search.beam_width);
        set_from_env("MAZEPATH_BEAM_SEEDS", &mut config.search.beam_seeds);
        if let Ok(seed) = std::env::var("MAZEPATH_SEED") {
            if let Ok(seed) = seed.trim().parse() {
                config.search.seed = Some(seed);
            }
        }

        // Pool
        set_from_env("MAZEPATH_CPU_LIMIT", &mut config.pool.cpu_limit);

        // Fast solver
        set_from_env("MAZEPATH_FAST_ENABLED", &mut config.fast.enabled);
        set_from_env("MAZEPATH_FAST_TIMEOUT_MS", &mut config.fast.timeout_ms);

        // Queue
        set_from_env("MAZEPATH_QUEUE_MAX", &mut config.queue.max_size);
        set_from_env(
            "MAZEPATH_LIVENESS_INTERVAL_MS",
            &mut config.queue.liveness_interval_ms,
        );

        debug!(
            fast_threshold = config.routing.fast_threshold,
            decomposition_threshold = config.routing.decomposition_threshold,
            cpu_limit = config.pool.cpu_limit,
            search_workers = config.search.workers,
            "Loaded configuration from environment"
        );

        config
    }

    /// Check invariants the solvers rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.cpu_limit == 0 {
            return Err(ConfigError::Zero("pool.cpu_limit"));
        }
        if self.search.workers == 0 {
            return Err(ConfigError::Zero("search.workers"));
        }
        if self.search.beam_width == 0 {
            return Err(ConfigError::Zero("search.beam_width"));
        }
        if self.queue.max_size == 0 {
            return Err(ConfigError::Zero("queue.max_size"));
        }
        if self.queue.liveness_interval_ms == 0 {
            return Err(ConfigError::Zero("queue.liveness_interval_ms"));
        }
        if !(0.0..=1.0).contains(&self.search.beam_coverage) {
            return Err(ConfigError::OutOfRange(
                "search.beam_coverage",
                self.search.beam_coverage.to_string(),
            ));
        }
        if self.budgets.edge_gate_ms > self.budgets.beam_gate_ms {
            return Err(ConfigError::Invalid(
                "budgets.edge_gate_ms must not exceed budgets.beam_gate_ms".to_string(),
            ));
        }
        Ok(())
    }
}

fn set_from_env<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(value) = std::env::var(key) {
        if let Ok(parsed) = value.trim().parse() {
            *target = parsed;
        }
    }
}
