//! Two-route dispatcher with cross-fallback
//!
//! Splits a job into fast and heuristic sets, runs both routes concurrently
//! on the shared worker pool, and walks the [`DispatchState`] machine to
//! recover from route failures:
//!
//! - fast route fails, or returns an empty or invalid path: those
//!   components are re-solved on the heuristic route
//! - heuristic tasks fail: failed components under the decomposition
//!   threshold are sent to the fast solver
//!
//! Heuristic-route components at or above the decomposition threshold skip
//! the portfolio and go to the decomposition solver; the portfolio only sees
//! them when no balanced cut resolves them.
//!
//! Output keeps one outcome per input slot, in input order.

use futures::future::join_all;
use mazepath_core::ServiceConfig;
use mazepath_solver::{
    is_valid_path, BacktrackingSolver, ComponentSolver, DecompositionSolver, FastBatch,
    FastSolver, MultiStrategySolver,
};
use mazepath_types::{Component, ComponentOutcome, Path, StrategyKind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cancel::{watch_liveness, CancelToken, Liveness};
use crate::classifier::ComponentClassifier;
use crate::error::{DispatchError, PoolError, RouteError};
use crate::pool::WorkerPool;
use crate::state::{DispatchState, RouteReport};

type SolveFn = Arc<dyn Fn(&Component) -> ComponentOutcome + Send + Sync>;

type TaskResults = Vec<(usize, Result<ComponentOutcome, PoolError>)>;

/// Result of one dispatch
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// One outcome per input slot
    pub outcomes: Vec<ComponentOutcome>,

    /// States visited, starting with `NotStarted`
    pub states: Vec<DispatchState>,
}

impl DispatchOutcome {
    pub fn into_paths(self) -> Vec<Path> {
        self.outcomes.into_iter().map(|o| o.path).collect()
    }

    pub fn visited(&self, state: DispatchState) -> bool {
        self.states.contains(&state)
    }
}

/// Job dispatcher shared by every job in the process
pub struct Dispatcher {
    classifier: ComponentClassifier,
    pool: WorkerPool,
    fast: Option<Arc<dyn FastSolver>>,
    heuristic: Arc<dyn ComponentSolver>,
    decomposer: Arc<DecompositionSolver>,
    decomposition_threshold: usize,
    fast_timeout: Duration,
    liveness_interval: Duration,
}

impl Dispatcher {
    /// Create a dispatcher; the built-in fast solver is loaded when enabled
    pub fn new(config: &ServiceConfig) -> Self {
        let fast: Option<Arc<dyn FastSolver>> = if config.fast.enabled {
            let solver = BacktrackingSolver::new();
            Some(Arc::new(match config.search.seed {
                Some(seed) => solver.with_seed(seed),
                None => solver,
            }))
        } else {
            None
        };
        Self {
            classifier: ComponentClassifier::new(&config.routing),
            pool: WorkerPool::new(config.pool.cpu_limit),
            fast,
            heuristic: Arc::new(MultiStrategySolver::new(config)),
            decomposer: Arc::new(DecompositionSolver::new(config)),
            decomposition_threshold: config.routing.decomposition_threshold,
            fast_timeout: config.fast.timeout(),
            liveness_interval: config.queue.liveness_interval(),
        }
    }

    /// Replace the fast solver; `None` makes the fast route unavailable
    pub fn with_fast_solver(mut self, fast: Option<Arc<dyn FastSolver>>) -> Self {
        self.fast = fast;
        self
    }

    /// Replace the heuristic-route solver
    pub fn with_heuristic_solver(mut self, heuristic: Arc<dyn ComponentSolver>) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Solve every slot of a job
    ///
    /// `None` slots were dropped during intake and come back as empty paths.
    /// Only cancellation fails a dispatch.
    pub async fn dispatch(
        &self,
        components: Vec<Option<Component>>,
        skip_fast_path: bool,
        token: &CancelToken,
        liveness: Option<Arc<dyn Liveness>>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let started = Instant::now();
        let plan = self.classifier.classify_batch(&components, skip_fast_path);
        let slots: Vec<Option<Arc<Component>>> = components.into_iter().map(|c| c.map(Arc::new)).collect();
        let (direct, mut deferred) = self.split_large(&slots, &plan.heuristic);

        info!(
            components = slots.len(),
            fast = plan.fast.len(),
            heuristic = direct.len(),
            decompose = deferred.len(),
            dropped = plan.dropped.len(),
            "Dispatching job"
        );

        let mut outcomes = vec![ComponentOutcome::default(); slots.len()];
        let mut report = RouteReport::default();
        let mut state = DispatchState::NotStarted;
        let mut states = vec![state];
        let mut pending_heuristic: TaskResults = Vec::new();
        let mut fast_failed: Vec<usize> = Vec::new();
        let mut heuristic_failed: Vec<usize> = Vec::new();

        while !state.is_terminal() {
            if token.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }
            state = state.next(&report);
            states.push(state);
            debug!(state = %state, "Dispatch transition");

            match state {
                DispatchState::FastAttempted => {
                    let (fast, heuristic) = tokio::join!(
                        self.run_fast(&slots, &plan.fast, token, liveness.clone()),
                        self.run_each(&slots, &direct, token, self.heuristic_fn()),
                    );
                    match fast {
                        Ok(paths) => {
                            let rejected = self.apply_fast(&slots, &plan.fast, paths, &mut outcomes, started);
                            if !rejected.is_empty() {
                                warn!(rejected = rejected.len(), "Fast route returned unusable paths");
                                report.fast_failed = true;
                                fast_failed = rejected;
                            }
                        }
                        Err(RouteError::Cancelled) => return Err(DispatchError::Cancelled),
                        Err(e) => {
                            warn!(components = plan.fast.len(), error = %e, "Fast route failed");
                            report.fast_failed = true;
                            fast_failed = plan.fast.clone();
                        }
                    }
                    pending_heuristic = heuristic?;
                }
                DispatchState::HeuristicAttempted => {
                    heuristic_failed = apply_tasks(std::mem::take(&mut pending_heuristic), &mut outcomes);
                    if !heuristic_failed.is_empty() {
                        warn!(failed = heuristic_failed.len(), "Heuristic route had failing tasks");
                    }
                    report.heuristic_failed = !heuristic_failed.is_empty();
                    report.decomposable = !deferred.is_empty() || self.has_decomposable(&slots, &outcomes);
                }
                DispatchState::CrossFallbackFastToHeuristic => {
                    let (small, large) = self.split_large(&slots, &fast_failed);
                    deferred.extend(large);
                    info!(components = small.len(), "Re-solving fast route on heuristic route");
                    let results = self.run_each(&slots, &small, token, self.heuristic_fn()).await?;
                    let failed = apply_tasks(results, &mut outcomes);
                    if !failed.is_empty() {
                        warn!(failed = failed.len(), "Cross-fallback tasks failed");
                    }
                    report.decomposable = !deferred.is_empty() || self.has_decomposable(&slots, &outcomes);
                }
                DispatchState::CrossFallbackHeuristicToFast => {
                    let small: Vec<usize> = heuristic_failed
                        .iter()
                        .copied()
                        .filter(|&slot| node_count(&slots, slot) < self.decomposition_threshold)
                        .collect();
                    info!(components = small.len(), "Re-solving failed heuristic tasks on fast route");
                    match self.run_fast(&slots, &small, token, liveness.clone()).await {
                        Ok(paths) => {
                            let rejected = self.apply_fast(&slots, &small, paths, &mut outcomes, started);
                            if !rejected.is_empty() {
                                warn!(rejected = rejected.len(), "Fast cross-fallback returned unusable paths");
                            }
                        }
                        Err(RouteError::Cancelled) => return Err(DispatchError::Cancelled),
                        Err(e) => warn!(error = %e, "Fast cross-fallback failed"),
                    }
                    report.decomposable = !deferred.is_empty() || self.has_decomposable(&slots, &outcomes);
                }
                DispatchState::Decomposed => {
                    let mut targets = std::mem::take(&mut deferred);
                    targets.extend((0..slots.len()).filter(|&slot| self.is_decomposable(&slots, &outcomes, slot)));
                    targets.sort_unstable();
                    targets.dedup();
                    info!(components = targets.len(), "Decomposing large components");
                    let results = self.run_each(&slots, &targets, token, self.decomposition_fn()).await?;
                    let failed = apply_tasks(results, &mut outcomes);
                    if !failed.is_empty() {
                        warn!(failed = failed.len(), "Decomposition tasks failed");
                    }
                    report.decomposable = false;
                }
                DispatchState::NotStarted | DispatchState::Done => {}
            }
        }

        let resolved = outcomes.iter().filter(|o| o.is_resolved()).count();
        info!(
            components = outcomes.len(),
            resolved = resolved,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dispatch finished"
        );
        Ok(DispatchOutcome { outcomes, states })
    }

    fn heuristic_fn(&self) -> SolveFn {
        let solver = self.heuristic.clone();
        Arc::new(move |component: &Component| solver.solve(component))
    }

    /// Decomposition first, the heuristic portfolio when no cut resolves it
    fn decomposition_fn(&self) -> SolveFn {
        let decomposer = self.decomposer.clone();
        let heuristic = self.heuristic.clone();
        Arc::new(move |component: &Component| {
            let outcome = decomposer.solve(component);
            if outcome.is_resolved() {
                return outcome;
            }
            debug!(nodes = component.node_count(), "No balanced cut resolved the component, using portfolio");
            heuristic.solve(component)
        })
    }

    /// Split `indices` into slots below and at or above the decomposition threshold
    fn split_large(&self, slots: &[Option<Arc<Component>>], indices: &[usize]) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .copied()
            .partition(|&slot| node_count(slots, slot) < self.decomposition_threshold)
    }

    /// One batched fast-solver call for `indices`
    async fn run_fast(
        &self,
        slots: &[Option<Arc<Component>>],
        indices: &[usize],
        token: &CancelToken,
        liveness: Option<Arc<dyn Liveness>>,
    ) -> Result<Vec<Path>, RouteError> {
        if indices.is_empty() {
            return Ok(Vec::new());
        }
        let solver = self.fast.clone().ok_or(RouteError::Unavailable)?;
        let batch = FastBatch::new(
            indices
                .iter()
                .filter_map(|&slot| slots[slot].as_deref().cloned())
                .collect(),
        );
        let expected = batch.len();
        debug!(solver = solver.name(), components = expected, "Calling fast solver");

        let call = tokio::time::timeout(
            self.fast_timeout,
            self.pool.run(move || solver.solve_batch(&batch)),
        );
        let poll = async {
            match liveness {
                Some(liveness) => watch_liveness(liveness, token.clone(), self.liveness_interval).await,
                None => std::future::pending::<()>().await,
            }
        };

        let paths = tokio::select! {
            result = call => match result {
                Err(_) => return Err(RouteError::Timeout(self.fast_timeout.as_millis() as u64)),
                Ok(pooled) => pooled??,
            },
            _ = token.cancelled() => return Err(RouteError::Cancelled),
            _ = poll => return Err(RouteError::Cancelled),
        };

        if paths.len() != expected {
            return Err(RouteError::CountMismatch {
                expected,
                got: paths.len(),
            });
        }
        Ok(paths)
    }

    /// Record fast paths that validate; returns the slots whose path was
    /// empty or invalid
    fn apply_fast(
        &self,
        slots: &[Option<Arc<Component>>],
        indices: &[usize],
        paths: Vec<Path>,
        outcomes: &mut [ComponentOutcome],
        started: Instant,
    ) -> Vec<usize> {
        let mut rejected = Vec::new();
        for (&slot, path) in indices.iter().zip(paths) {
            let Some(component) = slots[slot].as_deref() else {
                continue;
            };
            if path.is_empty() {
                debug!(slot = slot, "Fast solver returned an empty path");
                rejected.push(slot);
                continue;
            }
            if !is_valid_path(component, &path) || !path.iter().all(|n| component.contains(n)) {
                warn!(slot = slot, len = path.len(), "Discarding invalid fast path");
                rejected.push(slot);
                continue;
            }
            outcomes[slot] = ComponentOutcome::new(path, StrategyKind::Fast, started.elapsed());
        }
        rejected
    }

    /// Solve each slot in its own pool task
    async fn run_each(
        &self,
        slots: &[Option<Arc<Component>>],
        indices: &[usize],
        token: &CancelToken,
        solve: SolveFn,
    ) -> Result<TaskResults, DispatchError> {
        if indices.is_empty() {
            return Ok(Vec::new());
        }
        let tasks = indices.iter().filter_map(|&slot| {
            let component = slots[slot].clone()?;
            let solve = solve.clone();
            let pool = self.pool.clone();
            Some(async move { (slot, pool.run(move || solve(component.as_ref())).await) })
        });

        tokio::select! {
            results = join_all(tasks) => Ok(results),
            _ = token.cancelled() => Err(DispatchError::Cancelled),
        }
    }

    fn is_decomposable(&self, slots: &[Option<Arc<Component>>], outcomes: &[ComponentOutcome], slot: usize) -> bool {
        slots[slot].is_some()
            && !outcomes[slot].is_resolved()
            && node_count(slots, slot) >= self.decomposition_threshold
    }

    fn has_decomposable(&self, slots: &[Option<Arc<Component>>], outcomes: &[ComponentOutcome]) -> bool {
        (0..slots.len()).any(|slot| self.is_decomposable(slots, outcomes, slot))
    }
}

fn node_count(slots: &[Option<Arc<Component>>], slot: usize) -> usize {
    slots[slot].as_ref().map_or(0, |c| c.node_count())
}

/// Store successful task outcomes; returns the slots whose task failed
fn apply_tasks(results: TaskResults, outcomes: &mut [ComponentOutcome]) -> Vec<usize> {
    let mut failed = Vec::new();
    for (slot, result) in results {
        match result {
            Ok(outcome) => {
                if outcome.len() > outcomes[slot].len() {
                    outcomes[slot] = outcome;
                }
            }
            Err(e) => {
                warn!(slot = slot, error = %e, "Component task failed");
                failed.push(slot);
            }
        }
    }
    failed
}
