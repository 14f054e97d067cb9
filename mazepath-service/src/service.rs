//! Solve service: streaming queue, drain loop and direct calls
//!
//! ```text
//! submit_streaming ──► intake ──► JobQueue ──► drain loop ──► Dispatcher
//!        │                                        │              │
//!        └── queued ack                  register token     solution / error
//!                                                 │              │
//! connection_closed ──► cancel + purge ◄──────────┘         ResultCache
//! ```
//!
//! Direct calls skip the queue and the registry and are solved in place.

use mazepath_core::ServiceConfig;
use mazepath_router::{CancelToken, DispatchError, Dispatcher, Liveness};
use mazepath_types::{generate_session_id, ServerMessage, SessionId, SolveRequest, SolveResponse};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheEntry, NoopCache, ResultCache};
use crate::connection::{Connection, ConnectionLiveness};
use crate::error::ServiceError;
use crate::intake::check_request;
use crate::job_queue::{Job, JobQueue};
use crate::registry::CancellationRegistry;

/// Process-wide solve service; clones share all state
#[derive(Clone)]
pub struct SolveService {
    dispatcher: Arc<Dispatcher>,
    queue: Arc<Mutex<JobQueue>>,
    registry: Arc<CancellationRegistry>,
    cache: Arc<dyn ResultCache>,
    notify: Arc<Notify>,
    shutdown: CancelToken,
}

impl SolveService {
    pub fn new(config: &ServiceConfig) -> Self {
        info!(
            queue_max = config.queue.max_size,
            cpu_limit = config.pool.cpu_limit,
            fast_enabled = config.fast.enabled,
            "Creating solve service"
        );
        Self {
            dispatcher: Arc::new(Dispatcher::new(config)),
            queue: Arc::new(Mutex::new(JobQueue::new(config.queue.max_size))),
            registry: Arc::new(CancellationRegistry::new()),
            cache: Arc::new(NoopCache),
            notify: Arc::new(Notify::new()),
            shutdown: CancelToken::new(),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Arc::new(dispatcher);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn registry(&self) -> &CancellationRegistry {
        &self.registry
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Accept a streaming request into the queue
    ///
    /// The connection gets a queued acknowledgement, or an error payload
    /// when the request is rejected.
    pub async fn submit_streaming(
        &self,
        connection: Arc<dyn Connection>,
        mut request: SolveRequest,
    ) -> Result<SessionId, ServiceError> {
        let session_id = request
            .session_id
            .take()
            .unwrap_or_else(|| generate_session_id("ws"));

        let accepted = check_request(&request).map_err(ServiceError::from).and_then(|components| {
            let job = Job::new(
                session_id.clone(),
                connection.clone(),
                components,
                request.components.take().unwrap_or_default(),
            )
            .with_dimensions(std::mem::take(&mut request.dimensions))
            .with_skip_fast_path(request.skip_fast_path);
            let job_id = job.id.clone();
            let position = self.queue.lock().enqueue(job)?;
            Ok((job_id, position))
        });

        let (job_id, position) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(connection = %connection.id(), session_id = %session_id, error = %e, "Rejected request");
                let message = ServerMessage::Error {
                    session_id: Some(session_id),
                    error: e.to_string(),
                };
                if let Err(send_error) = connection.send(message).await {
                    debug!(error = %send_error, "Could not report rejection");
                }
                return Err(e);
            }
        };

        info!(
            job_id = %job_id,
            connection = %connection.id(),
            session_id = %session_id,
            position = position,
            "Job queued"
        );
        let ack = ServerMessage::Queued {
            session_id: session_id.clone(),
            position,
        };
        if let Err(e) = connection.send(ack).await {
            warn!(job_id = %job_id, error = %e, "Queued acknowledgement failed, dropping job");
            self.queue.lock().remove(&job_id);
            return Err(e.into());
        }
        self.notify.notify_one();
        Ok(session_id)
    }

    /// Solve a request in place, bypassing the queue
    pub async fn solve_direct(&self, mut request: SolveRequest) -> Result<SolveResponse, ServiceError> {
        let components = check_request(&request)?;
        let session_id = request
            .session_id
            .take()
            .unwrap_or_else(|| generate_session_id("solve"));
        info!(session_id = %session_id, components = components.len(), "Direct solve");

        let outcome = self
            .dispatcher
            .dispatch(components, request.skip_fast_path, &CancelToken::new(), None)
            .await?;
        let paths = outcome.into_paths();

        self.store(CacheEntry {
            session_id: session_id.clone(),
            components: request.components.take().unwrap_or_default(),
            dimensions: request.dimensions,
            paths: paths.clone(),
        })
        .await;

        Ok(SolveResponse {
            session_id,
            data: paths,
        })
    }

    /// Handle a connection going away
    ///
    /// Cancels its running job and drops its queued ones. Returns the number
    /// of queued jobs purged.
    pub fn connection_closed(&self, connection_id: &str) -> usize {
        let cancelled = self.registry.cancel(connection_id);
        let purged = self.queue.lock().purge_connection(connection_id);
        info!(
            connection = %connection_id,
            cancelled = cancelled.is_some(),
            purged = purged,
            "Connection closed"
        );
        purged
    }

    /// Spawn the drain loop on the current runtime
    pub fn spawn(&self) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move { service.run().await })
    }

    /// Stop the drain loop once the current job finishes
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.notify.notify_one();
    }

    /// Drain the queue until shutdown
    pub async fn run(&self) {
        info!("Drain loop started");
        while !self.shutdown.is_cancelled() {
            let next = self.queue.lock().dequeue_next();
            match next {
                Some(job) => self.execute(job).await,
                None => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = self.shutdown.cancelled() => {}
                    }
                }
            }
        }
        info!("Drain loop stopped");
    }

    async fn execute(&self, job: Job) {
        let connection_id = job.connection.id().to_string();
        if !job.connection.is_connected() {
            info!(job_id = %job.id, connection = %connection_id, "Skipping job for closed connection");
            return;
        }

        let token = CancelToken::new();
        self.registry.register(&connection_id, &job.id, token.clone());
        info!(job_id = %job.id, session_id = %job.session_id, "Job started");

        let liveness: Arc<dyn Liveness> = Arc::new(ConnectionLiveness::new(job.connection.clone()));
        let dispatcher = self.dispatcher.clone();
        let task_token = token.clone();
        let components = job.components;
        let skip = job.skip_fast_path;
        let handle = tokio::spawn(async move {
            dispatcher
                .dispatch(components, skip, &task_token, Some(liveness))
                .await
        });

        match handle.await {
            Ok(Ok(outcome)) if !token.is_cancelled() => {
                let paths = outcome.into_paths();
                let message = ServerMessage::Solution {
                    session_id: job.session_id.clone(),
                    data: paths.clone(),
                };
                match job.connection.send(message).await {
                    Ok(()) => info!(
                        job_id = %job.id,
                        session_id = %job.session_id,
                        elapsed_ms = job.enqueued_at.elapsed().as_millis() as u64,
                        "Solution delivered"
                    ),
                    Err(e) => warn!(job_id = %job.id, error = %e, "Solution not delivered"),
                }
                self.store(CacheEntry {
                    session_id: job.session_id,
                    components: job.raw_components,
                    dimensions: job.dimensions,
                    paths,
                })
                .await;
            }
            Ok(Ok(_)) | Ok(Err(DispatchError::Cancelled)) => {
                info!(job_id = %job.id, "Job cancelled, discarding result");
            }
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Job failed unexpectedly");
                let message = ServerMessage::Error {
                    session_id: Some(job.session_id),
                    error: ServiceError::Internal(e.to_string()).to_string(),
                };
                if let Err(send_error) = job.connection.send(message).await {
                    debug!(error = %send_error, "Could not report job failure");
                }
            }
        }

        self.registry.unregister(&connection_id, &job.id);
    }

    async fn store(&self, entry: CacheEntry) {
        let session_id = entry.session_id.clone();
        if let Err(e) = self.cache.store(entry).await {
            warn!(session_id = %session_id, error = %e, "Failed to cache result");
        }
    }
}
