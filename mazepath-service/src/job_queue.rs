//! FIFO queue of streaming jobs awaiting the drain loop

use mazepath_types::{Component, Dimensions, SessionId};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::QueueError;

pub type JobId = String;

/// One accepted streaming request
pub struct Job {
    pub id: JobId,
    pub session_id: SessionId,
    pub connection: Arc<dyn Connection>,

    /// Normalized components; `None` where intake dropped one
    pub components: Vec<Option<Component>>,

    /// Components as received, for the cache
    pub raw_components: Vec<Value>,

    pub dimensions: Dimensions,
    pub skip_fast_path: bool,
    pub enqueued_at: Instant,
}

impl Job {
    pub fn new(
        session_id: SessionId,
        connection: Arc<dyn Connection>,
        components: Vec<Option<Component>>,
        raw_components: Vec<Value>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            connection,
            components,
            raw_components,
            dimensions: Dimensions::default(),
            skip_fast_path: false,
            enqueued_at: Instant::now(),
        }
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_skip_fast_path(mut self, skip: bool) -> Self {
        self.skip_fast_path = skip;
        self
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("session_id", &self.session_id)
            .field("connection", &self.connection.id())
            .field("components", &self.components.len())
            .field("skip_fast_path", &self.skip_fast_path)
            .finish()
    }
}

/// Bounded FIFO job queue
pub struct JobQueue {
    max_size: usize,
    queue: VecDeque<Job>,
    ids: HashSet<JobId>,
}

impl JobQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            queue: VecDeque::new(),
            ids: HashSet::new(),
        }
    }

    /// Append a job and return its 1-based position
    pub fn enqueue(&mut self, job: Job) -> Result<usize, QueueError> {
        if self.queue.len() >= self.max_size {
            warn!(
                queue_size = self.queue.len(),
                max_size = self.max_size,
                "Job queue is full"
            );
            return Err(QueueError::QueueFull(self.max_size));
        }
        if self.ids.contains(&job.id) {
            return Err(QueueError::DuplicateJob(job.id.clone()));
        }

        self.ids.insert(job.id.clone());
        debug!(
            job_id = %job.id,
            connection = %job.connection.id(),
            queue_size = self.queue.len() + 1,
            "Job enqueued"
        );
        self.queue.push_back(job);
        Ok(self.queue.len())
    }

    /// Pop the oldest job
    pub fn dequeue_next(&mut self) -> Option<Job> {
        let job = self.queue.pop_front()?;
        self.ids.remove(&job.id);
        debug!(
            job_id = %job.id,
            waited_ms = job.enqueued_at.elapsed().as_millis() as u64,
            queue_size = self.queue.len(),
            "Job dequeued"
        );
        Some(job)
    }

    /// Take a specific job out of the queue
    pub fn remove(&mut self, job_id: &str) -> Option<Job> {
        if !self.ids.remove(job_id) {
            return None;
        }
        let position = self.queue.iter().position(|job| job.id == job_id)?;
        let job = self.queue.remove(position)?;
        debug!(job_id = %job_id, queue_size = self.queue.len(), "Job removed");
        Some(job)
    }

    /// Drop every queued job belonging to `connection_id`
    pub fn purge_connection(&mut self, connection_id: &str) -> usize {
        let before = self.queue.len();
        let ids = &mut self.ids;
        self.queue.retain(|job| {
            let keep = job.connection.id() != connection_id;
            if !keep {
                ids.remove(&job.id);
            }
            keep
        });
        let purged = before - self.queue.len();
        if purged > 0 {
            debug!(connection = %connection_id, purged = purged, "Purged queued jobs");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.max_size
    }

    pub fn pending_ids(&self) -> Vec<JobId> {
        self.queue.iter().map(|job| job.id.clone()).collect()
    }
}
