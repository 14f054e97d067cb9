//! Per-connection cancellation registry
//!
//! At most one running job per connection. The lock is held for insert and
//! remove only; solving happens outside it.

use mazepath_router::CancelToken;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::connection::ConnectionId;
use crate::job_queue::JobId;

/// The running job of one connection
#[derive(Debug, Clone)]
pub struct Registration {
    pub job_id: JobId,
    pub token: CancelToken,
    pub registered_at: Instant,
}

#[derive(Debug, Default)]
pub struct CancellationRegistry {
    entries: Mutex<HashMap<ConnectionId, Registration>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job_id` as the running job of `connection_id`
    ///
    /// A previous registration for the same connection is cancelled.
    pub fn register(&self, connection_id: &str, job_id: &str, token: CancelToken) {
        let registration = Registration {
            job_id: job_id.to_string(),
            token,
            registered_at: Instant::now(),
        };
        let previous = self
            .entries
            .lock()
            .insert(connection_id.to_string(), registration);

        if let Some(previous) = previous {
            warn!(
                connection = %connection_id,
                job_id = %previous.job_id,
                "Replacing live registration, cancelling previous job"
            );
            previous.token.cancel();
        }
        debug!(connection = %connection_id, job_id = %job_id, "Job registered");
    }

    /// Remove the entry if it still belongs to `job_id`
    pub fn unregister(&self, connection_id: &str, job_id: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(connection_id) {
            Some(entry) if entry.job_id == job_id => {
                entries.remove(connection_id);
                debug!(connection = %connection_id, job_id = %job_id, "Job unregistered");
                true
            }
            _ => false,
        }
    }

    /// Cancel and remove the connection's running job
    pub fn cancel(&self, connection_id: &str) -> Option<JobId> {
        let entry = self.entries.lock().remove(connection_id)?;
        entry.token.cancel();
        info!(
            connection = %connection_id,
            job_id = %entry.job_id,
            running_ms = entry.registered_at.elapsed().as_millis() as u64,
            "Cancelled running job"
        );
        Some(entry.job_id)
    }

    pub fn is_registered(&self, connection_id: &str) -> bool {
        self.entries.lock().contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
