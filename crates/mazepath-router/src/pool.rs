//! Bounded worker pool for CPU-bound solving
//!
//! Tasks run on tokio's blocking threads; a semaphore caps how many run at
//! once. The pool is cheap to clone and shared by every job in the process.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::trace;

use crate::error::PoolError;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl WorkerPool {
    /// Create a pool running at most `limit` tasks at once
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held by a running task
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Stop accepting work; queued callers get `PoolError::Closed`
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Run `task` on a blocking thread once a permit is free
    pub async fn run<F, T>(&self, task: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;
        trace!(available = self.available(), "Worker permit acquired");

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task()
        })
        .await
        .map_err(|e| {
            if e.is_panic() {
                PoolError::Panicked(panic_message(e.into_panic()))
            } else {
                PoolError::Cancelled
            }
        })
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_value() {
        let pool = WorkerPool::new(2);

        assert_eq!(pool.run(|| 21 * 2).await, Ok(42));
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_panic_is_reported() {
        let pool = WorkerPool::new(1);
        let result: Result<(), PoolError> = pool.run(|| panic!("solver blew up")).await;

        assert_eq!(result, Err(PoolError::Panicked("solver blew up".to_string())));
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_work() {
        let pool = WorkerPool::new(1);
        pool.close();

        assert!(pool.is_closed());
        assert_eq!(pool.run(|| ()).await, Err(PoolError::Closed));
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..6).map(|_| {
            let running = running.clone();
            let peak = peak.clone();
            pool.run(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
            })
        });
        let results = futures::future::join_all(tasks).await;

        assert!(results.iter().all(Result::is_ok));
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
