//! End-to-end tests for request → queue → dispatch → delivery
//!
//! These tests drive `SolveService` through both entry points with small
//! strategy budgets and fixed seeds.

use mazepath_core::{ServiceConfig, StrategyBudgets};
use mazepath_router::{Dispatcher, FastBatch, FastSolver, FastSolverError};
use async_trait::async_trait;
use mazepath_service::{
    CacheEntry, ChannelConnection, Connection, MemoryCache, QueueError, ResultCache, ServiceError,
    SolveService,
};
use mazepath_solver::is_valid_path;
use mazepath_types::{Component, Path, ServerMessage, SolveRequest};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Initialize tracing for tests
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.budgets = StrategyBudgets::uniform(300);
    config.search.workers = 2;
    config.search.seed = Some(7);
    config.pool.cpu_limit = 2;
    config.queue.liveness_interval_ms = 50;
    config
}

fn request(components: serde_json::Value) -> SolveRequest {
    serde_json::from_value(json!({ "components": components })).unwrap()
}

struct Failing;

impl FastSolver for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn solve_batch(&self, _: &FastBatch) -> Result<Vec<Path>, FastSolverError> {
        Err(FastSolverError::Failed("solver crashed".to_string()))
    }
}

/// Blocks its worker thread, then gives up
struct Slow(Duration);

impl FastSolver for Slow {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn solve_batch(&self, _: &FastBatch) -> Result<Vec<Path>, FastSolverError> {
        std::thread::sleep(self.0);
        Err(FastSolverError::Failed("too slow".to_string()))
    }
}

/// Refuses every write
struct BrokenCache;

#[async_trait]
impl ResultCache for BrokenCache {
    async fn store(&self, _entry: CacheEntry) -> anyhow::Result<()> {
        anyhow::bail!("cache backend offline")
    }
}

fn service_with_fast(config: &ServiceConfig, fast: Arc<dyn FastSolver>) -> SolveService {
    SolveService::new(config).with_dispatcher(Dispatcher::new(config).with_fast_solver(Some(fast)))
}

async fn wait_until(limit: Duration, check: impl Fn() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < limit {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

#[tokio::test]
async fn test_cross_fallback_when_fast_solver_fails() {
    init_tracing();
    let config = test_config();
    let service = service_with_fast(&config, Arc::new(Failing));
    let raw = json!({"1": ["2"], "2": ["1", "3"], "3": ["2"]});

    let response = service.solve_direct(request(json!([raw.clone()]))).await.unwrap();
    let component = Component::normalize(&raw).unwrap();

    info!(path = ?response.data[0], "Cross-fallback result");
    assert!(response.session_id.starts_with("solve_"));
    assert_eq!(response.data[0].len(), 3);
    assert!(is_valid_path(&component, &response.data[0]));
}

#[tokio::test]
async fn test_isolated_node_returns_itself() {
    init_tracing();
    let service = SolveService::new(&test_config());

    let response = service.solve_direct(request(json!([{"1": []}]))).await.unwrap();

    assert_eq!(response.data, vec![vec!["1".to_string()]]);
}

#[tokio::test]
async fn test_flat_list_component_does_not_abort_batch() {
    init_tracing();
    let cache = Arc::new(MemoryCache::new(4));
    let service = SolveService::new(&test_config()).with_cache(cache.clone());
    let mut request = request(json!([{"a": ["b"], "b": ["c"]}, ["x", "y", "z"]]));
    request.session_id = Some("batch-1".to_string());

    let response = service.solve_direct(request).await.unwrap();

    assert_eq!(response.session_id, "batch-1");
    assert_eq!(response.data.len(), 2);
    assert_eq!(response.data[0].len(), 3);
    assert!(response.data[1].is_empty());

    let entry = cache.get("batch-1").unwrap();
    assert_eq!(entry.components.len(), 2);
    assert_eq!(entry.paths, response.data);
}

#[tokio::test]
async fn test_direct_call_rejects_missing_components() {
    let service = SolveService::new(&test_config());

    let result = service.solve_direct(SolveRequest::default()).await;

    assert!(matches!(result, Err(ServiceError::Input(_))));
}

#[tokio::test]
async fn test_streaming_job_is_acknowledged_and_solved() {
    init_tracing();
    let service = SolveService::new(&test_config());
    let drain = service.spawn();
    let (connection, mut rx) = ChannelConnection::new("conn-1");

    let session_id = service
        .submit_streaming(Arc::new(connection), request(json!([{"1": ["2"], "2": ["3"]}])))
        .await
        .unwrap();
    assert!(session_id.starts_with("ws_"));

    assert_eq!(
        rx.recv().await,
        Some(ServerMessage::Queued {
            session_id: session_id.clone(),
            position: 1
        })
    );
    let solution = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match solution {
        ServerMessage::Solution { session_id: id, data } => {
            assert_eq!(id, session_id);
            assert_eq!(data[0].len(), 3);
        }
        other => panic!("unexpected message: {:?}", other),
    }

    assert!(wait_until(Duration::from_secs(1), || service.registry().is_empty()).await);
    service.shutdown();
    drain.await.unwrap();
}

#[tokio::test]
async fn test_disconnect_cancels_running_job() {
    init_tracing();
    let config = test_config();
    let service = service_with_fast(&config, Arc::new(Slow(Duration::from_millis(1500))));
    let drain = service.spawn();
    let (connection, mut rx) = ChannelConnection::new("conn-1");
    let connection = Arc::new(connection);

    service
        .submit_streaming(connection.clone(), request(json!([{"1": ["2"], "2": ["3"]}])))
        .await
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || service.registry().is_registered("conn-1")).await);

    connection.close();
    let within = config.queue.liveness_interval() + Duration::from_millis(50);
    assert!(wait_until(within, || service.registry().is_empty()).await);

    assert!(matches!(rx.recv().await, Some(ServerMessage::Queued { .. })));
    assert!(rx.try_recv().is_err());

    service.shutdown();
    drain.await.unwrap();
}

#[tokio::test]
async fn test_connection_closed_event_cancels_and_purges() {
    init_tracing();
    let config = test_config();
    let service = service_with_fast(&config, Arc::new(Slow(Duration::from_millis(1000))));
    let drain = service.spawn();
    let (connection, mut rx) = ChannelConnection::new("conn-1");
    let connection: Arc<dyn Connection> = Arc::new(connection);
    let small = json!([{"1": ["2"]}]);

    service.submit_streaming(connection.clone(), request(small.clone())).await.unwrap();
    assert!(wait_until(Duration::from_secs(2), || service.registry().is_registered("conn-1")).await);
    service.submit_streaming(connection.clone(), request(small)).await.unwrap();

    assert_eq!(service.connection_closed("conn-1"), 1);
    assert!(service.registry().is_empty());
    assert_eq!(service.queue_len(), 0);

    service.shutdown();
    drain.await.unwrap();
    let mut delivered = Vec::new();
    while let Ok(message) = rx.try_recv() {
        delivered.push(message);
    }
    assert!(delivered
        .iter()
        .all(|m| matches!(m, ServerMessage::Queued { .. })));
}

#[tokio::test]
async fn test_queue_full_is_reported() {
    init_tracing();
    let mut config = test_config();
    config.queue.max_size = 1;
    let service = SolveService::new(&config);
    let (connection, mut rx) = ChannelConnection::new("conn-1");
    let connection: Arc<dyn Connection> = Arc::new(connection);

    service
        .submit_streaming(connection.clone(), request(json!([{"1": []}])))
        .await
        .unwrap();
    let rejected = service
        .submit_streaming(connection.clone(), request(json!([{"1": []}])))
        .await;

    assert!(matches!(
        rejected,
        Err(ServiceError::Queue(QueueError::QueueFull(1)))
    ));
    assert!(matches!(rx.recv().await, Some(ServerMessage::Queued { position: 1, .. })));
    assert!(matches!(rx.recv().await, Some(ServerMessage::Error { .. })));
}

#[tokio::test]
async fn test_streaming_rejects_unusable_request() {
    let service = SolveService::new(&test_config());
    let (connection, mut rx) = ChannelConnection::new("conn-1");

    let result = service
        .submit_streaming(Arc::new(connection), request(json!(["not a component"])))
        .await;

    assert!(matches!(result, Err(ServiceError::Input(_))));
    assert_eq!(service.queue_len(), 0);
    assert!(matches!(rx.recv().await, Some(ServerMessage::Error { session_id: Some(_), .. })));
}

#[tokio::test]
async fn test_closed_connection_leaves_nothing_queued() {
    init_tracing();
    let service = SolveService::new(&test_config());
    let (connection, _rx) = ChannelConnection::new("conn-1");
    connection.close();

    let result = service
        .submit_streaming(Arc::new(connection), request(json!([{"1": ["2"]}])))
        .await;

    assert!(matches!(result, Err(ServiceError::Connection(_))));
    assert_eq!(service.queue_len(), 0);
}

#[tokio::test]
async fn test_cache_failure_does_not_block_delivery() {
    init_tracing();
    let service = SolveService::new(&test_config()).with_cache(Arc::new(BrokenCache));
    let drain = service.spawn();
    let (connection, mut rx) = ChannelConnection::new("conn-1");

    service
        .submit_streaming(Arc::new(connection), request(json!([{"1": ["2"], "2": ["3"]}])))
        .await
        .unwrap();
    assert!(matches!(rx.recv().await, Some(ServerMessage::Queued { .. })));
    let solution = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .unwrap();
    assert!(matches!(solution, Some(ServerMessage::Solution { ref data, .. }) if data[0].len() == 3));

    let direct = service.solve_direct(request(json!([{"a": ["b"]}]))).await.unwrap();
    assert_eq!(direct.data[0].len(), 2);

    service.shutdown();
    drain.await.unwrap();
}
