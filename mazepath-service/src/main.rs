//! Mazepath - Main entry point
//!
//! Reads one JSON solve request per stdin line and writes one JSON response
//! per stdout line. Logs go to stderr.

use mazepath_core::ServiceConfig;
use mazepath_service::{MemoryCache, SolveService};
use mazepath_types::{ServerMessage, SolveRequest};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CACHE_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = ServiceConfig::from_env();
    config.validate()?;

    let service = SolveService::new(&config).with_cache(Arc::new(MemoryCache::new(CACHE_CAPACITY)));
    info!("mazepath ready, reading requests from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<SolveRequest>(&line) {
            Ok(request) => {
                let session_id = request.session_id.clone();
                match service.solve_direct(request).await {
                    Ok(response) => serde_json::to_string(&response)?,
                    Err(e) => {
                        warn!(error = %e, "Request failed");
                        serde_json::to_string(&ServerMessage::Error {
                            session_id,
                            error: e.to_string(),
                        })?
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Malformed request line");
                serde_json::to_string(&ServerMessage::Error {
                    session_id: None,
                    error: format!("Malformed request: {}", e),
                })?
            }
        };

        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}
