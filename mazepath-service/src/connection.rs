//! Streaming connection collaborator
//!
//! The transport is outside this crate; it hands the service an
//! `Arc<dyn Connection>` per client. [`ChannelConnection`] is the in-process
//! adapter used by the binary and the tests.

use async_trait::async_trait;
use mazepath_router::Liveness;
use mazepath_types::ServerMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::ConnectionError;

/// Connection identity, also the cancellation key
pub type ConnectionId = String;

#[async_trait]
pub trait Connection: Send + Sync {
    fn id(&self) -> &str;

    /// Whether the client is still attached
    fn is_connected(&self) -> bool;

    async fn send(&self, message: ServerMessage) -> Result<(), ConnectionError>;
}

/// Connection backed by an unbounded channel
#[derive(Debug)]
pub struct ChannelConnection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerMessage>,
    connected: AtomicBool,
}

impl ChannelConnection {
    /// Create a connection and the receiving end the client reads from
    pub fn new(id: impl Into<ConnectionId>) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Self {
            id: id.into(),
            tx,
            connected: AtomicBool::new(true),
        };
        (connection, rx)
    }

    /// Mark the client as gone
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connection for ChannelConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.tx.is_closed()
    }

    async fn send(&self, message: ServerMessage) -> Result<(), ConnectionError> {
        if !self.is_connected() {
            return Err(ConnectionError::Closed(self.id.clone()));
        }
        self.tx
            .send(message)
            .map_err(|_| ConnectionError::Closed(self.id.clone()))
    }
}

/// Exposes a connection's liveness to the dispatcher
pub struct ConnectionLiveness(Arc<dyn Connection>);

impl ConnectionLiveness {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self(connection)
    }
}

impl Liveness for ConnectionLiveness {
    fn is_connected(&self) -> bool {
        self.0.is_connected()
    }
}
