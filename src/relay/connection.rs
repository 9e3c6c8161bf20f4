//! Per-connection handles shared between a connection task and the
//! registry.

use std::fmt;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Process-unique id the server assigns to every accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The connection's task is gone, so nothing will ever be written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("connection {0} is closed")]
pub struct SendError(pub ConnectionId);

/// Outbound half of a client connection.
///
/// Sending only queues the serialised frame; the connection's own task
/// writes it to the socket.  A send fails once that task has ended, which
/// is the explicit "connection closed" signal.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ConnectionId,
    peer: SocketAddr,
    tx: mpsc::UnboundedSender<String>,
}

impl ClientHandle {
    pub fn new(id: ConnectionId, peer: SocketAddr, tx: mpsc::UnboundedSender<String>) -> Self {
        Self { id, peer, tx }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Queue a text frame for this client.
    pub fn send(&self, text: String) -> Result<(), SendError> {
        self.tx.send(text).map_err(|_| SendError(self.id))
    }

    /// Whether the connection's task has ended.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
