//! In-process transport built on tokio channels.
//!
//! [`channel`] returns a connector/listener pair wired to each other, so a
//! room server and any number of clients can run inside one test without
//! opening sockets.

use tokio::sync::{Mutex, mpsc};

use crate::{Connection, ConnectionId, Connector, Transport, TransportError};

/// One end of an in-memory duplex pipe.
pub struct MemoryConnection {
    id: ConnectionId,
    tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl MemoryConnection {
    /// Creates two connected ends. Frames sent on one arrive on the other.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        let a = Self {
            id: ConnectionId::next(),
            tx: Mutex::new(Some(a_tx)),
            rx: Mutex::new(a_rx),
        };
        let b = Self {
            id: ConnectionId::next(),
            tx: Mutex::new(Some(b_tx)),
            rx: Mutex::new(b_rx),
        };
        (a, b)
    }
}

impl Connection for MemoryConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let tx = self.tx.lock().await;
        let Some(tx) = tx.as_ref() else {
            return Err(TransportError::ConnectionClosed(
                "closed locally".into(),
            ));
        };
        tx.send(data.to_vec()).map_err(|_| {
            TransportError::ConnectionClosed("peer dropped".into())
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        // Dropping the sender ends the peer's `recv` with `None`.
        self.tx.lock().await.take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Dials a [`MemoryTransport`].
#[derive(Clone)]
pub struct MemoryConnector {
    incoming: mpsc::UnboundedSender<MemoryConnection>,
}

impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<Self::Connection, TransportError> {
        let (client, server) = MemoryConnection::pair();
        self.incoming.send(server).map_err(|_| {
            TransportError::ConnectionClosed("listener gone".into())
        })?;
        tracing::debug!(id = %client.id(), "memory connection opened");
        Ok(client)
    }
}

/// Accepts connections opened through the paired [`MemoryConnector`].
pub struct MemoryTransport {
    incoming: mpsc::UnboundedReceiver<MemoryConnection>,
}

impl Transport for MemoryTransport {
    type Connection = MemoryConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        self.incoming.recv().await.ok_or(TransportError::Shutdown)
    }
}

/// Creates a connected connector and listener.
///
/// Once every connector clone is dropped, `accept` returns
/// [`TransportError::Shutdown`].
pub fn channel() -> (MemoryConnector, MemoryTransport) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        MemoryConnector { incoming: tx },
        MemoryTransport { incoming: rx },
    )
}
