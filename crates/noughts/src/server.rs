//! `NoughtsServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → rooms.

use std::sync::Arc;

use noughts_protocol::{Codec, JsonCodec};
use noughts_room::{RoomConfig, RoomManager};
use noughts_transport::{Transport, TransportError, WebSocketTransport};
use tokio::sync::Mutex;

use crate::NoughtsError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a room server.
///
/// ```rust,no_run
/// use noughts::NoughtsServer;
///
/// # async fn run() -> Result<(), noughts::NoughtsError> {
/// let server = NoughtsServer::builder().bind("0.0.0.0:8080").build().await?;
/// server.run().await
/// # }
/// ```
pub struct NoughtsServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl NoughtsServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Binds a WebSocket listener and returns the server.
    pub async fn build(
        self,
    ) -> Result<NoughtsServer<WebSocketTransport, JsonCodec>, NoughtsError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        Ok(self.with_transport(transport))
    }

    /// Builds the server on an already bound transport.
    pub fn with_transport<T: Transport>(
        self,
        transport: T,
    ) -> NoughtsServer<T, JsonCodec> {
        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomManager::new(self.room_config)),
            codec: JsonCodec,
        });
        NoughtsServer { transport, state }
    }
}

impl Default for NoughtsServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A room server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct NoughtsServer<T: Transport, C: Codec> {
    transport: T,
    state: Arc<ServerState<C>>,
}

impl NoughtsServer<WebSocketTransport, JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> NoughtsServerBuilder {
        NoughtsServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }
}

impl<T: Transport, C: Codec> NoughtsServer<T, C> {
    /// Runs the accept loop, spawning a handler task per connection.
    ///
    /// Returns once the transport shuts down.
    pub async fn run(mut self) -> Result<(), NoughtsError> {
        tracing::info!("noughts server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(TransportError::Shutdown) => {
                    tracing::info!("transport shut down, server stopping");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
