/// Errors from opening, using or closing a connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not be bound.
    #[error("could not bind {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A TCP accept or the server-side WebSocket handshake failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The server at `url` could not be reached or refused the handshake.
    #[error("could not connect to {url}: {source}")]
    ConnectFailed {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The peer is gone.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// No more connections will be accepted.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Returns `true` if the error means the peer went away rather than
    /// something going wrong locally.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::ConnectionClosed(_) | Self::ReceiveFailed(_))
    }
}
