//! Error types for the client and the server.

use std::time::Duration;

use noughts_protocol::ProtocolError;
use noughts_room::RoomError;
use noughts_transport::TransportError;

/// Why a [`GameController`](crate::GameController) operation failed.
///
/// Every failure has already been shown to the player through the
/// notifier by the time it is returned.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The operation needs a server connection.
    #[error("not connected to a server")]
    NotConnected,

    /// The operation needs to be in a room.
    #[error("not in a room")]
    NotInRoom,

    /// The server did not answer a request in time.
    #[error("no answer from the server within {0:?}")]
    Timeout(Duration),

    /// The server refused the request.
    #[error("{0}")]
    Rejected(String),

    /// The connection dropped while waiting.
    #[error("connection lost")]
    Disconnected,

    /// Opening the connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum NoughtsError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, not found, not your turn).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A client-side error.
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let noughts_err: NoughtsError = err.into();
        assert!(matches!(noughts_err, NoughtsError::Transport(_)));
        assert!(noughts_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let noughts_err: NoughtsError = err.into();
        assert!(matches!(noughts_err, NoughtsError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let noughts_err: NoughtsError = RoomError::RoomFull("ABC123".into()).into();
        assert!(matches!(noughts_err, NoughtsError::Room(_)));
        assert_eq!(noughts_err.to_string(), "Room ABC123 is full.");
    }

    #[test]
    fn test_rejected_displays_server_message() {
        let err = ClientError::Rejected("Room is full.".into());
        assert_eq!(err.to_string(), "Room is full.");
    }
}
