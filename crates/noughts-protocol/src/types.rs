//! Every type that travels on the wire between a client and the room
//! server.
//!
//! Events are internally tagged (`{"type": "JoinRoom", ...}`) so the
//! browser client can switch on a single string field.

use noughts_game::{GameState, Mark, Mode, StatePatch};
use noughts_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who a server event is addressed to, relative to a room's members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every member of the room.
    All,
    /// One connection.
    Player(ConnectionId),
    /// Everyone except one connection (e.g. "your opponent left").
    AllExcept(ConnectionId),
}

impl Recipient {
    /// Returns `true` if `conn` should receive a message sent to `self`.
    pub fn includes(&self, conn: ConnectionId) -> bool {
        match self {
            Self::All => true,
            Self::Player(target) => *target == conn,
            Self::AllExcept(excluded) => *excluded != conn,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Events a client sends to the room server.
///
/// Each carries only what the server needs to act on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Ask for a fresh room code. Answered directly with
    /// [`ServerEvent::RoomIdIssued`] carrying the same `request_id`.
    RequestRoomId { request_id: u64 },

    /// Enter a room, creating it when `is_create_room` is set. `mode`
    /// only matters to the creator; joiners play whatever the room plays.
    JoinRoom {
        room_id: String,
        player_name: String,
        room_name: Option<String>,
        is_create_room: bool,
        #[serde(default)]
        mode: Mode,
    },

    /// Begin play once both seats are taken.
    StartGame { room_id: String },

    /// Place a mark. `cell_index` is only present in ultimate mode.
    MakeMove {
        room_id: String,
        player_symbol: Mark,
        macro_index: usize,
        cell_index: Option<usize>,
    },

    /// Start the next round in the same room.
    ClearBoard { room_id: String },

    /// Leave the room.
    LeaveRoom { room_id: String },
}

impl ClientEvent {
    /// The room this event targets, if any.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::RequestRoomId { .. } => None,
            Self::JoinRoom { room_id, .. }
            | Self::StartGame { room_id }
            | Self::MakeMove { room_id, .. }
            | Self::ClearBoard { room_id }
            | Self::LeaveRoom { room_id } => Some(room_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Events the room server pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Answer to [`ClientEvent::RequestRoomId`].
    RoomIdIssued {
        request_id: u64,
        success: bool,
        room_id: Option<String>,
        message: Option<String>,
    },

    /// Both players are in and play begins. `state` is the full room
    /// snapshot for the receiving player.
    GameStarted { revision: u64, state: StatePatch },

    /// Some part of the room changed: a move, a clear, a join, a rename.
    GameUpdated { revision: u64, state: StatePatch },

    /// The server refused a request. State is unchanged.
    GameError { message: String },

    /// The receiving player is no longer in the room.
    RoomLeft { message: String },

    /// The other player left the room.
    PlayerLeft { player_name: String },
}

impl ServerEvent {
    /// A full snapshot of `state` as a `GameStarted` event.
    pub fn started(revision: u64, state: GameState) -> Self {
        Self::GameStarted {
            revision,
            state: state.into(),
        }
    }

    /// Shorthand for a `GameError`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::GameError {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// What an envelope carries, tagged by direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    Client(ClientEvent),
    Server(ServerEvent),
}

/// The top-level frame. Every message on the wire is an `Envelope`.
///
/// `seq` is per sender and per connection, starting at 1. It orders frames
/// for debugging only; snapshot ordering uses each event's `revision`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub seq: u64,
    /// Milliseconds since the sender's connection started.
    #[serde(default)]
    pub timestamp: u64,
    pub payload: Payload,
}

impl Envelope {
    /// Unwraps a frame received by the server.
    ///
    /// # Errors
    /// `ProtocolError::InvalidMessage` if the frame carries a server event.
    pub fn into_client(self) -> Result<ClientEvent, ProtocolError> {
        match self.payload {
            Payload::Client(event) => Ok(event),
            Payload::Server(_) => Err(ProtocolError::InvalidMessage(
                "server event sent by a client".into(),
            )),
        }
    }

    /// Unwraps a frame received by a client.
    ///
    /// # Errors
    /// `ProtocolError::InvalidMessage` if the frame carries a client event.
    pub fn into_server(self) -> Result<ServerEvent, ProtocolError> {
        match self.payload {
            Payload::Server(event) => Ok(event),
            Payload::Client(_) => Err(ProtocolError::InvalidMessage(
                "client event sent by the server".into(),
            )),
        }
    }
}
