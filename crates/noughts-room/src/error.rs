//! Error types for the room layer.

use noughts_game::MoveError;
use noughts_transport::ConnectionId;

/// Errors that can occur during room operations.
///
/// The `Display` text is sent to the client verbatim as a `GameError`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No room with this code exists.
    #[error("Room {0} does not exist.")]
    NotFound(String),

    /// A create request named a code that is already in use.
    #[error("Room {0} already exists.")]
    AlreadyExists(String),

    /// Both seats are taken.
    #[error("Room {0} is full.")]
    RoomFull(String),

    /// Room codes must be non-empty.
    #[error("Invalid room id.")]
    InvalidRoomId,

    /// The connection is already seated somewhere.
    #[error("You are already in room {room}.")]
    AlreadyInRoom { conn: ConnectionId, room: String },

    /// The connection is not a member of the room it addressed.
    #[error("You are not in room {1}.")]
    NotInRoom(ConnectionId, String),

    /// A leave request from a connection that is in no room.
    #[error("You are not in a room.")]
    NotSeated,

    /// `StartGame` before both players have joined.
    #[error("Waiting for an opponent to join.")]
    NotEnoughPlayers,

    /// A move or clear before `StartGame`.
    #[error("The game has not started yet.")]
    NotStarted,

    /// `StartGame` for a game that is already running.
    #[error("The game has already started.")]
    AlreadyStarted,

    /// The move claims a symbol that belongs to the other player.
    #[error("You are not playing {0}.")]
    WrongSymbol(noughts_game::Mark),

    /// It is the opponent's turn.
    #[error("It's not your turn.")]
    NotYourTurn,

    /// The move breaks a game rule.
    #[error(transparent)]
    InvalidMove(#[from] MoveError),

    /// The room's command channel is closed.
    #[error("Room {0} is unavailable.")]
    Unavailable(String),
}
