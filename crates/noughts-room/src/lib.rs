//! Room server logic for Noughts.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! authoritative [`GameState`](noughts_game::GameState) for one match.
//! Players never touch it directly: they send commands, the actor
//! validates them with the same rules the client uses, applies the
//! reducer and broadcasts a revisioned snapshot.
//!
//! # Key types
//!
//! - [`RoomManager`]: issues room codes, creates/destroys rooms, routes
//!   connections
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomState`]: lifecycle state machine
//! - [`RoomConfig`]: room settings

mod config;
mod error;
mod manager;
mod room;

pub use config::{RoomConfig, RoomState};
pub use error::RoomError;
pub use manager::{JoinRequest, ROOM_ID_LEN, RoomManager};
pub use room::{PlayerSender, RoomHandle, RoomInfo};
