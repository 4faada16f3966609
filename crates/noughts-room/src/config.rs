//! Room configuration and state machine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for a room instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Seats per room. The game is two-player, so anything other than 2
    /// only makes sense in tests.
    pub max_players: usize,

    /// Capacity of each room actor's command channel.
    pub channel_size: usize,

    /// How many unused room codes one connection may hold. Requesting
    /// another retires its oldest.
    pub max_pending_codes: usize,
}

impl RoomConfig {
    /// Sets the command channel capacity.
    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size;
        self
    }

    /// Sets how many unused codes a connection may hold, at least one.
    pub fn max_pending_codes(mut self, count: usize) -> Self {
        self.max_pending_codes = count.max(1);
        self
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 2,
            channel_size: 64,
            max_pending_codes: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// WaitingForPlayers → InProgress ⇄ Finished
/// ```
///
/// - **WaitingForPlayers**: fewer than two players, or both seated but
///   nobody has pressed start. A player leaving mid-game returns here.
/// - **InProgress**: moves are accepted.
/// - **Finished**: the round has a winner or is drawn. `ClearBoard`
///   starts the next round and goes back to `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    WaitingForPlayers,
    InProgress,
    Finished,
}

impl RoomState {
    /// Returns `true` if the room may still accept a player.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::WaitingForPlayers)
    }

    /// Returns `true` once `StartGame` has been accepted.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::InProgress | Self::Finished)
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::WaitingForPlayers, Self::InProgress)
                | (Self::InProgress, Self::Finished)
                | (Self::Finished, Self::InProgress)
                | (Self::InProgress, Self::WaitingForPlayers)
                | (Self::Finished, Self::WaitingForPlayers)
        )
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingForPlayers => write!(f, "WaitingForPlayers"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_state_transitions() {
        assert!(RoomState::WaitingForPlayers
            .can_transition_to(RoomState::InProgress));
        assert!(RoomState::InProgress.can_transition_to(RoomState::Finished));
        assert!(RoomState::Finished.can_transition_to(RoomState::InProgress));
        assert!(!RoomState::WaitingForPlayers
            .can_transition_to(RoomState::Finished));
        assert!(!RoomState::Finished.can_transition_to(RoomState::Finished));
    }

    #[test]
    fn test_room_state_is_joinable() {
        assert!(RoomState::WaitingForPlayers.is_joinable());
        assert!(!RoomState::InProgress.is_joinable());
        assert!(!RoomState::Finished.is_joinable());
    }

    #[test]
    fn test_room_state_is_started() {
        assert!(!RoomState::WaitingForPlayers.is_started());
        assert!(RoomState::InProgress.is_started());
        assert!(RoomState::Finished.is_started());
    }

    #[test]
    fn test_room_state_display() {
        assert_eq!(RoomState::WaitingForPlayers.to_string(), "WaitingForPlayers");
        assert_eq!(RoomState::Finished.to_string(), "Finished");
    }

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.max_players, 2);
        assert_eq!(config.channel_size, 64);
        assert_eq!(config.channel_size(8).channel_size, 8);
    }
}
