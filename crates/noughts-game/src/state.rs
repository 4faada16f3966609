//! The game state aggregate and partial snapshots of it.
//!
//! Field names serialize in camelCase because the same structures travel
//! to and from the room server as snapshots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::board::{Board, EMPTY_BOARD, Mark};
use crate::MoveError;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Which variant of the game is being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// A single 3×3 board.
    #[default]
    Classic,
    /// Nine 3×3 sub-boards arranged on a 3×3 macro board.
    Ultimate,
}

impl FromStr for Mode {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(Self::Classic),
            "ultimate" => Ok(Self::Ultimate),
            other => Err(MoveError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classic => write!(f, "classic"),
            Self::Ultimate => write!(f, "ultimate"),
        }
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// A player's display name and running score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub score: u32,
}

impl Player {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            score: 0,
        }
    }
}

/// Selects one of the two player records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerSlot {
    #[serde(rename = "playerX")]
    X,
    #[serde(rename = "playerO")]
    O,
}

impl From<Mark> for PlayerSlot {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Self::X,
            Mark::O => Self::O,
        }
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The single mutable aggregate behind one game screen.
///
/// Mutated only through [`reduce`](crate::reduce), either by local
/// actions or by server snapshots applied as
/// [`Action::UpdateState`](crate::Action::UpdateState).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub mode: Mode,
    /// The classic board, or in ultimate mode the macro board of decided
    /// sub-boards (`D` for a drawn sub-board).
    pub classic_board: Board,
    pub ultimate_board: [Board; 9],
    pub is_x_next: bool,
    pub is_game_over: bool,
    pub is_draw: bool,
    /// Display name of the winner.
    pub winner: Option<String>,
    pub win_indexes: Option<[usize; 3]>,
    /// Ultimate mode only: the sub-board the next move must target.
    pub active_index: Option<usize>,
    pub draw_score: u32,
    pub player_x: Player,
    pub player_o: Player,

    // -- Online play --
    pub is_playing_online: bool,
    pub player_symbol: Option<Mark>,
    pub room_id: Option<String>,
    pub room_name: Option<String>,
    pub game_started: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            mode: Mode::Classic,
            classic_board: EMPTY_BOARD,
            ultimate_board: [EMPTY_BOARD; 9],
            is_x_next: true,
            is_game_over: false,
            is_draw: false,
            winner: None,
            win_indexes: None,
            active_index: None,
            draw_score: 0,
            player_x: Player::named("Player X"),
            player_o: Player::named("Player O"),
            is_playing_online: false,
            player_symbol: None,
            room_id: None,
            room_name: None,
            game_started: false,
        }
    }
}

impl GameState {
    /// The mark that plays next.
    pub fn current_mark(&self) -> Mark {
        if self.is_x_next { Mark::X } else { Mark::O }
    }

    /// Returns the record for one player.
    pub fn player(&self, slot: PlayerSlot) -> &Player {
        match slot {
            PlayerSlot::X => &self.player_x,
            PlayerSlot::O => &self.player_o,
        }
    }

    pub(crate) fn player_mut(&mut self, slot: PlayerSlot) -> &mut Player {
        match slot {
            PlayerSlot::X => &mut self.player_x,
            PlayerSlot::O => &mut self.player_o,
        }
    }

    /// Returns `true` when it is this client's turn in an online game.
    ///
    /// Offline, or before a symbol is assigned, this is always `false`.
    pub fn is_my_turn(&self) -> bool {
        self.player_symbol
            .is_some_and(|symbol| self.current_mark() == symbol)
    }

    /// A fresh game that keeps the room, the players and the running
    /// scores. Shared by `SetMode` and `ClearBoard`.
    pub(crate) fn next_round(&self) -> Self {
        Self {
            mode: self.mode,
            room_id: self.room_id.clone(),
            room_name: self.room_name.clone(),
            player_symbol: self.player_symbol,
            is_playing_online: self.is_playing_online,
            game_started: self.game_started,
            draw_score: self.draw_score,
            player_x: self.player_x.clone(),
            player_o: self.player_o.clone(),
            ..Self::default()
        }
    }

    /// Shallow-merges a partial snapshot into this state.
    ///
    /// Fields absent from the patch are left untouched; fields present
    /// (including explicit nulls) overwrite.
    pub fn merge(&mut self, patch: StatePatch) {
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = patch.$field {
                    self.$field = value;
                })*
            };
        }
        apply!(
            mode,
            classic_board,
            ultimate_board,
            is_x_next,
            is_game_over,
            is_draw,
            winner,
            win_indexes,
            active_index,
            draw_score,
            player_x,
            player_o,
            is_playing_online,
            player_symbol,
            room_id,
            room_name,
            game_started,
        );
    }
}

// ---------------------------------------------------------------------------
// StatePatch
// ---------------------------------------------------------------------------

/// Deserializes a present field (even `null`) as `Some(..)`, so that a
/// missing field stays `None` through `#[serde(default)]`.
fn present<'de, T, D>(de: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(de).map(Some)
}

/// A partial [`GameState`]. `None` means "leave as is".
///
/// Nullable state fields are doubly optional: `Some(None)` sets the field
/// to null, `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classic_board: Option<Board>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ultimate_board: Option<[Board; 9]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_x_next: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_game_over: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_draw: Option<bool>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub winner: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub win_indexes: Option<Option<[usize; 3]>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub active_index: Option<Option<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_x: Option<Player>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_o: Option<Player>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_playing_online: Option<bool>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub player_symbol: Option<Option<Mark>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub room_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub room_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_started: Option<bool>,
}

impl StatePatch {
    /// The board, turn, result and score fields: everything a move or a
    /// clear can change. Room and per-client fields are left out.
    pub fn game_fields(state: &GameState) -> Self {
        Self {
            mode: Some(state.mode),
            classic_board: Some(state.classic_board),
            ultimate_board: Some(state.ultimate_board),
            is_x_next: Some(state.is_x_next),
            is_game_over: Some(state.is_game_over),
            is_draw: Some(state.is_draw),
            winner: Some(state.winner.clone()),
            win_indexes: Some(state.win_indexes),
            active_index: Some(state.active_index),
            draw_score: Some(state.draw_score),
            player_x: Some(state.player_x.clone()),
            player_o: Some(state.player_o.clone()),
            game_started: Some(state.game_started),
            ..Self::default()
        }
    }
}

impl From<GameState> for StatePatch {
    fn from(state: GameState) -> Self {
        Self {
            mode: Some(state.mode),
            classic_board: Some(state.classic_board),
            ultimate_board: Some(state.ultimate_board),
            is_x_next: Some(state.is_x_next),
            is_game_over: Some(state.is_game_over),
            is_draw: Some(state.is_draw),
            winner: Some(state.winner),
            win_indexes: Some(state.win_indexes),
            active_index: Some(state.active_index),
            draw_score: Some(state.draw_score),
            player_x: Some(state.player_x),
            player_o: Some(state.player_o),
            is_playing_online: Some(state.is_playing_online),
            player_symbol: Some(state.player_symbol),
            room_id: Some(state.room_id),
            room_name: Some(state.room_name),
            game_started: Some(state.game_started),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;

    #[test]
    fn test_default_state() {
        let state = GameState::default();
        assert_eq!(state.mode, Mode::Classic);
        assert!(state.is_x_next);
        assert!(!state.is_game_over);
        assert_eq!(state.player_x.score, 0);
        assert_eq!(state.player_o.name, "Player O");
        assert!(state.classic_board.iter().all(Option::is_none));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("classic".parse::<Mode>().unwrap(), Mode::Classic);
        assert_eq!("ultimate".parse::<Mode>().unwrap(), Mode::Ultimate);
        assert!(matches!(
            "hyper".parse::<Mode>(),
            Err(MoveError::InvalidMode(m)) if m == "hyper"
        ));
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let json = serde_json::to_value(GameState::default()).unwrap();
        assert_eq!(json["isXNext"], true);
        assert_eq!(json["mode"], "classic");
        assert!(json["winIndexes"].is_null());
        assert_eq!(json["playerX"]["name"], "Player X");
        assert_eq!(json["classicBoard"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn test_player_slot_serializes_as_field_name() {
        assert_eq!(
            serde_json::to_string(&PlayerSlot::O).unwrap(),
            "\"playerO\""
        );
    }

    #[test]
    fn test_patch_missing_fields_leave_state_untouched() {
        let mut state = GameState::default();
        state.room_id = Some("ABC123".into());
        let patch: StatePatch =
            serde_json::from_str(r#"{"isXNext": false}"#).unwrap();
        state.merge(patch);
        assert!(!state.is_x_next);
        assert_eq!(state.room_id.as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_patch_explicit_null_clears_field() {
        let mut state = GameState::default();
        state.winner = Some("Player X".into());
        let patch: StatePatch =
            serde_json::from_str(r#"{"winner": null}"#).unwrap();
        assert_eq!(patch.winner, Some(None));
        state.merge(patch);
        assert_eq!(state.winner, None);
    }

    #[test]
    fn test_full_patch_reproduces_state() {
        let mut source = GameState::default();
        source.mode = Mode::Ultimate;
        source.classic_board[4] = Some(Cell::D);
        source.ultimate_board[2][4] = Some(Cell::X);
        source.active_index = Some(4);
        source.player_symbol = Some(Mark::O);
        source.player_o.score = 3;

        let mut target = GameState::default();
        target.merge(StatePatch::from(source.clone()));
        assert_eq!(target, source);
    }

    #[test]
    fn test_empty_patch_serializes_to_empty_object() {
        let json = serde_json::to_string(&StatePatch::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_is_my_turn() {
        let mut state = GameState::default();
        assert!(!state.is_my_turn());
        state.player_symbol = Some(Mark::X);
        assert!(state.is_my_turn());
        state.is_x_next = false;
        assert!(!state.is_my_turn());
    }
}
