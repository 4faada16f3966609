//! The game state machine: one transition function over a closed set of
//! actions.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Cell, Evaluation, evaluate};
use crate::{GameState, Mode, MoveRequest, PlayerSlot, StatePatch, validate_move};

/// Every transition the game state supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Switch mode and start a fresh round. Room, players, scores and the
    /// draw counter are kept.
    SetMode(Mode),

    /// Rename one player. Nothing else changes.
    SetPlayerName { player: PlayerSlot, name: String },

    /// Place the current player's mark.
    HandleMove(MoveRequest),

    /// Reset everything and set the online flag.
    IsPlayingOnline(bool),

    /// Shallow-merge a (server-authoritative) snapshot.
    UpdateState(StatePatch),

    /// Reset everything except the mode. Scores go back to zero.
    StartOver,

    /// Next round: like `SetMode` with the current mode, and a random
    /// player goes first.
    ClearBoard,
}

/// Applies `action` to `state` and returns the new state.
///
/// Uses the thread-local RNG for `ClearBoard`. See [`reduce_with`] to
/// supply your own.
pub fn reduce(state: &GameState, action: Action) -> GameState {
    reduce_with(state, action, &mut rand::rng())
}

/// Applies `action` to `state` using `rng` for any randomness.
///
/// Never panics. An invalid move leaves the state unchanged.
pub fn reduce_with<R: Rng + ?Sized>(
    state: &GameState,
    action: Action,
    rng: &mut R,
) -> GameState {
    match action {
        Action::SetMode(mode) => GameState {
            mode,
            ..state.next_round()
        },

        Action::SetPlayerName { player, name } => {
            let mut next = state.clone();
            next.player_mut(player).name = name;
            next
        }

        Action::HandleMove(mv) => {
            if let Err(reason) = validate_move(state, mv) {
                tracing::debug!(?mv, %reason, "move ignored");
                return state.clone();
            }
            let mut next = state.clone();
            match next.mode {
                Mode::Classic => play_classic(&mut next, mv),
                Mode::Ultimate => play_ultimate(&mut next, mv),
            }
            next
        }

        Action::IsPlayingOnline(flag) => GameState {
            is_playing_online: flag,
            ..GameState::default()
        },

        Action::UpdateState(patch) => {
            let mut next = state.clone();
            next.merge(patch);
            next
        }

        Action::StartOver => GameState {
            mode: state.mode,
            ..GameState::default()
        },

        Action::ClearBoard => GameState {
            is_x_next: rng.random_bool(0.5),
            ..state.next_round()
        },
    }
}

fn play_classic(state: &mut GameState, mv: MoveRequest) {
    let mark = state.current_mark();
    state.classic_board[mv.macro_index] = Some(mark.into());
    let result = evaluate(&state.classic_board);
    state.is_x_next = !state.is_x_next;
    record_result(state, result);
}

fn play_ultimate(state: &mut GameState, mv: MoveRequest) {
    // validate_move has already rejected a missing cell.
    let Some(cell) = mv.cell_index else {
        return;
    };
    let mark = state.current_mark();
    let sub_board = &mut state.ultimate_board[mv.macro_index];
    sub_board[cell] = Some(mark.into());

    match evaluate(sub_board) {
        Evaluation::Win { winner, .. } => {
            state.classic_board[mv.macro_index] = Some(winner.into());
        }
        Evaluation::Draw => {
            state.classic_board[mv.macro_index] = Some(Cell::D);
        }
        Evaluation::Continue => {}
    }

    let result = evaluate(&state.classic_board);
    state.active_index = state.classic_board[cell].is_none().then_some(cell);
    state.is_x_next = !state.is_x_next;
    record_result(state, result);
}

/// Applies the win/draw bookkeeping for an evaluation of the whole game.
fn record_result(state: &mut GameState, result: Evaluation) {
    match result {
        Evaluation::Win { winner, line } => {
            let player = state.player_mut(PlayerSlot::from(winner));
            player.score += 1;
            let name = player.name.clone();
            state.winner = Some(name);
            state.win_indexes = Some(line);
            state.is_game_over = true;
            tracing::debug!(%winner, ?line, "game won");
        }
        Evaluation::Draw => {
            state.draw_score += 1;
            state.is_draw = true;
            state.is_game_over = true;
            tracing::debug!("game drawn");
        }
        Evaluation::Continue => {}
    }
}
