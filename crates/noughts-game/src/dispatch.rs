//! Move validation shared by the local dispatcher, the reducer and the
//! room server.

use serde::{Deserialize, Serialize};

use crate::{GameState, Mode, MoveError};

/// A click on the board.
///
/// In classic mode `macro_index` is the cell and `cell_index` is unused.
/// In ultimate mode `macro_index` selects the sub-board and `cell_index`
/// the cell inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub macro_index: usize,
    pub cell_index: Option<usize>,
}

impl MoveRequest {
    /// A classic-mode move.
    pub fn classic(index: usize) -> Self {
        Self {
            macro_index: index,
            cell_index: None,
        }
    }

    /// An ultimate-mode move.
    pub fn ultimate(macro_index: usize, cell_index: usize) -> Self {
        Self {
            macro_index,
            cell_index: Some(cell_index),
        }
    }
}

/// Checks a move against the current state without changing it.
///
/// Turn order is not checked here: offline both players share one screen,
/// and online the server decides.
pub fn validate_move(
    state: &GameState,
    mv: MoveRequest,
) -> Result<(), MoveError> {
    if state.is_game_over {
        return Err(MoveError::GameOver);
    }
    if mv.macro_index >= 9 {
        return Err(MoveError::OutOfRange(mv.macro_index));
    }

    match state.mode {
        Mode::Classic => {
            if state.classic_board[mv.macro_index].is_some() {
                return Err(MoveError::CellOccupied);
            }
        }
        Mode::Ultimate => {
            let cell = mv.cell_index.ok_or(MoveError::MissingCell)?;
            if cell >= 9 {
                return Err(MoveError::OutOfRange(cell));
            }
            if let Some(expected) = state.active_index {
                if expected != mv.macro_index {
                    return Err(MoveError::InactiveBoard { expected });
                }
            }
            if state.classic_board[mv.macro_index].is_some() {
                return Err(MoveError::BoardDecided);
            }
            if state.ultimate_board[mv.macro_index][cell].is_some() {
                return Err(MoveError::CellOccupied);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;

    fn ultimate() -> GameState {
        GameState {
            mode: Mode::Ultimate,
            ..GameState::default()
        }
    }

    #[test]
    fn test_accepts_empty_classic_cell() {
        assert_eq!(
            validate_move(&GameState::default(), MoveRequest::classic(4)),
            Ok(())
        );
    }

    #[test]
    fn test_rejects_occupied_classic_cell() {
        let mut state = GameState::default();
        state.classic_board[4] = Some(Cell::O);
        assert_eq!(
            validate_move(&state, MoveRequest::classic(4)),
            Err(MoveError::CellOccupied)
        );
    }

    #[test]
    fn test_rejects_after_game_over() {
        let state = GameState {
            is_game_over: true,
            ..GameState::default()
        };
        assert_eq!(
            validate_move(&state, MoveRequest::classic(0)),
            Err(MoveError::GameOver)
        );
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(
            validate_move(&GameState::default(), MoveRequest::classic(9)),
            Err(MoveError::OutOfRange(9))
        );
        assert_eq!(
            validate_move(&ultimate(), MoveRequest::ultimate(0, 12)),
            Err(MoveError::OutOfRange(12))
        );
    }

    #[test]
    fn test_ultimate_requires_cell() {
        assert_eq!(
            validate_move(&ultimate(), MoveRequest::classic(0)),
            Err(MoveError::MissingCell)
        );
    }

    #[test]
    fn test_ultimate_enforces_active_board() {
        let mut state = ultimate();
        state.active_index = Some(4);
        assert_eq!(
            validate_move(&state, MoveRequest::ultimate(2, 0)),
            Err(MoveError::InactiveBoard { expected: 4 })
        );
        assert_eq!(validate_move(&state, MoveRequest::ultimate(4, 0)), Ok(()));
    }

    #[test]
    fn test_ultimate_rejects_decided_board() {
        let mut state = ultimate();
        state.classic_board[3] = Some(Cell::D);
        assert_eq!(
            validate_move(&state, MoveRequest::ultimate(3, 0)),
            Err(MoveError::BoardDecided)
        );
    }

    #[test]
    fn test_inactive_board_message_is_one_based() {
        let err = MoveError::InactiveBoard { expected: 4 };
        assert_eq!(err.to_string(), "You must play in board 5.");
    }
}
