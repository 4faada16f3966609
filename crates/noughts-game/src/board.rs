//! Marks, cells and the 3×3 board evaluator.
//!
//! The evaluator treats its input as nine opaque cells, so the same
//! function decides the classic board, every ultimate sub-board and the
//! derived macro board.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Mark and Cell
// ---------------------------------------------------------------------------

/// A player's symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// Returns the other player's mark.
    pub fn opponent(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::O => write!(f, "O"),
        }
    }
}

/// The content of a non-empty board slot.
///
/// `D` only appears on the macro board in ultimate mode, where it marks a
/// sub-board that ended in a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    X,
    O,
    D,
}

impl Cell {
    /// Returns the mark in this cell, or `None` for a drawn placeholder.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Self::X => Some(Mark::X),
            Self::O => Some(Mark::O),
            Self::D => None,
        }
    }
}

impl From<Mark> for Cell {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Self::X,
            Mark::O => Self::O,
        }
    }
}

/// Nine slots in row-major order. `None` is an empty slot.
pub type Board = [Option<Cell>; 9];

/// An empty board.
pub const EMPTY_BOARD: Board = [None; 9];

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// The eight winning lines: three rows, three columns, two diagonals.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Result of evaluating a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Three equal marks on `line`.
    Win { winner: Mark, line: [usize; 3] },
    /// Every slot filled and no line completed.
    Draw,
    /// Neither won nor full.
    Continue,
}

impl Evaluation {
    /// Returns `true` for `Win` and `Draw`.
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// Evaluates a 9-cell board.
///
/// A line wins when all three cells hold the same mark. Drawn placeholders
/// (`D`) never take part in a win, even when three of them line up.
pub fn evaluate(board: &Board) -> Evaluation {
    for line in LINES {
        let [a, b, c] = line;
        if let Some(winner) = board[a].and_then(Cell::mark) {
            if board[b] == board[a] && board[c] == board[a] {
                return Evaluation::Win { winner, line };
            }
        }
    }

    if board.iter().all(Option::is_some) {
        Evaluation::Draw
    } else {
        Evaluation::Continue
    }
}
