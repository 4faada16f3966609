//! Error types for move validation.

/// Why a move (or mode change) was rejected.
///
/// The `Display` text is shown to the player as-is, so it is phrased for a
/// person, not a log file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// The game already has a winner or ended in a draw.
    #[error("The game is over. Clear the board to play again.")]
    GameOver,

    /// The target cell already holds a mark.
    #[error("That cell is already taken.")]
    CellOccupied,

    /// Ultimate mode: the move is outside the sub-board the player is
    /// constrained to.
    #[error("You must play in board {}.", .expected + 1)]
    InactiveBoard { expected: usize },

    /// Ultimate mode: the target sub-board is already won or drawn.
    #[error("That board is already decided.")]
    BoardDecided,

    /// An index outside `0..9`.
    #[error("Index {0} is off the board.")]
    OutOfRange(usize),

    /// Ultimate mode requires a cell inside the sub-board.
    #[error("Pick a cell inside the board.")]
    MissingCell,

    /// A mode name other than `classic` or `ultimate`.
    #[error("Unknown game mode: {0}")]
    InvalidMode(String),
}
