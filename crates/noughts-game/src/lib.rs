//! Game rules for Noughts.
//!
//! Everything here is pure and synchronous: no I/O, no tasks. The same
//! code runs in the client (offline play, advisory checks) and in the
//! room server (authoritative play).
//!
//! - **Board evaluation** ([`evaluate`], [`Evaluation`]): win/draw/continue
//!   for any 9-cell board.
//! - **State** ([`GameState`], [`StatePatch`]): the aggregate and partial
//!   snapshots of it.
//! - **State machine** ([`Action`], [`reduce`]): every transition.
//! - **Validation** ([`validate_move`], [`MoveError`]): why a move is
//!   not allowed.
//!
//! ```text
//! click → validate_move → Action::HandleMove → reduce → new GameState
//! ```

mod board;
mod dispatch;
mod error;
mod reducer;
mod state;

pub use board::{Board, Cell, EMPTY_BOARD, Evaluation, LINES, Mark, evaluate};
pub use dispatch::{MoveRequest, validate_move};
pub use error::MoveError;
pub use reducer::{Action, reduce, reduce_with};
pub use state::{GameState, Mode, Player, PlayerSlot, StatePatch};
