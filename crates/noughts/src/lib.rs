//! # Noughts
//!
//! Tic-tac-toe, classic and ultimate, played locally or online through
//! an authoritative room server.
//!
//! - [`GameController`] is the client: it owns the game state a UI
//!   renders, applies local moves, and mirrors an online room.
//! - [`NoughtsServer`] is the room server: a WebSocket accept loop in
//!   front of [`noughts_room::RoomManager`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use noughts::prelude::*;
//!
//! # async fn run() -> Result<(), NoughtsError> {
//! let server = NoughtsServer::builder().bind("127.0.0.1:8080").build().await?;
//! tokio::spawn(server.run());
//!
//! let mut controller = GameController::with_config(
//!     ClientConfig::new("ws://127.0.0.1:8080"),
//!     |notice: Notice| eprintln!("{notice}"),
//! );
//! controller.connect_player().await?;
//! let code = controller.create_room("Ada", None).await?;
//! println!("share this code: {code}");
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod handler;
mod link;
mod notifier;
mod server;

pub use client::{GameController, LinkStatus};
pub use config::ClientConfig;
pub use error::{ClientError, NoughtsError};
pub use notifier::{Notice, NoticeLevel, Notifier};
pub use server::{NoughtsServer, NoughtsServerBuilder};

pub use noughts_game as game;
pub use noughts_protocol as protocol;
pub use noughts_room as room;
pub use noughts_transport as transport;

/// The types most programs need.
pub mod prelude {
    pub use crate::{
        ClientConfig, ClientError, GameController, LinkStatus, Notice,
        NoticeLevel, Notifier, NoughtsError, NoughtsServer,
    };
    pub use noughts_game::{GameState, Mark, Mode, PlayerSlot};
}
