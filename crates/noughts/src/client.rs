//! The online synchronization client.
//!
//! [`GameController`] owns the one `GameState` a UI renders. Offline it
//! validates and applies moves itself. Online it only forwards intent to
//! the room server and applies whatever snapshots come back, so every
//! client in a room converges on the server's state.

use std::fmt;

use noughts_game::{
    Action, GameState, Mode, MoveRequest, PlayerSlot, StatePatch, reduce,
    validate_move,
};
use noughts_protocol::{ClientEvent, JsonCodec, ServerEvent};
use noughts_transport::{Connector, WebSocketConnector};

use crate::link::{Link, LinkCommand, LinkEvent};
use crate::{ClientConfig, ClientError, Notice, Notifier};

/// Where the controller is in the connection lifecycle.
///
/// ```text
/// Disconnected → Connecting → Connected → InRoom → GameStarted ⇄ GameEnded
/// ```
///
/// Leaving a room returns to `Connected`; losing the connection returns
/// to `Disconnected` from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    Connecting,
    Connected,
    InRoom,
    GameStarted,
    GameEnded,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::InRoom => "in-room",
            Self::GameStarted => "game-started",
            Self::GameEnded => "game-ended",
        };
        f.write_str(name)
    }
}

/// The state-and-sync component a UI binds to.
pub struct GameController<N: Notifier> {
    config: ClientConfig,
    notifier: N,
    state: GameState,
    status: LinkStatus,
    link: Option<Link>,
    /// Revision of the newest snapshot applied in the current room.
    last_revision: u64,
}

impl<N: Notifier> GameController<N> {
    /// A controller with default settings.
    pub fn new(notifier: N) -> Self {
        Self::with_config(ClientConfig::default(), notifier)
    }

    pub fn with_config(config: ClientConfig, notifier: N) -> Self {
        Self {
            config,
            notifier,
            state: GameState::default(),
            status: LinkStatus::Disconnected,
            link: None,
            last_revision: 0,
        }
    }

    /// The current game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn dispatch(&mut self, action: Action) {
        self.state = reduce(&self.state, action);
    }

    fn error(&self, message: impl Into<String>) {
        self.notifier.notify(Notice::error(message));
    }

    // -----------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------

    /// Connects to the configured server over WebSocket.
    ///
    /// A no-op when a connection already exists.
    pub async fn connect_player(&mut self) -> Result<(), ClientError> {
        let connector = WebSocketConnector::new(self.config.url.clone());
        self.connect_with(&connector).await
    }

    /// Connects through any [`Connector`].
    ///
    /// A no-op when a connection already exists. There is no automatic
    /// reconnect: after a drop the caller decides when to try again.
    pub async fn connect_with<K: Connector>(
        &mut self,
        connector: &K,
    ) -> Result<(), ClientError> {
        if self.link.is_some() {
            tracing::debug!("already connected, ignoring connect");
            return Ok(());
        }

        self.status = LinkStatus::Connecting;
        match connector.connect().await {
            Ok(conn) => {
                self.link = Some(Link::spawn(conn, JsonCodec, self.config.event_buffer));
                self.last_revision = 0;
                self.dispatch(Action::IsPlayingOnline(true));
                self.refresh_status();
                tracing::info!("connected to room server");
                Ok(())
            }
            Err(e) => {
                self.status = LinkStatus::Disconnected;
                tracing::warn!(error = %e, "connect failed");
                self.error("Could not connect to the game server.");
                Err(e.into())
            }
        }
    }

    /// Closes the connection and resets to the offline default state.
    pub async fn disconnect_player(&mut self) {
        if let Some(link) = self.link.take() {
            link.shutdown(self.config.request_timeout).await;
            tracing::info!("disconnected from room server");
        }
        self.reset_offline();
    }

    fn reset_offline(&mut self) {
        self.state = GameState::default();
        self.last_revision = 0;
        self.status = LinkStatus::Disconnected;
    }

    fn send(&mut self, event: ClientEvent) -> Result<(), ClientError> {
        let Some(link) = &self.link else {
            self.error("You are not connected to the game server.");
            return Err(ClientError::NotConnected);
        };
        if link.send(LinkCommand::Send(event)).is_err() {
            self.error("The connection to the game server was lost.");
            return Err(ClientError::Disconnected);
        }
        Ok(())
    }

    fn room_id(&self) -> Result<String, ClientError> {
        match &self.state.room_id {
            Some(room_id) => Ok(room_id.clone()),
            None => {
                self.error("You are not in a room.");
                Err(ClientError::NotInRoom)
            }
        }
    }

    // -----------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------

    /// Asks the server for a fresh room code, then creates and joins that
    /// room. Returns the code.
    pub async fn create_room(
        &mut self,
        player_name: &str,
        room_name: Option<String>,
    ) -> Result<String, ClientError> {
        let Some(link) = &self.link else {
            self.error("You are not connected to the game server.");
            return Err(ClientError::NotConnected);
        };

        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        if link.send(LinkCommand::RequestRoomId { reply: reply_tx }).is_err() {
            self.error("The connection to the game server was lost.");
            return Err(ClientError::Disconnected);
        }

        let timeout = self.config.request_timeout;
        let reply = match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                self.error("The connection to the game server was lost.");
                return Err(ClientError::Disconnected);
            }
            Err(_) => {
                self.error("The game server did not respond.");
                return Err(ClientError::Timeout(timeout));
            }
        };

        let room_id = match (reply.success, reply.room_id) {
            (true, Some(room_id)) => room_id,
            _ => {
                let message = reply
                    .message
                    .unwrap_or_else(|| "Could not create a room.".to_string());
                self.error(message.clone());
                return Err(ClientError::Rejected(message));
            }
        };

        self.emit_join(&room_id, player_name, room_name, true)?;
        Ok(room_id)
    }

    /// Joins an existing room.
    pub fn join_room(
        &mut self,
        room_id: &str,
        player_name: &str,
        room_name: Option<String>,
    ) -> Result<(), ClientError> {
        self.emit_join(room_id, player_name, room_name, false)
    }

    fn emit_join(
        &mut self,
        room_id: &str,
        player_name: &str,
        room_name: Option<String>,
        is_create_room: bool,
    ) -> Result<(), ClientError> {
        self.send(ClientEvent::JoinRoom {
            room_id: room_id.to_string(),
            player_name: player_name.to_string(),
            room_name,
            is_create_room,
            mode: self.state.mode,
        })?;
        // Revisions are per room.
        self.last_revision = 0;
        Ok(())
    }

    /// Leaves the current room. The reset happens when the server
    /// confirms with `RoomLeft`.
    pub fn leave_room(&mut self) -> Result<(), ClientError> {
        let room_id = self.room_id()?;
        self.send(ClientEvent::LeaveRoom { room_id })
    }

    /// Asks the server to start the game in the current room.
    pub fn start_game(&mut self) -> Result<(), ClientError> {
        let room_id = self.room_id()?;
        self.send(ClientEvent::StartGame { room_id })
    }

    // -----------------------------------------------------------------
    // Play
    // -----------------------------------------------------------------

    /// A click on the board.
    ///
    /// Offline the move is validated and applied here. Online it is sent
    /// to the server unless the local checks already know it will be
    /// refused; nothing changes locally until the server broadcasts the
    /// result. Every refusal produces exactly one error notice.
    pub fn handle_move(&mut self, macro_index: usize, cell_index: Option<usize>) {
        let request = MoveRequest {
            macro_index,
            cell_index,
        };

        if !self.state.is_playing_online {
            match validate_move(&self.state, request) {
                Ok(()) => self.dispatch(Action::HandleMove(request)),
                Err(e) => {
                    tracing::debug!(error = %e, "local move rejected");
                    self.error(e.to_string());
                }
            }
            return;
        }

        let (Some(room_id), Some(symbol)) =
            (self.state.room_id.clone(), self.state.player_symbol)
        else {
            self.error("You are not in a room.");
            return;
        };
        if !self.state.game_started {
            self.error("The game has not started yet.");
            return;
        }
        if !self.state.is_my_turn() {
            self.error("It's not your turn.");
            return;
        }
        if let Err(e) = validate_move(&self.state, request) {
            self.error(e.to_string());
            return;
        }

        if let Err(e) = self.send(ClientEvent::MakeMove {
            room_id,
            player_symbol: symbol,
            macro_index,
            cell_index,
        }) {
            tracing::debug!(error = %e, "move not sent");
        }
    }

    /// Switches between classic and ultimate by name. Unknown names are
    /// logged and ignored. A room keeps the mode it was created with, so
    /// the switch is refused while seated.
    pub fn set_board(&mut self, mode: &str) {
        if self.state.room_id.is_some() {
            self.error("The room's mode can't be changed during an online game.");
            return;
        }
        match mode.parse::<Mode>() {
            Ok(mode) => self.dispatch(Action::SetMode(mode)),
            Err(e) => tracing::warn!(error = %e, "ignoring mode change"),
        }
    }

    pub fn set_player_names(&mut self, player: PlayerSlot, name: impl Into<String>) {
        self.dispatch(Action::SetPlayerName {
            player,
            name: name.into(),
        });
    }

    /// Starts the next round, keeping scores. Online the server does it
    /// for both players.
    pub fn clear_board(&mut self) {
        if self.state.is_playing_online {
            let sent = self
                .room_id()
                .and_then(|room_id| self.send(ClientEvent::ClearBoard { room_id }));
            if let Err(e) = sent {
                tracing::debug!(error = %e, "clear not sent");
            }
        } else {
            self.dispatch(Action::ClearBoard);
        }
    }

    /// Resets everything except the mode, scores included.
    ///
    /// Refused while seated in a room. Connected but outside a room, the
    /// client stays in online mode.
    pub fn start_over(&mut self) {
        if self.state.room_id.is_some() {
            self.error("You can't start over during an online game.");
            return;
        }
        let online = self.state.is_playing_online;
        self.dispatch(Action::StartOver);
        if online {
            self.dispatch(Action::IsPlayingOnline(true));
        }
        self.refresh_status();
    }

    // -----------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------

    /// Waits for the next server event, applies it and returns it.
    ///
    /// Stale snapshots are skipped. Returns `None` when there is no
    /// connection, or once the connection has dropped (the state has
    /// then been reset).
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        loop {
            let event = self.link.as_mut()?.recv().await;
            match event {
                Some(LinkEvent::Server(event)) => {
                    if self.apply(&event) {
                        return Some(event);
                    }
                }
                Some(LinkEvent::Disconnected { reason }) => {
                    self.on_disconnected(reason);
                    return None;
                }
                None => {
                    self.on_disconnected(None);
                    return None;
                }
            }
        }
    }

    /// Applies every event already queued without waiting. Returns how
    /// many were applied.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.link.as_mut().and_then(Link::try_recv) {
            match event {
                LinkEvent::Server(event) => {
                    if self.apply(&event) {
                        applied += 1;
                    }
                }
                LinkEvent::Disconnected { reason } => {
                    self.on_disconnected(reason);
                    break;
                }
            }
        }
        applied
    }

    /// Applies one server event. Returns `false` if it was dropped.
    fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::GameStarted { revision, state } => {
                self.last_revision = self.last_revision.max(*revision);
                self.dispatch(Action::UpdateState(state.clone()));
                self.dispatch(Action::UpdateState(StatePatch {
                    game_started: Some(true),
                    ..StatePatch::default()
                }));
            }
            ServerEvent::GameUpdated { revision, state } => {
                if *revision <= self.last_revision {
                    tracing::debug!(
                        revision,
                        last = self.last_revision,
                        "dropping stale snapshot"
                    );
                    return false;
                }
                self.last_revision = *revision;
                self.dispatch(Action::UpdateState(state.clone()));
            }
            ServerEvent::GameError { message } => {
                self.error(message.clone());
            }
            ServerEvent::RoomLeft { message } => {
                self.notifier.notify(Notice::info(message.clone()));
                self.last_revision = 0;
                self.dispatch(Action::IsPlayingOnline(true));
            }
            ServerEvent::PlayerLeft { player_name } => {
                self.notifier
                    .notify(Notice::info(format!("{player_name} left the room.")));
            }
            ServerEvent::RoomIdIssued { .. } => return false,
        }
        self.refresh_status();
        true
    }

    fn on_disconnected(&mut self, reason: Option<String>) {
        self.link = None;
        self.reset_offline();
        match reason {
            Some(reason) => {
                tracing::warn!(%reason, "connection lost");
                self.error("Disconnected from the game server.");
            }
            None => {
                tracing::info!("server closed the connection");
                self.notifier
                    .notify(Notice::info("Disconnected from the game server."));
            }
        }
    }

    fn refresh_status(&mut self) {
        self.status = if self.link.is_none() {
            LinkStatus::Disconnected
        } else if self.state.room_id.is_none() {
            LinkStatus::Connected
        } else if !self.state.game_started {
            LinkStatus::InRoom
        } else if self.state.is_game_over {
            LinkStatus::GameEnded
        } else {
            LinkStatus::GameStarted
        };
    }
}

impl<N: Notifier> fmt::Debug for GameController<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameController")
            .field("status", &self.status)
            .field("room_id", &self.state.room_id)
            .field("last_revision", &self.last_revision)
            .finish()
    }
}
