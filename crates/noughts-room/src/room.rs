//! Room actor: an isolated Tokio task that owns one match.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. No shared mutable state, just message
//! passing: the actor is the only writer of its `GameState`, so commands
//! are applied strictly one after another.

use noughts_game::{
    Action, GameState, Mark, Mode, MoveError, MoveRequest, PlayerSlot,
    StatePatch, reduce, validate_move,
};
use noughts_protocol::{Recipient, ServerEvent};
use noughts_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{RoomConfig, RoomError, RoomState};

/// Channel sender for delivering server events to a player's connection
/// handler.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// Commands sent to a room actor through its channel.
///
/// Every mutating command carries a reply channel; an `Err` reply is the
/// caller's cue to send a `GameError` back to that player only.
pub(crate) enum RoomCommand {
    Join {
        conn: ConnectionId,
        player_name: String,
        sender: PlayerSender,
        reply: Reply<Mark>,
    },
    /// Replies with the number of players still seated.
    Leave {
        conn: ConnectionId,
        reply: Reply<usize>,
    },
    Start {
        conn: ConnectionId,
        reply: Reply<()>,
    },
    Move {
        conn: ConnectionId,
        symbol: Mark,
        request: MoveRequest,
        reply: Reply<()>,
    },
    Clear {
        conn: ConnectionId,
        reply: Reply<()>,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: String,
    pub room_name: Option<String>,
    pub mode: Mode,
    pub state: RoomState,
    pub player_count: usize,
    pub max_players: usize,
    /// Revision of the last snapshot broadcast.
    pub revision: u64,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone; the [`RoomManager`](crate::RoomManager) holds one per
/// room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: String,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's code.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Seats a player. Returns the mark they will play.
    pub async fn join(
        &self,
        conn: ConnectionId,
        player_name: String,
        sender: PlayerSender,
    ) -> Result<Mark, RoomError> {
        self.request(|reply| RoomCommand::Join {
            conn,
            player_name,
            sender,
            reply,
        })
        .await
    }

    /// Removes a player. Returns how many players remain.
    pub async fn leave(&self, conn: ConnectionId) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::Leave { conn, reply }).await
    }

    /// Starts play once both seats are taken.
    pub async fn start_game(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start { conn, reply }).await
    }

    /// Submits a move on behalf of `conn`.
    pub async fn make_move(
        &self,
        conn: ConnectionId,
        symbol: Mark,
        request: MoveRequest,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Move {
            conn,
            symbol,
            request,
            reply,
        })
        .await
    }

    /// Starts the next round, keeping scores.
    pub async fn clear_board(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Clear { conn, reply }).await
    }

    /// Requests the current room info.
    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetInfo { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }
}

struct Member {
    conn: ConnectionId,
    name: String,
    mark: Mark,
    sender: PlayerSender,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: String,
    state: RoomState,
    config: RoomConfig,
    members: Vec<Member>,
    game: GameState,
    /// Bumped before every snapshot leaves the room.
    revision: u64,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    conn,
                    player_name,
                    sender,
                    reply,
                } => {
                    let _ = reply.send(self.handle_join(conn, player_name, sender));
                }
                RoomCommand::Leave { conn, reply } => {
                    let _ = reply.send(self.handle_leave(conn));
                }
                RoomCommand::Start { conn, reply } => {
                    let _ = reply.send(self.handle_start(conn));
                }
                RoomCommand::Move {
                    conn,
                    symbol,
                    request,
                    reply,
                } => {
                    let result = self.handle_move(conn, symbol, request);
                    if let Err(e) = &result {
                        tracing::debug!(
                            room_id = %self.room_id,
                            %conn,
                            error = %e,
                            "move rejected"
                        );
                    }
                    let _ = reply.send(result);
                }
                RoomCommand::Clear { conn, reply } => {
                    let _ = reply.send(self.handle_clear(conn));
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room_id = %self.room_id, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    /// Moves the room to `target`. Staying put is always allowed.
    fn transition(&mut self, target: RoomState) {
        if self.state == target {
            return;
        }
        debug_assert!(
            self.state.can_transition_to(target),
            "room {} cannot go from {} to {}",
            self.room_id,
            self.state,
            target
        );
        tracing::debug!(room_id = %self.room_id, from = %self.state, to = %target, "room state changed");
        self.state = target;
    }

    fn member(&self, conn: ConnectionId) -> Result<&Member, RoomError> {
        self.members
            .iter()
            .find(|m| m.conn == conn)
            .ok_or_else(|| RoomError::NotInRoom(conn, self.room_id.clone()))
    }

    fn handle_join(
        &mut self,
        conn: ConnectionId,
        player_name: String,
        sender: PlayerSender,
    ) -> Result<Mark, RoomError> {
        if self.members.iter().any(|m| m.conn == conn) {
            return Err(RoomError::AlreadyInRoom {
                conn,
                room: self.room_id.clone(),
            });
        }
        if self.members.len() >= self.config.max_players
            || !self.state.is_joinable()
        {
            return Err(RoomError::RoomFull(self.room_id.clone()));
        }

        let mark = if self.members.iter().any(|m| m.mark == Mark::X) {
            Mark::O
        } else {
            Mark::X
        };
        let slot = PlayerSlot::from(mark);
        let name = match player_name.trim() {
            "" => GameState::default().player(slot).name.clone(),
            trimmed => trimmed.to_string(),
        };
        self.game = reduce(
            &self.game,
            Action::SetPlayerName {
                player: slot,
                name: name.clone(),
            },
        );
        self.members.push(Member {
            conn,
            name,
            mark,
            sender,
        });

        tracing::info!(
            room_id = %self.room_id,
            %conn,
            %mark,
            players = self.members.len(),
            "player joined"
        );

        self.broadcast_snapshots(false);
        Ok(mark)
    }

    fn handle_leave(&mut self, conn: ConnectionId) -> Result<usize, RoomError> {
        let index = self
            .members
            .iter()
            .position(|m| m.conn == conn)
            .ok_or_else(|| RoomError::NotInRoom(conn, self.room_id.clone()))?;
        let leaver = self.members.remove(index);
        let _ = leaver.sender.send(ServerEvent::RoomLeft {
            message: format!("You left room {}.", self.room_id),
        });

        tracing::info!(
            room_id = %self.room_id,
            %conn,
            players = self.members.len(),
            "player left"
        );

        if !self.members.is_empty() {
            self.dispatch(vec![(
                Recipient::AllExcept(conn),
                ServerEvent::PlayerLeft {
                    player_name: leaver.name,
                },
            )]);

            // The match is over; the remaining player waits for a new
            // opponent in a fresh game.
            let mut fresh = initial_state(
                &self.room_id,
                self.game.room_name.clone(),
                self.game.mode,
            );
            for member in &self.members {
                let player = match member.mark {
                    Mark::X => &mut fresh.player_x,
                    Mark::O => &mut fresh.player_o,
                };
                player.name = member.name.clone();
            }
            self.game = fresh;
            self.transition(RoomState::WaitingForPlayers);
            self.broadcast_snapshots(false);
        }

        Ok(self.members.len())
    }

    fn handle_start(&mut self, conn: ConnectionId) -> Result<(), RoomError> {
        self.member(conn)?;
        if self.state.is_started() {
            return Err(RoomError::AlreadyStarted);
        }
        if self.members.len() < self.config.max_players {
            return Err(RoomError::NotEnoughPlayers);
        }

        self.game.game_started = true;
        self.transition(RoomState::InProgress);
        tracing::info!(room_id = %self.room_id, "game started");
        self.broadcast_snapshots(true);
        Ok(())
    }

    fn handle_move(
        &mut self,
        conn: ConnectionId,
        symbol: Mark,
        request: MoveRequest,
    ) -> Result<(), RoomError> {
        let mark = self.member(conn)?.mark;
        match self.state {
            RoomState::WaitingForPlayers => return Err(RoomError::NotStarted),
            RoomState::Finished => return Err(MoveError::GameOver.into()),
            RoomState::InProgress => {}
        }
        if symbol != mark {
            return Err(RoomError::WrongSymbol(symbol));
        }
        if self.game.current_mark() != mark {
            return Err(RoomError::NotYourTurn);
        }
        validate_move(&self.game, request)?;

        self.game = reduce(&self.game, Action::HandleMove(request));
        if self.game.is_game_over {
            self.transition(RoomState::Finished);
            tracing::info!(
                room_id = %self.room_id,
                winner = self.game.winner.as_deref().unwrap_or("-"),
                draw = self.game.is_draw,
                "round finished"
            );
        }
        self.broadcast_update();
        Ok(())
    }

    fn handle_clear(&mut self, conn: ConnectionId) -> Result<(), RoomError> {
        self.member(conn)?;
        if !self.state.is_started() {
            return Err(RoomError::NotStarted);
        }
        self.game = reduce(&self.game, Action::ClearBoard);
        self.transition(RoomState::InProgress);
        tracing::debug!(room_id = %self.room_id, "board cleared");
        self.broadcast_update();
        Ok(())
    }

    /// Sends every member the full state, personalised with their own
    /// symbol, as `GameStarted` or `GameUpdated`.
    fn broadcast_snapshots(&mut self, started: bool) {
        self.revision += 1;
        let revision = self.revision;
        let msgs = self
            .members
            .iter()
            .map(|m| {
                let state = GameState {
                    player_symbol: Some(m.mark),
                    ..self.game.clone()
                };
                let event = if started {
                    ServerEvent::started(revision, state)
                } else {
                    ServerEvent::GameUpdated {
                        revision,
                        state: state.into(),
                    }
                };
                (Recipient::Player(m.conn), event)
            })
            .collect();
        self.dispatch(msgs);
    }

    /// Sends the shared game fields to everyone.
    fn broadcast_update(&mut self) {
        self.revision += 1;
        let event = ServerEvent::GameUpdated {
            revision: self.revision,
            state: StatePatch::game_fields(&self.game),
        };
        self.dispatch(vec![(Recipient::All, event)]);
    }

    /// Delivers events to the matching members. A closed receiver means
    /// the player is disconnecting; the event is dropped.
    fn dispatch(&self, msgs: Vec<(Recipient, ServerEvent)>) {
        for (recipient, event) in msgs {
            for member in self.members.iter().filter(|m| recipient.includes(m.conn)) {
                let _ = member.sender.send(event.clone());
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            room_name: self.game.room_name.clone(),
            mode: self.game.mode,
            state: self.state,
            player_count: self.members.len(),
            max_players: self.config.max_players,
            revision: self.revision,
        }
    }
}

fn initial_state(room_id: &str, room_name: Option<String>, mode: Mode) -> GameState {
    GameState {
        mode,
        is_playing_online: true,
        room_id: Some(room_id.to_string()),
        room_name,
        ..GameState::default()
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
pub(crate) fn spawn_room(
    room_id: String,
    room_name: Option<String>,
    mode: Mode,
    config: RoomConfig,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);

    let actor = RoomActor {
        game: initial_state(&room_id, room_name, mode),
        room_id: room_id.clone(),
        state: RoomState::WaitingForPlayers,
        config,
        members: Vec::with_capacity(2),
        revision: 0,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { room_id, sender: tx }
}
