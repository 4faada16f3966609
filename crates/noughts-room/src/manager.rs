//! Room manager: issues codes, creates rooms, and routes connections to
//! them.

use std::collections::{HashMap, VecDeque};

use noughts_game::{Mark, Mode, MoveRequest};
use noughts_transport::ConnectionId;
use rand::Rng;

use crate::room::spawn_room;
use crate::{PlayerSender, RoomConfig, RoomError, RoomHandle, RoomInfo};

/// Length of a room code.
pub const ROOM_ID_LEN: usize = 6;

/// Uppercase letters and digits without the easily confused `I`, `O`,
/// `0` and `1`.
const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Everything a `JoinRoom` request carries.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub room_id: String,
    pub player_name: String,
    pub room_name: Option<String>,
    pub mode: Mode,
    pub is_create_room: bool,
}

/// Manages all active rooms and tracks which connection is in which room.
///
/// This is the entry point for room operations from the connection
/// handlers.
pub struct RoomManager {
    config: RoomConfig,

    /// Active rooms, keyed by room code.
    rooms: HashMap<String, RoomHandle>,

    /// Maps each connection to the room it is seated in.
    /// A connection is in at most ONE room at a time.
    conn_rooms: HashMap<ConnectionId, String>,

    /// Codes handed out by `issue_room_id` and not yet used to create a
    /// room, with the connection that asked for each.
    issued: HashMap<String, ConnectionId>,

    /// Each connection's unused codes, oldest first.
    pending: HashMap<ConnectionId, VecDeque<String>>,
}

impl RoomManager {
    /// Creates a new, empty room manager.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            rooms: HashMap::new(),
            conn_rooms: HashMap::new(),
            issued: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Hands `conn` a fresh room code that no live room or outstanding
    /// request is using.
    ///
    /// A connection holds at most `max_pending_codes` unused codes; past
    /// that its oldest code is retired.
    pub fn issue_room_id(&mut self, conn: ConnectionId) -> String {
        self.issue_room_id_with(conn, &mut rand::rng())
    }

    /// [`issue_room_id`](Self::issue_room_id) with a caller-supplied RNG.
    pub fn issue_room_id_with<R: Rng + ?Sized>(
        &mut self,
        conn: ConnectionId,
        rng: &mut R,
    ) -> String {
        let id = loop {
            let id: String = (0..ROOM_ID_LEN)
                .map(|_| {
                    ROOM_ID_ALPHABET[rng.random_range(0..ROOM_ID_ALPHABET.len())]
                        as char
                })
                .collect();
            if !self.rooms.contains_key(&id) && !self.issued.contains_key(&id) {
                break id;
            }
        };

        self.issued.insert(id.clone(), conn);
        let codes = self.pending.entry(conn).or_default();
        codes.push_back(id.clone());
        if codes.len() > self.config.max_pending_codes {
            if let Some(retired) = codes.pop_front() {
                self.issued.remove(&retired);
                tracing::debug!(%conn, room_id = %retired, "unused room id retired");
            }
        }

        tracing::debug!(%conn, room_id = %id, "room id issued");
        id
    }

    /// Forgets every unused code `conn` was given. Called when the
    /// connection goes away.
    pub fn release_codes(&mut self, conn: ConnectionId) {
        if let Some(codes) = self.pending.remove(&conn) {
            for code in &codes {
                self.issued.remove(code);
            }
            tracing::debug!(%conn, count = codes.len(), "unused room ids released");
        }
    }

    /// Number of codes issued and not yet used or released.
    pub fn pending_code_count(&self) -> usize {
        self.issued.len()
    }

    /// Marks `room_id` as used, whoever it was issued to.
    fn consume_code(&mut self, room_id: &str) {
        let Some(owner) = self.issued.remove(room_id) else {
            return;
        };
        if let Some(codes) = self.pending.get_mut(&owner) {
            codes.retain(|code| code != room_id);
            if codes.is_empty() {
                self.pending.remove(&owner);
            }
        }
    }

    /// Seats `conn` in a room, creating the room first when the request
    /// asks for it. Returns the mark the player was given.
    ///
    /// Enforces the "one room at a time" invariant.
    pub async fn join_room(
        &mut self,
        conn: ConnectionId,
        request: JoinRequest,
        sender: PlayerSender,
    ) -> Result<Mark, RoomError> {
        if let Some(current) = self.conn_rooms.get(&conn) {
            return Err(RoomError::AlreadyInRoom {
                conn,
                room: current.clone(),
            });
        }
        let room_id = request.room_id.trim().to_string();
        if room_id.is_empty() {
            return Err(RoomError::InvalidRoomId);
        }

        let created = if request.is_create_room {
            if self.rooms.contains_key(&room_id) {
                return Err(RoomError::AlreadyExists(room_id));
            }
            self.consume_code(&room_id);
            let handle = spawn_room(
                room_id.clone(),
                request.room_name.clone(),
                request.mode,
                self.config.clone(),
            );
            self.rooms.insert(room_id.clone(), handle);
            tracing::info!(%room_id, mode = %request.mode, "room created");
            true
        } else {
            false
        };

        let handle = self
            .rooms
            .get(&room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        match handle.join(conn, request.player_name, sender).await {
            Ok(mark) => {
                self.conn_rooms.insert(conn, room_id);
                Ok(mark)
            }
            Err(e) => {
                if created {
                    self.remove_room(&room_id).await;
                }
                Err(e)
            }
        }
    }

    /// Removes `conn` from its room and returns the room's code. The room
    /// is destroyed once nobody is left in it.
    pub async fn leave_room(
        &mut self,
        conn: ConnectionId,
    ) -> Result<String, RoomError> {
        let room_id = self
            .conn_rooms
            .remove(&conn)
            .ok_or(RoomError::NotSeated)?;

        let remaining = match self.rooms.get(&room_id) {
            Some(handle) => handle.leave(conn).await.unwrap_or_else(|e| {
                tracing::warn!(%room_id, %conn, error = %e, "leave failed");
                0
            }),
            None => 0,
        };
        if remaining == 0 {
            self.remove_room(&room_id).await;
        }
        Ok(room_id)
    }

    /// Looks up the room `conn` addressed, checking that it is seated
    /// there.
    fn seated_in(
        &self,
        conn: ConnectionId,
        room_id: &str,
    ) -> Result<&RoomHandle, RoomError> {
        if self.conn_rooms.get(&conn).map(String::as_str) != Some(room_id) {
            return Err(RoomError::NotInRoom(conn, room_id.to_string()));
        }
        self.rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.to_string()))
    }

    /// Starts the game in `room_id` on behalf of `conn`.
    pub async fn start_game(
        &self,
        conn: ConnectionId,
        room_id: &str,
    ) -> Result<(), RoomError> {
        self.seated_in(conn, room_id)?.start_game(conn).await
    }

    /// Routes a move from `conn` to its room.
    pub async fn make_move(
        &self,
        conn: ConnectionId,
        room_id: &str,
        symbol: Mark,
        request: MoveRequest,
    ) -> Result<(), RoomError> {
        self.seated_in(conn, room_id)?
            .make_move(conn, symbol, request)
            .await
    }

    /// Starts the next round in `room_id`.
    pub async fn clear_board(
        &self,
        conn: ConnectionId,
        room_id: &str,
    ) -> Result<(), RoomError> {
        self.seated_in(conn, room_id)?.clear_board(conn).await
    }

    /// Returns info about a specific room.
    pub async fn get_room_info(
        &self,
        room_id: &str,
    ) -> Result<RoomInfo, RoomError> {
        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.to_string()))?;
        handle.get_info().await
    }

    async fn remove_room(&mut self, room_id: &str) {
        if let Some(handle) = self.rooms.remove(room_id) {
            let _ = handle.shutdown().await;
            self.conn_rooms.retain(|_, rid| rid != room_id);
            tracing::info!(%room_id, "room removed");
        }
    }

    /// Returns the room code `conn` is currently in, if any.
    pub fn player_room(&self, conn: ConnectionId) -> Option<&str> {
        self.conn_rooms.get(&conn).map(String::as_str)
    }

    /// Returns the number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Lists all active room codes.
    pub fn room_ids(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
