//! Per-connection handler: decodes client events, routes them to the
//! room manager, and forwards room broadcasts back out.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The loop multiplexes two sources with `tokio::select!`:
//!   1. frames from the socket → `ClientEvent` → room manager
//!   2. events pushed by the player's room actor → socket

use std::sync::Arc;
use std::time::Instant;

use noughts_game::MoveRequest;
use noughts_protocol::{ClientEvent, Codec, Envelope, Payload, ServerEvent};
use noughts_room::{JoinRequest, PlayerSender, RoomError};
use noughts_transport::{Connection, ConnectionId};
use tokio::sync::mpsc;

use crate::NoughtsError;
use crate::server::ServerState;

/// Drop guard that takes the player out of their room and forgets any
/// room codes it was issued when the handler exits, however it exits.
///
/// `Drop` is synchronous, so the async leave runs in a spawned task.
struct RoomGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for RoomGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut rooms = state.rooms.lock().await;
            rooms.release_codes(conn_id);
            match rooms.leave_room(conn_id).await {
                Ok(room_id) => {
                    tracing::info!(%conn_id, %room_id, "dropped connection left room");
                }
                Err(RoomError::NotSeated) => {}
                Err(e) => tracing::debug!(%conn_id, error = %e, "leave on drop failed"),
            }
        });
    }
}

/// Numbers and timestamps outgoing envelopes for one connection.
struct Outbox {
    seq: u64,
    start: Instant,
}

impl Outbox {
    fn new() -> Self {
        Self {
            seq: 1,
            start: Instant::now(),
        }
    }

    async fn send<K: Connection>(
        &mut self,
        conn: &K,
        codec: &impl Codec,
        event: ServerEvent,
    ) -> Result<(), NoughtsError> {
        let timestamp = self.start.elapsed().as_millis() as u64;
        let bytes = codec.encode_envelope(self.seq, timestamp, Payload::Server(event))?;
        self.seq += 1;
        conn.send(&bytes).await?;
        Ok(())
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<K, C>(
    conn: K,
    state: Arc<ServerState<C>>,
) -> Result<(), NoughtsError>
where
    K: Connection,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::info!(%conn_id, "client connected");

    let (room_tx, mut room_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let _guard = RoomGuard {
        conn_id,
        state: Arc::clone(&state),
    };
    let mut outbox = Outbox::new();

    loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) if e.is_disconnect() => {
                        tracing::debug!(%conn_id, error = %e, "connection dropped");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };

                let envelope: Envelope = match state.codec.decode(&data) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                        outbox
                            .send(&conn, &state.codec, ServerEvent::error("Malformed message."))
                            .await?;
                        continue;
                    }
                };

                let event = match envelope.into_client() {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "ignoring frame");
                        continue;
                    }
                };

                if let Some(reply) =
                    handle_client_event(&state, conn_id, event, &room_tx).await
                {
                    outbox.send(&conn, &state.codec, reply).await?;
                }
            }

            Some(event) = room_rx.recv() => {
                outbox.send(&conn, &state.codec, event).await?;
            }
        }
    }

    // _guard drops here → the room is left.
    Ok(())
}

/// Applies one client event. Returns the direct reply for the sender, if
/// any; room broadcasts arrive through `room_tx` instead.
async fn handle_client_event<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    event: ClientEvent,
    room_tx: &PlayerSender,
) -> Option<ServerEvent> {
    tracing::debug!(
        %conn_id,
        room_id = event.room_id().unwrap_or("-"),
        ?event,
        "client event"
    );

    let result = match event {
        ClientEvent::RequestRoomId { request_id } => {
            let room_id = state.rooms.lock().await.issue_room_id(conn_id);
            return Some(ServerEvent::RoomIdIssued {
                request_id,
                success: true,
                room_id: Some(room_id),
                message: None,
            });
        }

        ClientEvent::JoinRoom {
            room_id,
            player_name,
            room_name,
            is_create_room,
            mode,
        } => {
            let request = JoinRequest {
                room_id,
                player_name,
                room_name,
                mode,
                is_create_room,
            };
            let mut rooms = state.rooms.lock().await;
            rooms
                .join_room(conn_id, request, room_tx.clone())
                .await
                .map(|mark| {
                    tracing::info!(%conn_id, %mark, "seated");
                })
        }

        ClientEvent::StartGame { room_id } => {
            state.rooms.lock().await.start_game(conn_id, &room_id).await
        }

        ClientEvent::MakeMove {
            room_id,
            player_symbol,
            macro_index,
            cell_index,
        } => {
            let request = MoveRequest {
                macro_index,
                cell_index,
            };
            state
                .rooms
                .lock()
                .await
                .make_move(conn_id, &room_id, player_symbol, request)
                .await
        }

        ClientEvent::ClearBoard { room_id } => {
            state.rooms.lock().await.clear_board(conn_id, &room_id).await
        }

        ClientEvent::LeaveRoom { room_id } => {
            let mut rooms = state.rooms.lock().await;
            if rooms.player_room(conn_id) == Some(room_id.as_str()) {
                rooms.leave_room(conn_id).await.map(|_| ())
            } else {
                Err(RoomError::NotInRoom(conn_id, room_id))
            }
        }
    };

    match result {
        Ok(()) => None,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "request refused");
            Some(ServerEvent::error(e.to_string()))
        }
    }
}
