//! The client's background connection task.
//!
//! One task per connection multiplexes outgoing commands and incoming
//! frames with `tokio::select!`. The controller talks to it through two
//! channels and never touches the socket itself.
//!
//! Server events wait in a local backlog until the controller's queue has
//! room, so a controller that is slow to drain never holds up outgoing
//! commands or room code replies.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use noughts_protocol::{ClientEvent, Codec, Envelope, Payload, ServerEvent};
use noughts_transport::Connection;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// The server's answer to a room code request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RoomIdReply {
    pub success: bool,
    pub room_id: Option<String>,
    pub message: Option<String>,
}

pub(crate) enum LinkCommand {
    Send(ClientEvent),
    RequestRoomId { reply: oneshot::Sender<RoomIdReply> },
    Close,
}

#[derive(Debug)]
pub(crate) enum LinkEvent {
    Server(ServerEvent),
    /// The connection is gone. `reason` is `None` for a clean close.
    Disconnected { reason: Option<String> },
}

/// Owner's handle on a running link task. Dropping it aborts the task,
/// which closes the socket.
pub(crate) struct Link {
    commands: mpsc::UnboundedSender<LinkCommand>,
    events: mpsc::Receiver<LinkEvent>,
    task: Option<JoinHandle<()>>,
}

impl Link {
    /// Starts the task for an already open connection.
    pub(crate) fn spawn<K, C>(conn: K, codec: C, event_buffer: usize) -> Self
    where
        K: Connection,
        C: Codec,
    {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(event_buffer);
        let task = tokio::spawn(run(conn, codec, cmd_rx, event_tx));
        Self {
            commands: cmd_tx,
            events: event_rx,
            task: Some(task),
        }
    }

    /// Queues a command. Fails once the task has exited.
    pub(crate) fn send(&self, command: LinkCommand) -> Result<(), LinkCommand> {
        self.commands.send(command).map_err(|e| e.0)
    }

    pub(crate) async fn recv(&mut self) -> Option<LinkEvent> {
        self.events.recv().await
    }

    pub(crate) fn try_recv(&mut self) -> Option<LinkEvent> {
        self.events.try_recv().ok()
    }

    /// Asks the task to close the connection and waits up to `timeout`
    /// for it to finish, aborting it otherwise.
    pub(crate) async fn shutdown(mut self, timeout: Duration) {
        let _ = self.commands.send(LinkCommand::Close);
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(timeout, &mut task).await.is_err() {
                tracing::warn!("link task did not exit in time; aborting");
                task.abort();
            }
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run<K, C>(
    conn: K,
    codec: C,
    mut commands: mpsc::UnboundedReceiver<LinkCommand>,
    events: mpsc::Sender<LinkEvent>,
) where
    K: Connection,
    C: Codec,
{
    let conn_id = conn.id();
    let start = Instant::now();
    let mut seq: u64 = 1;
    let mut next_request_id: u64 = 1;
    let mut pending: HashMap<u64, oneshot::Sender<RoomIdReply>> = HashMap::new();
    let mut backlog: VecDeque<ServerEvent> = VecDeque::new();

    tracing::debug!(%conn_id, "link task started");

    let reason = loop {
        tokio::select! {
            cmd = commands.recv() => {
                let event = match cmd {
                    Some(LinkCommand::Send(event)) => event,
                    Some(LinkCommand::RequestRoomId { reply }) => {
                        let request_id = next_request_id;
                        next_request_id += 1;
                        pending.insert(request_id, reply);
                        ClientEvent::RequestRoomId { request_id }
                    }
                    Some(LinkCommand::Close) | None => {
                        let _ = conn.close().await;
                        tracing::debug!(%conn_id, "link task closed by owner");
                        return;
                    }
                };

                let timestamp = start.elapsed().as_millis() as u64;
                let bytes = match codec.encode_envelope(seq, timestamp, Payload::Client(event)) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!(%conn_id, error = %e, "failed to encode event");
                        continue;
                    }
                };
                seq += 1;
                if let Err(e) = conn.send(&bytes).await {
                    break Some(e.to_string());
                }
            }

            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => break None,
                    Err(e) => break Some(e.to_string()),
                };
                let envelope: Envelope = match codec.decode(&data) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "dropping undecodable frame");
                        continue;
                    }
                };
                let seq = envelope.seq;
                let event = match envelope.into_server() {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "ignoring frame");
                        continue;
                    }
                };
                match event {
                    ServerEvent::RoomIdIssued {
                        request_id,
                        success,
                        room_id,
                        message,
                    } => match pending.remove(&request_id) {
                        Some(reply) => {
                            let _ = reply.send(RoomIdReply { success, room_id, message });
                        }
                        None => {
                            tracing::debug!(%conn_id, request_id, "unsolicited room id");
                        }
                    },
                    event => {
                        tracing::debug!(%conn_id, seq, backlog = backlog.len(), "server event");
                        backlog.push_back(event);
                    }
                }
            }

            permit = events.reserve(), if !backlog.is_empty() => {
                let Ok(permit) = permit else {
                    // Controller is gone.
                    let _ = conn.close().await;
                    return;
                };
                if let Some(event) = backlog.pop_front() {
                    permit.send(LinkEvent::Server(event));
                }
            }
        }
    };

    tracing::debug!(%conn_id, reason = reason.as_deref().unwrap_or("closed"), "link task exiting");

    // The peer is gone. Hand over what is left unless the owner closes first.
    drop(pending);
    let flush = async {
        for event in backlog {
            if events.send(LinkEvent::Server(event)).await.is_err() {
                return;
            }
        }
        let _ = events.send(LinkEvent::Disconnected { reason }).await;
    };
    tokio::select! {
        () = flush => {}
        () = closed_by_owner(&mut commands) => {}
    }
}

/// Resolves once the owner asks to close or drops its handle. Requests
/// arriving in the meantime are dropped, which fails any reply waiter.
async fn closed_by_owner(commands: &mut mpsc::UnboundedReceiver<LinkCommand>) {
    loop {
        match commands.recv().await {
            Some(LinkCommand::Close) | None => return,
            Some(_) => {}
        }
    }
}
