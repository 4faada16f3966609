//! Client tests against a scripted server.
//!
//! The test plays the server side of an in-memory connection by hand, so
//! every frame the controller sends, and every frame it reacts to, is
//! visible here.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use noughts::game::{Cell, GameState, Mark, Mode, StatePatch};
use noughts::protocol::{ClientEvent, Codec, Envelope, JsonCodec, Payload, ServerEvent};
use noughts::transport::memory::{self, MemoryConnection, MemoryConnector, MemoryTransport};
use noughts::transport::{Connection, Transport};
use noughts::{ClientConfig, ClientError, GameController, LinkStatus, Notice, NoticeLevel};

// =========================================================================
// Helpers
// =========================================================================

type Log = Rc<RefCell<Vec<Notice>>>;

struct Harness {
    controller: GameController<Box<dyn Fn(Notice)>>,
    notices: Log,
    connector: MemoryConnector,
    transport: MemoryTransport,
    seq: u64,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    fn with_config(config: ClientConfig) -> Self {
        let notices: Log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&notices);
        let notifier: Box<dyn Fn(Notice)> =
            Box::new(move |n: Notice| sink.borrow_mut().push(n));
        let (connector, transport) = memory::channel();
        Self {
            controller: GameController::with_config(config, notifier),
            notices,
            connector,
            transport,
            seq: 1,
        }
    }

    /// Connects the controller and returns the server end.
    async fn connect(&mut self) -> MemoryConnection {
        self.controller.connect_with(&self.connector).await.unwrap();
        self.transport.accept().await.unwrap()
    }

    async fn push(&mut self, server: &MemoryConnection, event: ServerEvent) {
        let bytes = JsonCodec
            .encode_envelope(self.seq, 0, Payload::Server(event))
            .unwrap();
        self.seq += 1;
        server.send(&bytes).await.unwrap();
    }

    fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }
}

async fn next_client_event(server: &MemoryConnection) -> ClientEvent {
    let bytes = tokio::time::timeout(Duration::from_secs(2), server.recv())
        .await
        .expect("client should send something")
        .unwrap()
        .expect("connection open");
    let envelope: Envelope = JsonCodec.decode(&bytes).unwrap();
    match envelope.payload {
        Payload::Client(event) => event,
        other => panic!("expected a client payload, got {other:?}"),
    }
}

async fn assert_silent(server: &MemoryConnection) {
    let result = tokio::time::timeout(Duration::from_millis(50), server.recv()).await;
    assert!(result.is_err(), "client should not have sent anything");
}

/// A started online game as seen by the O player.
fn seated_as_o() -> GameState {
    GameState {
        is_playing_online: true,
        player_symbol: Some(Mark::O),
        room_id: Some("QX7K2D".into()),
        room_name: Some("friday".into()),
        game_started: true,
        ..GameState::default()
    }
}

fn updated(revision: u64, state: StatePatch) -> ServerEvent {
    ServerEvent::GameUpdated { revision, state }
}

// =========================================================================
// Connecting
// =========================================================================

#[tokio::test]
async fn test_connect_marks_state_online() {
    let mut h = Harness::new();
    let _server = h.connect().await;

    assert!(h.controller.state().is_playing_online);
    assert_eq!(h.controller.status(), LinkStatus::Connected);
    assert!(h.notices().is_empty());
}

#[tokio::test]
async fn test_duplicate_connect_is_noop() {
    let mut h = Harness::new();
    let _server = h.connect().await;

    h.controller.connect_with(&h.connector).await.unwrap();

    let second = tokio::time::timeout(Duration::from_millis(50), h.transport.accept()).await;
    assert!(second.is_err(), "no second connection should be opened");
}

#[tokio::test]
async fn test_connect_failure_notifies() {
    let mut h = Harness::new();
    let (dead_connector, dead_transport) = memory::channel();
    drop(dead_transport);

    let result = h.controller.connect_with(&dead_connector).await;

    assert!(matches!(result, Err(ClientError::Transport(_))));
    assert_eq!(h.controller.status(), LinkStatus::Disconnected);
    assert_eq!(h.notices().len(), 1);
    assert_eq!(h.notices()[0].level, NoticeLevel::Error);
}

// =========================================================================
// Moves
// =========================================================================

#[tokio::test]
async fn test_out_of_turn_move_is_not_sent() {
    // isXNext = true, playerSymbol = O.
    let mut h = Harness::new();
    let server = h.connect().await;
    h.push(&server, ServerEvent::started(1, seated_as_o())).await;
    h.controller.next_event().await.unwrap();
    assert!(h.controller.state().is_x_next);

    h.controller.handle_move(4, None);

    assert_silent(&server).await;
    assert_eq!(h.notices(), vec![Notice::error("It's not your turn.")]);
    assert_eq!(h.controller.state().classic_board[4], None);
}

#[tokio::test]
async fn test_move_on_my_turn_is_sent_not_applied() {
    let mut h = Harness::new();
    let server = h.connect().await;
    let my_turn = GameState {
        is_x_next: false,
        ..seated_as_o()
    };
    h.push(&server, ServerEvent::started(1, my_turn)).await;
    h.controller.next_event().await.unwrap();

    h.controller.handle_move(7, None);

    assert_eq!(
        next_client_event(&server).await,
        ClientEvent::MakeMove {
            room_id: "QX7K2D".into(),
            player_symbol: Mark::O,
            macro_index: 7,
            cell_index: None,
        }
    );
    // Nothing changes until the server broadcasts the result.
    assert_eq!(h.controller.state().classic_board[7], None);
    assert!(h.notices().is_empty());

    let mut board = [None; 9];
    board[7] = Some(Cell::O);
    h.push(
        &server,
        updated(
            2,
            StatePatch {
                classic_board: Some(board),
                is_x_next: Some(true),
                ..StatePatch::default()
            },
        ),
    )
    .await;
    h.controller.next_event().await.unwrap();
    assert_eq!(h.controller.state().classic_board[7], Some(Cell::O));
    assert!(h.controller.state().is_x_next);
}

#[tokio::test]
async fn test_move_before_start_is_not_sent() {
    let mut h = Harness::new();
    let server = h.connect().await;
    let waiting = GameState {
        game_started: false,
        player_symbol: Some(Mark::X),
        ..seated_as_o()
    };
    h.push(&server, updated(1, waiting.into())).await;
    h.controller.next_event().await.unwrap();
    assert_eq!(h.controller.status(), LinkStatus::InRoom);

    h.controller.handle_move(0, None);

    assert_silent(&server).await;
    assert_eq!(h.notices().len(), 1);
}

#[tokio::test]
async fn test_start_over_is_refused_while_seated() {
    let mut h = Harness::new();
    let server = h.connect().await;
    h.push(&server, ServerEvent::started(1, seated_as_o())).await;
    h.controller.next_event().await.unwrap();
    let before = h.controller.state().clone();

    h.controller.start_over();

    assert_eq!(
        h.notices(),
        vec![Notice::error("You can't start over during an online game.")]
    );
    assert_eq!(h.controller.state(), &before);
    assert_eq!(h.controller.status(), LinkStatus::GameStarted);

    // Still O in the room, and it's still X to move.
    h.controller.handle_move(4, None);
    assert_silent(&server).await;
    assert_eq!(h.notices().last(), Some(&Notice::error("It's not your turn.")));
    assert_eq!(h.controller.state().classic_board[4], None);
}

#[tokio::test]
async fn test_mode_switch_is_refused_while_seated() {
    let mut h = Harness::new();
    let server = h.connect().await;
    h.push(&server, ServerEvent::started(1, seated_as_o())).await;
    h.controller.next_event().await.unwrap();

    h.controller.set_board("ultimate");

    assert_eq!(h.controller.state().mode, Mode::Classic);
    assert_eq!(
        h.notices(),
        vec![Notice::error(
            "The room's mode can't be changed during an online game."
        )]
    );
}

#[tokio::test]
async fn test_start_over_outside_a_room_stays_online() {
    let mut h = Harness::new();
    let _server = h.connect().await;

    h.controller.start_over();

    assert!(h.controller.state().is_playing_online);
    assert_eq!(h.controller.status(), LinkStatus::Connected);
    assert!(h.notices().is_empty());
}

// =========================================================================
// Inbound events
// =========================================================================

#[tokio::test]
async fn test_game_started_merges_and_sets_flag() {
    let mut h = Harness::new();
    let server = h.connect().await;
    let mut patch = StatePatch::from(seated_as_o());
    patch.game_started = None;

    h.push(&server, ServerEvent::GameStarted { revision: 1, state: patch })
        .await;
    h.controller.next_event().await.unwrap();

    assert!(h.controller.state().game_started);
    assert_eq!(h.controller.state().room_id.as_deref(), Some("QX7K2D"));
    assert_eq!(h.controller.state().player_symbol, Some(Mark::O));
    assert_eq!(h.controller.status(), LinkStatus::GameStarted);
}

#[tokio::test]
async fn test_stale_snapshot_is_dropped() {
    let mut h = Harness::new();
    let server = h.connect().await;
    h.push(&server, ServerEvent::started(1, seated_as_o())).await;
    h.controller.next_event().await.unwrap();

    let draw_score = |n| StatePatch {
        draw_score: Some(n),
        ..StatePatch::default()
    };
    h.push(&server, updated(3, draw_score(3))).await;
    h.push(&server, updated(2, draw_score(2))).await;
    h.push(&server, updated(4, draw_score(4))).await;

    let first = h.controller.next_event().await.unwrap();
    assert!(matches!(first, ServerEvent::GameUpdated { revision: 3, .. }));
    assert_eq!(h.controller.state().draw_score, 3);

    // Revision 2 is skipped without being returned.
    let second = h.controller.next_event().await.unwrap();
    assert!(matches!(second, ServerEvent::GameUpdated { revision: 4, .. }));
    assert_eq!(h.controller.state().draw_score, 4);
}

#[tokio::test]
async fn test_drain_events_applies_everything_queued() {
    let mut h = Harness::new();
    let server = h.connect().await;
    h.push(&server, ServerEvent::started(1, seated_as_o())).await;
    h.push(&server, ServerEvent::error("Room ABC is full.")).await;
    h.push(&server, updated(2, StatePatch { is_x_next: Some(false), ..StatePatch::default() }))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(h.controller.drain_events(), 3);
    assert!(!h.controller.state().is_x_next);
    assert_eq!(h.controller.drain_events(), 0);
}

#[tokio::test]
async fn test_game_error_notifies_without_changing_state() {
    let mut h = Harness::new();
    let server = h.connect().await;
    let before = h.controller.state().clone();

    h.push(&server, ServerEvent::error("Room NOPE42 does not exist.")).await;
    h.controller.next_event().await.unwrap();

    assert_eq!(h.controller.state(), &before);
    assert_eq!(h.notices(), vec![Notice::error("Room NOPE42 does not exist.")]);
}

#[tokio::test]
async fn test_room_left_resets_but_stays_online() {
    let mut h = Harness::new();
    let server = h.connect().await;
    h.push(&server, ServerEvent::started(1, seated_as_o())).await;
    h.controller.next_event().await.unwrap();

    h.controller.leave_room().unwrap();
    assert_eq!(
        next_client_event(&server).await,
        ClientEvent::LeaveRoom {
            room_id: "QX7K2D".into()
        }
    );
    h.push(
        &server,
        ServerEvent::RoomLeft {
            message: "You left room QX7K2D.".into(),
        },
    )
    .await;
    h.controller.next_event().await.unwrap();

    let expected = GameState {
        is_playing_online: true,
        ..GameState::default()
    };
    assert_eq!(h.controller.state(), &expected);
    assert_eq!(h.controller.status(), LinkStatus::Connected);
    assert_eq!(h.notices(), vec![Notice::info("You left room QX7K2D.")]);
}

#[tokio::test]
async fn test_revisions_restart_in_a_new_room() {
    let mut h = Harness::new();
    let server = h.connect().await;
    h.push(&server, ServerEvent::started(9, seated_as_o())).await;
    h.controller.next_event().await.unwrap();
    h.push(&server, ServerEvent::RoomLeft { message: "bye".into() }).await;
    h.controller.next_event().await.unwrap();

    h.controller.join_room("NEWRM1", "Lin", None).unwrap();
    next_client_event(&server).await;
    let fresh = GameState {
        room_id: Some("NEWRM1".into()),
        ..seated_as_o()
    };
    h.push(&server, updated(1, fresh.into())).await;
    h.controller.next_event().await.unwrap();

    assert_eq!(h.controller.state().room_id.as_deref(), Some("NEWRM1"));
}

#[tokio::test]
async fn test_player_left_notice() {
    let mut h = Harness::new();
    let server = h.connect().await;
    h.push(
        &server,
        ServerEvent::PlayerLeft {
            player_name: "Ada".into(),
        },
    )
    .await;
    h.controller.next_event().await.unwrap();
    assert_eq!(h.notices(), vec![Notice::info("Ada left the room.")]);
}

#[tokio::test]
async fn test_server_close_resets_to_offline_default() {
    let mut h = Harness::new();
    let server = h.connect().await;
    h.push(&server, ServerEvent::started(1, seated_as_o())).await;
    h.controller.next_event().await.unwrap();

    server.close().await.unwrap();

    assert!(h.controller.next_event().await.is_none());
    assert_eq!(h.controller.state(), &GameState::default());
    assert_eq!(h.controller.status(), LinkStatus::Disconnected);
    assert_eq!(h.notices().len(), 1);

    // A later connect opens a fresh link.
    let _again = h.connect().await;
    assert_eq!(h.controller.status(), LinkStatus::Connected);
}

// =========================================================================
// Rooms
// =========================================================================

#[tokio::test]
async fn test_create_room_requests_code_then_joins() {
    let mut h = Harness::new();
    let server = h.connect().await;
    h.controller.set_board("ultimate");

    let server_side = async {
        let request_id = match next_client_event(&server).await {
            ClientEvent::RequestRoomId { request_id } => request_id,
            other => panic!("expected RequestRoomId, got {other:?}"),
        };
        let reply = ServerEvent::RoomIdIssued {
            request_id,
            success: true,
            room_id: Some("K3P9QZ".into()),
            message: None,
        };
        let bytes = JsonCodec
            .encode_envelope(1, 0, Payload::Server(reply))
            .unwrap();
        server.send(&bytes).await.unwrap();
        next_client_event(&server).await
    };

    let (code, join) = tokio::join!(
        h.controller.create_room("Ada", Some("friday".into())),
        server_side
    );

    assert_eq!(code.unwrap(), "K3P9QZ");
    assert_eq!(
        join,
        ClientEvent::JoinRoom {
            room_id: "K3P9QZ".into(),
            player_name: "Ada".into(),
            room_name: Some("friday".into()),
            is_create_room: true,
            mode: Mode::Ultimate,
        }
    );
}

#[tokio::test]
async fn test_create_room_refused() {
    let mut h = Harness::new();
    let server = h.connect().await;

    let server_side = async {
        let ClientEvent::RequestRoomId { request_id } = next_client_event(&server).await
        else {
            panic!("expected RequestRoomId");
        };
        let reply = ServerEvent::RoomIdIssued {
            request_id,
            success: false,
            room_id: None,
            message: Some("Server is full.".into()),
        };
        let bytes = JsonCodec
            .encode_envelope(1, 0, Payload::Server(reply))
            .unwrap();
        server.send(&bytes).await.unwrap();
    };

    let (result, ()) = tokio::join!(h.controller.create_room("Ada", None), server_side);

    assert!(matches!(result, Err(ClientError::Rejected(ref m)) if m == "Server is full."));
    assert_eq!(h.notices(), vec![Notice::error("Server is full.")]);
}

#[tokio::test]
async fn test_create_room_times_out() {
    let config = ClientConfig::default().request_timeout(Duration::from_millis(50));
    let mut h = Harness::with_config(config);
    let _server = h.connect().await;

    let result = h.controller.create_room("Ada", None).await;

    assert!(matches!(result, Err(ClientError::Timeout(_))));
    assert_eq!(h.notices().len(), 1);
}

#[tokio::test]
async fn test_undrained_events_do_not_hold_up_requests() {
    let config = ClientConfig::default()
        .event_buffer(1)
        .request_timeout(Duration::from_millis(500));
    let mut h = Harness::with_config(config);
    let server = h.connect().await;
    for n in 0..3 {
        h.push(&server, ServerEvent::error(format!("error {n}"))).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    let server_side = async {
        let ClientEvent::RequestRoomId { request_id } = next_client_event(&server).await
        else {
            panic!("expected RequestRoomId");
        };
        let reply = ServerEvent::RoomIdIssued {
            request_id,
            success: true,
            room_id: Some("K3P9QZ".into()),
            message: None,
        };
        let bytes = JsonCodec
            .encode_envelope(10, 0, Payload::Server(reply))
            .unwrap();
        server.send(&bytes).await.unwrap();
        next_client_event(&server).await
    };
    let (code, join) = tokio::join!(h.controller.create_room("Ada", None), server_side);

    assert_eq!(code.unwrap(), "K3P9QZ");
    assert!(matches!(join, ClientEvent::JoinRoom { .. }));

    // Nothing was lost while the queue was full.
    for n in 0..3 {
        assert_eq!(
            h.controller.next_event().await,
            Some(ServerEvent::error(format!("error {n}")))
        );
    }
    assert_eq!(h.notices().len(), 3);
}

#[tokio::test]
async fn test_disconnect_with_undrained_events_is_prompt() {
    let config = ClientConfig::default()
        .event_buffer(1)
        .request_timeout(Duration::from_secs(5));
    let mut h = Harness::with_config(config);
    let server = h.connect().await;
    for n in 0..3 {
        h.push(&server, ServerEvent::error(format!("error {n}"))).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = std::time::Instant::now();
    h.controller.disconnect_player().await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(server.recv().await.unwrap(), None);
    assert_eq!(h.controller.status(), LinkStatus::Disconnected);
}

#[tokio::test]
async fn test_start_and_clear_are_sent_for_current_room() {
    let mut h = Harness::new();
    let server = h.connect().await;
    h.push(&server, updated(1, StatePatch::from(seated_as_o()))).await;
    h.controller.next_event().await.unwrap();

    h.controller.start_game().unwrap();
    h.controller.clear_board();

    assert_eq!(
        next_client_event(&server).await,
        ClientEvent::StartGame {
            room_id: "QX7K2D".into()
        }
    );
    assert_eq!(
        next_client_event(&server).await,
        ClientEvent::ClearBoard {
            room_id: "QX7K2D".into()
        }
    );
}

// =========================================================================
// Teardown
// =========================================================================

#[tokio::test]
async fn test_disconnect_player_closes_and_resets() {
    let mut h = Harness::new();
    let server = h.connect().await;
    h.push(&server, ServerEvent::started(1, seated_as_o())).await;
    h.controller.next_event().await.unwrap();

    h.controller.disconnect_player().await;

    assert_eq!(server.recv().await.unwrap(), None);
    assert_eq!(h.controller.state(), &GameState::default());
    assert_eq!(h.controller.status(), LinkStatus::Disconnected);
}

#[tokio::test]
async fn test_dropping_controller_releases_connection() {
    let mut h = Harness::new();
    let server = h.connect().await;

    drop(h.controller);

    let closed = tokio::time::timeout(Duration::from_secs(2), server.recv())
        .await
        .expect("server side should observe the close");
    assert_eq!(closed.unwrap(), None);
}
