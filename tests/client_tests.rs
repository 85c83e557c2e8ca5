#![cfg(feature = "tokio-runtime")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration-style client tests for seance-client.
//!
//! Uses the shared `MockTransport` from `tests/common` to script server
//! frames and verify that `SeanceClient` processes them correctly, including
//! session state transitions, outbound message generation, log growth, and
//! event delivery order.

mod common;

use seance_client::protocol::ClientMessage;
use seance_client::{
    LogKind, SeanceClient, SeanceConfig, SeanceError, SeanceEvent,
};

use common::{
    chat_json, events_json, player_joined_json, player_left_json, player_moved_json, welcome_json,
    welcome_json_minimal, MockTransport,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

/// Start a client as "ann" with the given scripted server frames.
#[allow(clippy::type_complexity)]
fn start_client(
    incoming: Vec<Option<Result<String, SeanceError>>>,
) -> (
    SeanceClient,
    tokio::sync::mpsc::Receiver<SeanceEvent>,
    std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    std::sync::Arc<std::sync::atomic::AtomicBool>,
) {
    let (transport, sent, closed) = MockTransport::new(incoming);
    let config = SeanceConfig::new("ann");
    let (client, events) = SeanceClient::start(transport, config);
    (client, events, sent, closed)
}

/// Consume events up to and including the welcome greeting log entry.
/// Panics if Connected, Welcome and the greeting are not received.
async fn drain_until_welcomed(rx: &mut tokio::sync::mpsc::Receiver<SeanceEvent>) {
    let ev = rx.recv().await.expect("expected Connected event");
    assert!(
        matches!(ev, SeanceEvent::Connected),
        "first event should be Connected, got {ev:?}"
    );
    let ev = rx.recv().await.expect("expected Welcome event");
    assert!(
        matches!(ev, SeanceEvent::Welcome { .. }),
        "second event should be Welcome, got {ev:?}"
    );
    let ev = rx.recv().await.expect("expected greeting log entry");
    assert!(
        matches!(ev, SeanceEvent::Log(_)),
        "third event should be the greeting log entry, got {ev:?}"
    );
}

// ════════════════════════════════════════════════════════════════════
// Welcome bootstrap
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn welcome_bootstraps_room_role_and_count() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![Some(Ok(welcome_json(
        "Ann",
        "Library",
        "Detective",
        1,
        1,
    )))]);

    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, SeanceEvent::Connected));

    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Welcome {
        player,
        player_count,
        player_index,
        ..
    } = ev
    {
        assert_eq!(player.name, "Ann");
        assert_eq!(player.role.as_deref(), Some("Detective"));
        assert_eq!(player_count, 1);
        assert_eq!(player_index, 1);
    } else {
        panic!("expected Welcome, got {ev:?}");
    }

    // The greeting is a System log entry.
    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Log(entry) = ev {
        assert_eq!(entry.kind, LogKind::System);
        assert!(entry.text.contains("Welcome Ann"));
    } else {
        panic!("expected Log, got {ev:?}");
    }

    assert_eq!(client.current_room().await.as_deref(), Some("Library"));
    assert_eq!(client.role().await.as_deref(), Some("Detective"));
    assert_eq!(client.player_count().await, 1);

    client.shutdown().await;
}

#[tokio::test]
async fn welcome_without_roster_fields_falls_back_to_one() {
    let (mut client, mut events, _sent, _closed) =
        start_client(vec![Some(Ok(welcome_json_minimal("ann", "Hallway")))]);

    drain_until_welcomed(&mut events).await;

    assert_eq!(client.player_count().await, 1);
    assert_eq!(client.player_index().await, 1);
    assert_eq!(client.current_room().await.as_deref(), Some("Hallway"));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Roster changes
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn join_updates_count_and_logs() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok(welcome_json("Ann", "Library", "Detective", 1, 1))),
        Some(Ok(player_joined_json("Bob", 2))),
    ]);

    drain_until_welcomed(&mut events).await;

    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Log(entry) = ev {
        assert_eq!(entry.kind, LogKind::Join);
        assert_eq!(entry.text, "Bob joined the game");
    } else {
        panic!("expected join log entry, got {ev:?}");
    }

    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, SeanceEvent::PlayerCountChanged { count: 2 }));
    assert_eq!(client.player_count().await, 2);

    client.shutdown().await;
}

#[tokio::test]
async fn totals_are_absolute_not_deltas() {
    // The server reports totals, never increments. Feed totals out of any
    // arithmetic order and verify the last one always wins.
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok(welcome_json("Ann", "Library", "Detective", 1, 1))),
        Some(Ok(player_joined_json("Bob", 5))),
        Some(Ok(player_left_json("Bob", 3))),
    ]);

    drain_until_welcomed(&mut events).await;

    let _ = events.recv().await; // join log
    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, SeanceEvent::PlayerCountChanged { count: 5 }));

    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Log(entry) = ev {
        assert_eq!(entry.kind, LogKind::Leave);
        assert_eq!(entry.text, "Bob left the game");
    } else {
        panic!("expected leave log entry, got {ev:?}");
    }
    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, SeanceEvent::PlayerCountChanged { count: 3 }));
    assert_eq!(client.player_count().await, 3);

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Movement
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn own_movement_echo_is_idempotent() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok(welcome_json("ann", "Library", "Detective", 1, 1))),
        Some(Ok(player_moved_json("ann", "Kitchen"))),
        Some(Ok(player_moved_json("ann", "Kitchen"))),
    ]);

    drain_until_welcomed(&mut events).await;

    // First echo: room change plus a movement log entry.
    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, SeanceEvent::RoomChanged { room } if room == "Kitchen"));
    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, SeanceEvent::Log(entry) if entry.kind == LogKind::Movement));

    // Second identical echo: log entry only, no second room change.
    let ev = events.recv().await.expect("event");
    assert!(
        matches!(ev, SeanceEvent::Log(entry) if entry.kind == LogKind::Movement),
        "a repeated echo must not produce another RoomChanged"
    );

    assert_eq!(client.current_room().await.as_deref(), Some("Kitchen"));

    client.shutdown().await;
}

#[tokio::test]
async fn local_move_applies_before_the_echo_arrives() {
    let (mut client, mut events, sent, _closed) = start_client(vec![Some(Ok(welcome_json(
        "ann",
        "Library",
        "Detective",
        1,
        1,
    )))]);

    drain_until_welcomed(&mut events).await;

    client.move_to("Basement").expect("move");

    // The optimistic change surfaces without any server frame in flight.
    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, SeanceEvent::RoomChanged { room } if room == "Basement"));
    assert_eq!(client.current_room().await.as_deref(), Some("Basement"));

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    {
        let messages = sent.lock().unwrap();
        assert_eq!(messages.len(), 1);
        let msg: ClientMessage = serde_json::from_str(&messages[0]).expect("parse move");
        assert!(matches!(msg, ClientMessage::Move { room } if room == "Basement"));
    }

    client.shutdown().await;
}

#[tokio::test]
async fn other_players_movement_does_not_touch_our_room() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok(welcome_json("Ann", "Library", "Detective", 2, 1))),
        Some(Ok(player_moved_json("Bob", "Attic"))),
    ]);

    drain_until_welcomed(&mut events).await;

    let ev = events.recv().await.expect("event");
    assert!(
        matches!(ev, SeanceEvent::Log(entry) if entry.text == "Bob moved to Attic"),
        "another player's movement is log-only"
    );
    assert_eq!(client.current_room().await.as_deref(), Some("Library"));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Batches and classification
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn batch_items_surface_in_batch_order() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok(welcome_json("Ann", "Library", "Detective", 2, 1))),
        Some(Ok(events_json(vec![
            serde_json::json!({"type": "move", "player": "Bob", "room": "Kitchen"}),
            serde_json::json!({"type": "ai_event", "text": "The candles gutter.", "room": "Kitchen"}),
            serde_json::json!({"type": "seance_circle", "candles": 5}),
        ]))),
    ]);

    drain_until_welcomed(&mut events).await;

    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, SeanceEvent::Log(entry) if entry.kind == LogKind::Movement));
    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Log(entry) = ev {
        assert_eq!(entry.kind, LogKind::AiNarration);
        assert_eq!(entry.text, "The candles gutter.");
    } else {
        panic!("expected narration log entry, got {ev:?}");
    }
    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Log(entry) = ev {
        assert_eq!(entry.kind, LogKind::Generic);
        assert!(entry.text.contains("seance_circle"));
    } else {
        panic!("expected generic log entry, got {ev:?}");
    }

    client.shutdown().await;
}

#[tokio::test]
async fn one_malformed_batch_item_does_not_sink_the_batch() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok(welcome_json("Ann", "Library", "Detective", 2, 1))),
        Some(Ok(events_json(vec![
            // The move tag is known but the payload is the wrong shape.
            serde_json::json!({"type": "move", "player": 41}),
            serde_json::json!({"type": "chat", "player": "Bob", "message": "made it"}),
        ]))),
    ]);

    drain_until_welcomed(&mut events).await;

    let ev = events.recv().await.expect("event");
    assert!(
        matches!(ev, SeanceEvent::Log(entry) if entry.kind == LogKind::Generic),
        "the malformed item degrades to a generic entry"
    );
    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Chat(entry) = ev {
        assert_eq!(entry.speaker, "Bob");
        assert_eq!(entry.text, "made it");
    } else {
        panic!("expected the following chat item to survive, got {ev:?}");
    }

    client.shutdown().await;
}

#[tokio::test]
async fn unknown_top_level_tags_are_preserved_as_generic_entries() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok(welcome_json("Ann", "Library", "Detective", 1, 1))),
        Some(Ok(
            serde_json::json!({"type": "weather", "sky": "blood red"}).to_string()
        )),
    ]);

    drain_until_welcomed(&mut events).await;

    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Log(entry) = ev {
        assert_eq!(entry.kind, LogKind::Generic);
        assert!(entry.text.contains("blood red"));
    } else {
        panic!("expected generic log entry, got {ev:?}");
    }

    // Session state is untouched by content we do not understand.
    assert_eq!(client.current_room().await.as_deref(), Some("Library"));
    assert_eq!(client.player_count().await, 1);

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Chat and whispers
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn chat_log_interleaves_own_echo_and_server_delivery() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok(welcome_json("Ann", "Library", "Detective", 2, 1))),
        Some(Ok(chat_json("Bob", "who turned off the lights?"))),
    ]);

    drain_until_welcomed(&mut events).await;

    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Chat(entry) = ev {
        assert_eq!(entry.speaker, "Bob");
        assert!(!entry.is_whisper);
    } else {
        panic!("expected Chat, got {ev:?}");
    }

    client.send_chat("not me").expect("chat");
    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Chat(entry) = ev {
        assert_eq!(entry.speaker, "Ann", "echo uses the confirmed display name");
        assert_eq!(entry.text, "not me");
    } else {
        panic!("expected Chat echo, got {ev:?}");
    }

    let session = client.session().await;
    let chat = session.chat_log().entries();
    assert_eq!(chat.len(), 2);
    assert_eq!(chat[0].speaker, "Bob");
    assert_eq!(chat[1].speaker, "Ann");
    assert!(
        session.event_log().entries().iter().all(|e| e.kind != LogKind::Generic),
        "chat traffic must not leak into the event log"
    );

    client.shutdown().await;
}

#[tokio::test]
async fn incoming_whisper_batch_item_sets_the_flag() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok(welcome_json("Ann", "Library", "Detective", 2, 1))),
        Some(Ok(events_json(vec![serde_json::json!({
            "type": "whisper", "player": "Bob", "message": "the key is upstairs"
        })]))),
    ]);

    drain_until_welcomed(&mut events).await;

    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Chat(entry) = ev {
        assert!(entry.is_whisper);
        assert_eq!(entry.speaker, "Bob");
        assert_eq!(entry.text, "*whispers* the key is upstairs");
    } else {
        panic!("expected whisper chat entry, got {ev:?}");
    }

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Disconnect lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn clean_server_close_ends_the_stream_without_reconnecting() {
    let (client, mut events, sent, _closed) = start_client(vec![
        Some(Ok(welcome_json("Ann", "Library", "Detective", 1, 1))),
        None,
    ]);

    drain_until_welcomed(&mut events).await;

    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Disconnected { clean, detail } = ev {
        assert!(clean);
        assert!(detail.is_none());
    } else {
        panic!("expected Disconnected, got {ev:?}");
    }

    // The loop has exited for good: the channel closes and no frames were
    // sent on the way out. Reconnecting is the caller's decision.
    assert!(events.recv().await.is_none());
    assert!(!client.is_connected());
    assert!(sent.lock().unwrap().is_empty());

    // Actions after the close are refused, not queued.
    let result = client.move_to("Kitchen");
    assert!(matches!(result, Err(SeanceError::NotConnected)));
    let result = client.send_chat("hello?");
    assert!(matches!(result, Err(SeanceError::NotConnected)));
}

#[tokio::test]
async fn transport_error_reports_the_detail() {
    let (client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok(welcome_json("Ann", "Library", "Detective", 1, 1))),
        Some(Err(SeanceError::TransportReceive(
            "connection reset by peer".into(),
        ))),
    ]);

    drain_until_welcomed(&mut events).await;

    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Disconnected { clean, detail } = ev {
        assert!(!clean);
        assert!(detail.expect("detail").contains("connection reset"));
    } else {
        panic!("expected Disconnected, got {ev:?}");
    }

    assert!(!client.is_connected());
}

// ════════════════════════════════════════════════════════════════════
// Abilities
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn ability_use_logs_and_sends_one_message() {
    let (mut client, mut events, sent, _closed) = start_client(vec![Some(Ok(welcome_json(
        "Ann",
        "Library",
        "Detective",
        1,
        1,
    )))]);

    drain_until_welcomed(&mut events).await;

    client.use_ability("Lockpick").expect("ability");

    let ev = events.recv().await.expect("event");
    if let SeanceEvent::Log(entry) = ev {
        assert_eq!(entry.kind, LogKind::Ability);
        assert_eq!(entry.text, "You use Lockpick.");
    } else {
        panic!("expected ability log entry, got {ev:?}");
    }

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    {
        let messages = sent.lock().unwrap();
        assert_eq!(messages.len(), 1);
        let msg: ClientMessage = serde_json::from_str(&messages[0]).expect("parse ability");
        assert!(matches!(msg, ClientMessage::Ability { ability } if ability == "Lockpick"));
    }

    client.shutdown().await;
}
