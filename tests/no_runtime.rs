#![cfg(not(feature = "tokio-runtime"))]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Runtime-free core tests for seance-client.
//!
//! Built with `--no-default-features`, where the async client handle and the
//! transports are compiled out. Classification, session transitions, logs and
//! the narrative machine must stay fully usable as plain synchronous calls.

use seance_client::narrative::{CHOICE_ACK, DEFAULT_CHOICES};
use seance_client::protocol::{classify, ClientMessage};
use seance_client::session::PlayerAction;
use seance_client::{GameMode, LogKind, SeanceEvent, SessionIdentity, SessionState};

// ════════════════════════════════════════════════════════════════════
// Inbound transitions
// ════════════════════════════════════════════════════════════════════

#[test]
fn welcome_applies_without_a_runtime() {
    let mut state = SessionState::new(SessionIdentity::new("Ann"));

    let records = state.apply_message(classify(
        r#"{
            "type": "welcome",
            "message": "Welcome Ann! The manor remembers you.",
            "player": {
                "name": "Ann",
                "current_room": "Library",
                "role": "Medium",
                "abilities": ["Commune"],
                "personal_objective": "Contact the first victim"
            },
            "total_players": 3,
            "player_index": 2,
            "room_code": "GH7KQ2"
        }"#,
    ));

    assert_eq!(state.display_name(), "Ann");
    assert_eq!(state.current_room(), Some("Library"));
    assert_eq!(state.player_count(), 3);
    assert_eq!(state.player_index(), 2);
    assert_eq!(state.room_code(), Some("GH7KQ2"));

    assert_eq!(records.len(), 2);
    if let SeanceEvent::Welcome { player_count, .. } = &records[0] {
        assert_eq!(*player_count, 3);
    } else {
        panic!("expected a welcome record, got {:?}", records[0]);
    }
    if let SeanceEvent::Log(entry) = &records[1] {
        assert_eq!(entry.kind, LogKind::System);
        assert!(entry.text.contains("Welcome Ann"));
    } else {
        panic!("expected the greeting log record, got {:?}", records[1]);
    }
}

#[test]
fn malformed_and_unknown_frames_degrade_to_generic_entries() {
    let mut state = SessionState::new(SessionIdentity::new("Ann"));

    let records = state.apply_message(classify("{not json"));
    if let [SeanceEvent::Log(entry)] = records.as_slice() {
        assert_eq!(entry.kind, LogKind::Generic);
        assert_eq!(entry.text, "{not json");
    } else {
        panic!("expected one generic log record, got {records:?}");
    }

    let records = state.apply_message(classify(
        r#"{"type":"events","events":[
            {"type":"move","player":"Brim","room":"Attic"},
            {"type":"hex","payload":7}
        ]}"#,
    ));
    if let [SeanceEvent::Log(movement), SeanceEvent::Log(generic)] = records.as_slice() {
        assert_eq!(movement.kind, LogKind::Movement);
        assert_eq!(movement.text, "Brim moved to Attic");
        assert_eq!(generic.kind, LogKind::Generic);
        assert!(generic.text.contains("hex"));
    } else {
        panic!("expected movement then generic, got {records:?}");
    }

    // Someone else's movement never touches this player's room.
    assert_eq!(state.current_room(), None);
    assert_eq!(state.event_log().len(), 3);
}

// ════════════════════════════════════════════════════════════════════
// Outbound transitions
// ════════════════════════════════════════════════════════════════════

#[test]
fn actions_mutate_state_and_shape_wire_messages() {
    let mut state = SessionState::new(SessionIdentity::new("Ann"));

    let (message, records) = state.apply_action(PlayerAction::Move {
        room: "Kitchen".to_string(),
    });
    assert_eq!(state.current_room(), Some("Kitchen"));
    match message {
        Some(ClientMessage::Move { room }) => assert_eq!(room, "Kitchen"),
        other => panic!("expected a move message, got {other:?}"),
    }
    if let [SeanceEvent::RoomChanged { room }] = records.as_slice() {
        assert_eq!(room, "Kitchen");
    } else {
        panic!("expected a room-changed record, got {records:?}");
    }

    let (message, _) = state.apply_action(PlayerAction::Whisper {
        target: "Brim".to_string(),
        message: "hide the candle".to_string(),
    });
    let wire = serde_json::to_value(message.unwrap()).unwrap();
    assert_eq!(wire["type"], "chat");
    assert_eq!(wire["whisper"], true);
    assert_eq!(wire["target"], "Brim");

    let echo = &state.chat_log().entries()[0];
    assert_eq!(echo.speaker, "Ann");
    assert_eq!(echo.text, "*whispers to Brim* hide the candle");
    assert!(echo.is_whisper);
}

#[test]
fn narrative_beats_and_choices_run_synchronously() {
    let mut state =
        SessionState::new(SessionIdentity::new("Ann").with_mode(GameMode::Narrative));

    let records = state.apply_message(classify(
        r#"{"type":"events","events":[{
            "type": "ai_event",
            "text": "A door creaks. Dust falls. A voice calls out. Nobody answers."
        }]}"#,
    ));
    if let [SeanceEvent::BeatPresented { text, choices }] = records.as_slice() {
        assert_eq!(text, "A door creaks. Dust falls. A voice calls out.");
        assert_eq!(*choices, DEFAULT_CHOICES);
    } else {
        panic!("expected a presented beat, got {records:?}");
    }

    let (message, records) = state.apply_action(PlayerAction::SelectChoice {
        label: "Approach".to_string(),
    });
    match message {
        Some(ClientMessage::Ability { ability }) => assert_eq!(ability, "Approach"),
        other => panic!("expected an ability message, got {other:?}"),
    }
    assert!(matches!(
        records.last(),
        Some(SeanceEvent::ChoiceAcknowledged { label }) if label == "Approach"
    ));
    assert_eq!(state.narrative().display_text(), Some(CHOICE_ACK));
    assert!(state.narrative().choices().is_empty());

    // The selection consumed the offer; repeating it goes nowhere.
    let (message, records) = state.apply_action(PlayerAction::SelectChoice {
        label: "Approach".to_string(),
    });
    assert!(message.is_none());
    assert!(records.is_empty());
}
