#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for seance-client integration tests.
//!
//! Provides a channel-based [`MockTransport`] and helper functions that build
//! server frames as raw JSON, shaped exactly like the backend emits them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use seance_client::{SeanceError, Transport};

// ── MockTransport ───────────────────────────────────────────────────

/// In-memory transport scripted from a `Vec` of frames.
///
/// `recv()` pops the script front to back; `sent` collects every outbound
/// frame for later assertions.
pub struct MockTransport {
    /// Scripted server frames, consumed front to back.
    incoming: VecDeque<Option<Result<String, SeanceError>>>,
    /// Every frame the client sent.
    pub sent: Arc<StdMutex<Vec<String>>>,
    /// Set once `close()` has run.
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    /// Build a transport that will replay `incoming`, plus the shared handles
    /// used to observe sent frames and the close flag.
    pub fn new(
        incoming: Vec<Option<Result<String, SeanceError>>>,
    ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), SeanceError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, SeanceError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            // Script exhausted: park forever so the loop sits idle until it
            // is shut down.
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), SeanceError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── JSON helper functions ───────────────────────────────────────────

/// Returns the JSON string for a full `welcome` frame.
pub fn welcome_json(name: &str, room: &str, role: &str, total: u32, index: u32) -> String {
    serde_json::json!({
        "type": "welcome",
        "message": format!("Welcome {name}!"),
        "mode": "game",
        "difficulty": "normal",
        "player": {
            "name": name,
            "current_room": room,
            "role": role,
            "abilities": ["Investigate", "Lockpick"],
            "personal_objective": "Find the hidden culprit"
        },
        "total_players": total,
        "player_index": index,
        "room_code": null
    })
    .to_string()
}

/// Returns a `welcome` frame without roster fields, as older servers send it.
pub fn welcome_json_minimal(name: &str, room: &str) -> String {
    serde_json::json!({
        "type": "welcome",
        "player": {"name": name, "current_room": room}
    })
    .to_string()
}

/// Returns the JSON string for a `player_joined` frame with an absolute total.
pub fn player_joined_json(name: &str, total: u32) -> String {
    serde_json::json!({
        "type": "player_joined",
        "player": {"name": name, "current_room": "Hallway"},
        "total_players": total
    })
    .to_string()
}

/// Returns the JSON string for a `player_left` frame with an absolute total.
pub fn player_left_json(name: &str, total: u32) -> String {
    serde_json::json!({
        "type": "player_left",
        "player": name,
        "total_players": total
    })
    .to_string()
}

/// Returns the JSON string for a `player_moved` movement echo.
pub fn player_moved_json(player: &str, room: &str) -> String {
    serde_json::json!({"type": "player_moved", "player": player, "room": room}).to_string()
}

/// Returns the JSON string for a direct `chat` frame.
pub fn chat_json(player: &str, message: &str) -> String {
    serde_json::json!({"type": "chat", "player": player, "message": message}).to_string()
}

/// Returns the JSON string for an `events` batch from raw items.
pub fn events_json(items: Vec<serde_json::Value>) -> String {
    serde_json::json!({"type": "events", "events": items}).to_string()
}

/// Returns the JSON string for a batch carrying one `ai_event` narration.
pub fn ai_event_batch_json(text: &str) -> String {
    events_json(vec![
        serde_json::json!({"type": "ai_event", "text": text, "room": "Library", "volume": "loud"}),
    ])
}
