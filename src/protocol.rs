//! Wire types for the Seance session protocol.
//!
//! Messages are JSON text frames, internally tagged on a string `type` field
//! with the payload fields inlined next to the tag (`{"type": "move",
//! "room": "Kitchen"}`). Inbound enums end in an `Unknown` catch-all variant:
//! a tag this client does not recognize is preserved verbatim instead of
//! failing the parse, and [`classify`] degrades malformed payloads to
//! [`ServerMessage::Unknown`] rather than surfacing an error. The classifier
//! therefore never rejects an inbound frame.

use serde::{Deserialize, Serialize};

// ── Enums ───────────────────────────────────────────────────────────

/// Operating mode of a session, fixed at connection time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GameMode {
    /// Open multiplayer exploration (`"game"` on the wire).
    #[default]
    #[serde(rename = "game")]
    FreeRoam,
    /// Guided single-seat story session (`"story"` on the wire). Narrative
    /// text is routed to the beat machine instead of the event log.
    #[serde(rename = "story")]
    Narrative,
}

impl GameMode {
    /// The wire name, as used in JSON payloads and query parameters.
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::FreeRoam => "game",
            GameMode::Narrative => "story",
        }
    }
}

// ── Structs ─────────────────────────────────────────────────────────

/// A player snapshot as the server reports it.
///
/// The server sends additional bookkeeping fields (awareness, focus, AI
/// markers); only the fields the session core consumes are modeled here and
/// the rest are ignored on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Display name, server-confirmed.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_objective: Option<String>,
}

/// Payload for the `welcome` server message.
/// Boxed in `ServerMessage` to reduce enum size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomePayload {
    /// Free-form greeting line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Mode announced by the server. The client's configured mode stays
    /// authoritative; a mismatch is logged, not adopted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<GameMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    pub player: PlayerProfile,
    /// Absolute roster size. Older servers omit it; the session falls back to 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_players: Option<u32>,
    /// 1-based join position. Older servers omit it; the session falls back to 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_code: Option<String>,
}

// ── Batch items ─────────────────────────────────────────────────────

/// A single item inside an `events` batch.
///
/// Items use the same classification as the equivalent top-level tags.
/// The server emits further item tags (`ability_used`, injected events);
/// those land in [`GameEvent::Unknown`] and become generic log entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A player moved between rooms.
    Move { player: String, room: String },
    /// Ambient or narrative text from the AI engine.
    AiEvent {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        room: Option<String>,
    },
    /// Room-scoped table talk.
    Chat {
        player: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        room: Option<String>,
    },
    /// A whisper delivered to this client.
    Whisper {
        player: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        room: Option<String>,
    },
    /// Any item tag this client does not recognize. Preserved, never dropped.
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request to move into a room. The protocol has no denial reply; the
    /// client treats the move as applied the moment it is sent.
    Move { room: String },
    /// Table talk, or a whisper when `whisper` is set and `target` names the
    /// listener.
    Chat {
        message: String,
        whisper: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    /// Use a role ability. Narrative choice selections ride this message too,
    /// carrying the chosen label.
    Ability { ability: String },
}

/// Message types sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full session bootstrap, sent once after the connection is accepted
    /// (boxed to reduce enum size). A later welcome refreshes identity fields.
    Welcome(Box<WelcomePayload>),
    /// Ordered batch of room-scoped events. Items stay raw here so one
    /// malformed item cannot fail the batch; they are classified one at a
    /// time via [`classify_event`].
    Events { events: Vec<serde_json::Value> },
    /// Movement echo for a single player.
    PlayerMoved { player: String, room: String },
    /// A player joined; `total_players` is the absolute roster size.
    PlayerJoined {
        player: PlayerProfile,
        total_players: u32,
    },
    /// A player left; `player` is the bare display name.
    PlayerLeft { player: String, total_players: u32 },
    /// Direct chat delivery. Whispers delivered this way arrive with the
    /// prefix already baked into `message`.
    Chat { player: String, message: String },
    /// Any tag this client does not recognize. Preserved, never dropped.
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

// ── Classification ──────────────────────────────────────────────────

/// Parse one inbound frame. Infallible: unknown tags land in
/// [`ServerMessage::Unknown`] via the untagged catch-all, a recognized tag
/// with a malformed payload is downgraded to `Unknown` carrying the raw JSON,
/// and text that is not JSON at all is wrapped as a JSON string so the
/// content still reaches the log.
pub fn classify(raw: &str) -> ServerMessage {
    match serde_json::from_str::<ServerMessage>(raw) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("inbound frame failed typed parse: {e} — keeping raw content");
            match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(value) => ServerMessage::Unknown(value),
                Err(_) => ServerMessage::Unknown(serde_json::Value::String(raw.to_owned())),
            }
        }
    }
}

/// Classify a single batch item, by the same never-fail policy as
/// [`classify`].
pub fn classify_event(value: serde_json::Value) -> GameEvent {
    match serde_json::from_value::<GameEvent>(value.clone()) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!("batch item failed typed parse: {e} — keeping raw content");
            GameEvent::Unknown(value)
        }
    }
}
