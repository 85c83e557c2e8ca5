//! Session state and the inbound message classifier.
//!
//! [`SessionState`] is the single source of truth for local knowledge of a
//! session: identity, location, role, roster size, abilities, objective, the
//! event and chat logs, and the narrative surface. It is exclusively owned by
//! the client's transport loop — rendering layers read snapshots and consume
//! the display records the transition functions return, but never mutate.
//!
//! The transitions themselves ([`SessionState::apply_message`] and
//! [`SessionState::apply_action`]) are plain synchronous functions: given one
//! classified message or one validated user intent they mutate the state and
//! return the [`SeanceEvent`] records a display adapter needs, in order. All
//! channel and task plumbing lives in [`client`](crate::client).

use tracing::warn;

use crate::event::SeanceEvent;
use crate::log::{ChatEntry, ChatLog, EventLog, LogEntry, LogKind};
use crate::narrative::NarrativeState;
use crate::protocol::{
    classify_event, ClientMessage, GameEvent, GameMode, ServerMessage, WelcomePayload,
};

/// The locations a session can place a player in. The server only ever
/// reports rooms from this set; display layers use it to draw movement
/// targets before the first welcome arrives.
pub const KNOWN_ROOMS: [&str; 5] = ["Library", "Kitchen", "Hallway", "Basement", "Attic"];

// ── Identity ────────────────────────────────────────────────────────

/// Immutable per-connection identity, fixed before the transport is opened.
///
/// The server may confirm a different display name at welcome; that lands in
/// [`SessionState`], never here.
///
/// # Example
///
/// ```
/// use seance_client::protocol::GameMode;
/// use seance_client::session::SessionIdentity;
///
/// let identity = SessionIdentity::new("Ann")
///     .with_mode(GameMode::Narrative)
///     .with_room_code("QK4N7P");
/// assert_eq!(identity.player_id, "Ann");
/// ```
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    /// Requested player id, also the display name until welcome confirms one.
    pub player_id: String,
    /// Operating mode; decides whether narration feeds the beat machine.
    pub mode: GameMode,
    /// Shareable session code (narrative mode only).
    pub room_code: Option<String>,
}

impl SessionIdentity {
    /// Create a free-roam identity with the given player id.
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            mode: GameMode::default(),
            room_code: None,
        }
    }

    /// Set the operating mode.
    #[must_use]
    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the shareable room code for a narrative session.
    #[must_use]
    pub fn with_room_code(mut self, room_code: impl Into<String>) -> Self {
        self.room_code = Some(room_code.into());
        self
    }
}

// ── Actions ─────────────────────────────────────────────────────────

/// A validated user intent, queued by the dispatcher methods on the client
/// handle and applied inside the transport loop.
#[derive(Debug, Clone)]
pub enum PlayerAction {
    /// Move into a room (optimistic: applied locally when sent).
    Move { room: String },
    /// Table talk, locally echoed under the sender's display name.
    Chat { message: String },
    /// Whisper to one listener, locally echoed with the whisper prefix.
    Whisper { target: String, message: String },
    /// Use a role ability.
    Ability { name: String },
    /// Select an offered narrative choice.
    SelectChoice { label: String },
}

// ── Session state ───────────────────────────────────────────────────

/// Local knowledge of one session.
#[derive(Debug, Clone)]
pub struct SessionState {
    identity: SessionIdentity,
    /// Server-confirmed display name; `None` until welcome.
    player_name: Option<String>,
    /// Authoritative location; `None` before welcome.
    current_room: Option<String>,
    role: Option<String>,
    abilities: Vec<String>,
    personal_objective: Option<String>,
    difficulty: Option<String>,
    /// Absolute roster size as last reported by the server.
    player_count: u32,
    /// 1-based join position.
    player_index: u32,
    room_code: Option<String>,
    events: EventLog,
    chat: ChatLog,
    narrative: NarrativeState,
}

impl SessionState {
    /// Fresh pre-welcome state for the given identity.
    pub fn new(identity: SessionIdentity) -> Self {
        let room_code = identity.room_code.clone();
        Self {
            identity,
            player_name: None,
            current_room: None,
            role: None,
            abilities: Vec::new(),
            personal_objective: None,
            difficulty: None,
            player_count: 0,
            player_index: 1,
            room_code,
            events: EventLog::default(),
            chat: ChatLog::default(),
            narrative: NarrativeState::default(),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Display name: the server-confirmed name once welcome has landed, the
    /// requested player id before that.
    pub fn display_name(&self) -> &str {
        self.player_name
            .as_deref()
            .unwrap_or(&self.identity.player_id)
    }

    pub fn current_room(&self) -> Option<&str> {
        self.current_room.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn abilities(&self) -> &[String] {
        &self.abilities
    }

    pub fn personal_objective(&self) -> Option<&str> {
        self.personal_objective.as_deref()
    }

    pub fn difficulty(&self) -> Option<&str> {
        self.difficulty.as_deref()
    }

    pub fn player_count(&self) -> u32 {
        self.player_count
    }

    pub fn player_index(&self) -> u32 {
        self.player_index
    }

    pub fn room_code(&self) -> Option<&str> {
        self.room_code.as_deref()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    pub fn chat_log(&self) -> &ChatLog {
        &self.chat
    }

    pub fn narrative(&self) -> &NarrativeState {
        &self.narrative
    }

    // ── Inbound transitions ─────────────────────────────────────────

    /// Apply one classified server message and return its display records.
    ///
    /// Never fails: unrecognized and malformed content is preserved as
    /// generic log entries. Batch items are applied strictly in batch order.
    pub fn apply_message(&mut self, message: ServerMessage) -> Vec<SeanceEvent> {
        match message {
            ServerMessage::Welcome(payload) => self.apply_welcome(*payload),
            ServerMessage::Events { events } => events
                .into_iter()
                .flat_map(|item| self.apply_game_event(classify_event(item)))
                .collect(),
            ServerMessage::PlayerMoved { player, room } => self.apply_movement(player, room),
            ServerMessage::PlayerJoined {
                player,
                total_players,
            } => {
                self.player_count = total_players;
                vec![
                    self.push_log(LogKind::Join, format!("{} joined the game", player.name)),
                    SeanceEvent::PlayerCountChanged {
                        count: total_players,
                    },
                ]
            }
            ServerMessage::PlayerLeft {
                player,
                total_players,
            } => {
                self.player_count = total_players;
                vec![
                    self.push_log(LogKind::Leave, format!("{player} left the game")),
                    SeanceEvent::PlayerCountChanged {
                        count: total_players,
                    },
                ]
            }
            ServerMessage::Chat { player, message } => {
                vec![self.push_chat(player, message, false)]
            }
            // Tags with no top-level variant share the batch-item
            // classification, so a top-level `ai_event` still reaches the
            // narrative machine and everything else lands in the log.
            ServerMessage::Unknown(value) => match classify_event(value) {
                GameEvent::Unknown(raw) => {
                    vec![self.push_log(LogKind::Generic, generic_text(&raw))]
                }
                event => self.apply_game_event(event),
            },
        }
    }

    fn apply_welcome(&mut self, payload: WelcomePayload) -> Vec<SeanceEvent> {
        let WelcomePayload {
            message,
            mode,
            difficulty,
            player,
            total_players,
            player_index,
            room_code,
        } = payload;

        if let Some(announced) = mode {
            if announced != self.identity.mode {
                warn!(
                    announced = ?announced,
                    configured = ?self.identity.mode,
                    "server announced a different mode; keeping the configured one"
                );
            }
        }

        self.player_name = Some(player.name.clone());
        self.current_room = player.current_room.clone();
        self.role = player.role.clone();
        self.abilities = player.abilities.clone();
        self.personal_objective = player.personal_objective.clone();
        self.difficulty = difficulty;
        self.player_count = total_players.unwrap_or(1);
        self.player_index = player_index.unwrap_or(1).max(1);
        if room_code.is_some() {
            self.room_code = room_code;
        }

        let greeting = message.unwrap_or_else(|| match self.current_room.as_deref() {
            Some(room) => format!("Welcome {}! You are in the {room}.", player.name),
            None => format!("Welcome {}!", player.name),
        });

        let welcome = SeanceEvent::Welcome {
            player,
            player_count: self.player_count,
            player_index: self.player_index,
            room_code: self.room_code.clone(),
        };
        let log = self.push_log(LogKind::System, greeting);
        vec![welcome, log]
    }

    /// Movement echoes update `current_room` only for this player, and only
    /// when the room actually differs — re-echoes of a room already applied
    /// optimistically are no-ops on state. Every echo is logged.
    fn apply_movement(&mut self, player: String, room: String) -> Vec<SeanceEvent> {
        let mut records = Vec::new();
        if self.display_name() == player && self.current_room.as_deref() != Some(room.as_str()) {
            self.current_room = Some(room.clone());
            records.push(SeanceEvent::RoomChanged { room: room.clone() });
        }
        records.push(self.push_log(LogKind::Movement, format!("{player} moved to {room}")));
        records
    }

    fn apply_game_event(&mut self, event: GameEvent) -> Vec<SeanceEvent> {
        match event {
            GameEvent::Move { player, room } => self.apply_movement(player, room),
            GameEvent::AiEvent { text, .. } => self.apply_narration(text),
            GameEvent::Chat {
                player, message, ..
            } => vec![self.push_chat(player, message, false)],
            GameEvent::Whisper {
                player, message, ..
            } => vec![self.push_chat(player, format!("*whispers* {message}"), true)],
            GameEvent::Unknown(value) => {
                vec![self.push_log(LogKind::Generic, generic_text(&value))]
            }
        }
    }

    /// Narration routes by mode: free-roam sessions log it, narrative
    /// sessions hand it to the beat machine instead of the log.
    fn apply_narration(&mut self, text: String) -> Vec<SeanceEvent> {
        match self.identity.mode {
            GameMode::FreeRoam => vec![self.push_log(LogKind::AiNarration, text)],
            GameMode::Narrative => {
                let beat = self.narrative.present(&text);
                vec![SeanceEvent::BeatPresented {
                    text: beat,
                    choices: self.narrative.choices().to_vec(),
                }]
            }
        }
    }

    // ── Outbound transitions ────────────────────────────────────────

    /// Apply one user action: mutate local state (optimistic move, local
    /// echoes) and produce the outbound message plus display records.
    ///
    /// Choice selections that no longer match an offered choice produce no
    /// outbound message and no records; everything else maps to exactly one
    /// outbound message.
    pub fn apply_action(
        &mut self,
        action: PlayerAction,
    ) -> (Option<ClientMessage>, Vec<SeanceEvent>) {
        match action {
            PlayerAction::Move { room } => {
                self.current_room = Some(room.clone());
                (
                    Some(ClientMessage::Move { room: room.clone() }),
                    vec![SeanceEvent::RoomChanged { room }],
                )
            }
            PlayerAction::Chat { message } => {
                let speaker = self.display_name().to_owned();
                let echo = self.push_chat(speaker, message.clone(), false);
                (
                    Some(ClientMessage::Chat {
                        message,
                        whisper: false,
                        target: None,
                    }),
                    vec![echo],
                )
            }
            PlayerAction::Whisper { target, message } => {
                let speaker = self.display_name().to_owned();
                let echo = self.push_chat(
                    speaker,
                    format!("*whispers to {target}* {message}"),
                    true,
                );
                (
                    Some(ClientMessage::Chat {
                        message,
                        whisper: true,
                        target: Some(target),
                    }),
                    vec![echo],
                )
            }
            PlayerAction::Ability { name } => {
                let entry = self.push_log(LogKind::Ability, format!("You use {name}."));
                (
                    Some(ClientMessage::Ability { ability: name }),
                    vec![entry],
                )
            }
            PlayerAction::SelectChoice { label } => {
                if self.narrative.select(&label) {
                    let entry = self.push_log(LogKind::System, format!("You chose: {label}"));
                    (
                        Some(ClientMessage::Ability {
                            ability: label.clone(),
                        }),
                        vec![entry, SeanceEvent::ChoiceAcknowledged { label }],
                    )
                } else {
                    warn!(label = %label, "selection does not match an offered choice; dropping");
                    (None, Vec::new())
                }
            }
        }
    }

    // ── Log helpers ─────────────────────────────────────────────────

    fn push_log(&mut self, kind: LogKind, text: String) -> SeanceEvent {
        let entry = LogEntry::new(kind, text);
        self.events.append(entry.clone());
        SeanceEvent::Log(entry)
    }

    fn push_chat(&mut self, speaker: String, text: String, is_whisper: bool) -> SeanceEvent {
        let entry = ChatEntry::new(speaker, text, is_whisper);
        self.chat.append(entry.clone());
        SeanceEvent::Chat(entry)
    }
}

/// Raw structural dump for generic entries. Content that never parsed as
/// JSON was wrapped as a JSON string by the classifier; unwrap it so the log
/// shows the original text.
fn generic_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::narrative::{NarrativePhase, DEFAULT_CHOICES};
    use crate::protocol::{classify, PlayerProfile};

    fn free_roam_state(name: &str) -> SessionState {
        SessionState::new(SessionIdentity::new(name))
    }

    fn narrative_state(name: &str) -> SessionState {
        SessionState::new(SessionIdentity::new(name).with_mode(GameMode::Narrative))
    }

    fn welcome(name: &str, room: &str, role: &str, total: Option<u32>) -> ServerMessage {
        ServerMessage::Welcome(Box::new(WelcomePayload {
            message: None,
            mode: None,
            difficulty: None,
            player: PlayerProfile {
                name: name.to_owned(),
                current_room: Some(room.to_owned()),
                role: Some(role.to_owned()),
                abilities: vec!["Investigate".to_owned()],
                personal_objective: Some("Find the hidden culprit".to_owned()),
            },
            total_players: total,
            player_index: total.map(|_| 1),
            room_code: None,
        }))
    }

    #[test]
    fn welcome_bootstraps_the_session() {
        let mut state = free_roam_state("Ann");
        let records = state.apply_message(welcome("Ann", "Library", "Detective", Some(1)));

        assert_eq!(state.current_room(), Some("Library"));
        assert_eq!(state.role(), Some("Detective"));
        assert_eq!(state.player_count(), 1);
        assert_eq!(state.abilities(), ["Investigate"]);
        assert_eq!(state.personal_objective(), Some("Find the hidden culprit"));

        assert!(matches!(records.first(), Some(SeanceEvent::Welcome { .. })));
        if let Some(SeanceEvent::Log(entry)) = records.get(1) {
            assert_eq!(entry.kind, LogKind::System);
            assert!(entry.text.contains("Welcome Ann"));
        } else {
            panic!("expected a system log record, got {records:?}");
        }
    }

    #[test]
    fn welcome_without_totals_falls_back_to_one() {
        let mut state = free_roam_state("Solo");
        state.apply_message(welcome("Solo", "Hallway", "Witness", None));
        assert_eq!(state.player_count(), 1);
        assert_eq!(state.player_index(), 1);
    }

    #[test]
    fn roster_tracks_the_last_absolute_total() {
        let mut state = free_roam_state("Ann");
        state.apply_message(welcome("Ann", "Library", "Detective", Some(1)));

        for (total, expected) in [(2, 2), (5, 5), (3, 3)] {
            state.apply_message(ServerMessage::PlayerJoined {
                player: PlayerProfile {
                    name: format!("Guest{total}"),
                    current_room: None,
                    role: None,
                    abilities: Vec::new(),
                    personal_objective: None,
                },
                total_players: total,
            });
            assert_eq!(state.player_count(), expected);
        }

        state.apply_message(ServerMessage::PlayerLeft {
            player: "Guest5".to_owned(),
            total_players: 2,
        });
        assert_eq!(state.player_count(), 2, "totals are absolute, not deltas");
    }

    #[test]
    fn join_and_leave_append_log_entries() {
        let mut state = free_roam_state("Ann");
        state.apply_message(ServerMessage::PlayerJoined {
            player: PlayerProfile {
                name: "Bob".to_owned(),
                current_room: None,
                role: None,
                abilities: Vec::new(),
                personal_objective: None,
            },
            total_players: 2,
        });
        state.apply_message(ServerMessage::PlayerLeft {
            player: "Bob".to_owned(),
            total_players: 1,
        });

        let log = state.event_log().entries();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].kind, LogKind::Join);
        assert_eq!(log[0].text, "Bob joined the game");
        assert_eq!(log[1].kind, LogKind::Leave);
        assert_eq!(log[1].text, "Bob left the game");
    }

    #[test]
    fn movement_echo_is_idempotent_on_state() {
        let mut state = free_roam_state("Ann");
        state.apply_message(welcome("Ann", "Library", "Detective", Some(1)));

        let first = state.apply_message(ServerMessage::PlayerMoved {
            player: "Ann".to_owned(),
            room: "Kitchen".to_owned(),
        });
        assert_eq!(state.current_room(), Some("Kitchen"));
        assert!(first
            .iter()
            .any(|r| matches!(r, SeanceEvent::RoomChanged { room } if room == "Kitchen")));

        let second = state.apply_message(ServerMessage::PlayerMoved {
            player: "Ann".to_owned(),
            room: "Kitchen".to_owned(),
        });
        assert_eq!(state.current_room(), Some("Kitchen"));
        assert!(
            !second.iter().any(|r| matches!(r, SeanceEvent::RoomChanged { .. })),
            "a re-echo of the same room must not report a state change"
        );
        // Both echoes still log — the log is append-only with no dedup.
        assert_eq!(state.event_log().len(), 3);
    }

    #[test]
    fn other_players_movement_only_logs() {
        let mut state = free_roam_state("Ann");
        state.apply_message(welcome("Ann", "Library", "Detective", Some(2)));
        state.apply_message(ServerMessage::PlayerMoved {
            player: "Bob".to_owned(),
            room: "Attic".to_owned(),
        });
        assert_eq!(state.current_room(), Some("Library"));
        let last = state.event_log().entries().last().unwrap();
        assert_eq!(last.kind, LogKind::Movement);
        assert_eq!(last.text, "Bob moved to Attic");
    }

    #[test]
    fn batch_items_apply_in_order() {
        let mut state = free_roam_state("Ann");
        state.apply_message(welcome("Ann", "Library", "Detective", Some(2)));
        state.apply_message(ServerMessage::Events {
            events: vec![
                serde_json::json!({"type": "move", "player": "Bob", "room": "Kitchen"}),
                serde_json::json!({"type": "ai_event", "text": "The air grows cold in Kitchen.", "room": "Kitchen"}),
                serde_json::json!({"type": "ability_used", "player": "Bob", "ability": "Hide"}),
            ],
        });

        let log = state.event_log().entries();
        // welcome system entry + three batch entries, in batch order
        assert_eq!(log.len(), 4);
        assert_eq!(log[1].kind, LogKind::Movement);
        assert_eq!(log[2].kind, LogKind::AiNarration);
        assert_eq!(log[3].kind, LogKind::Generic);
        assert!(log[3].text.contains("ability_used"));
    }

    #[test]
    fn batch_chat_and_whisper_reach_the_chat_log() {
        let mut state = free_roam_state("Ann");
        state.apply_message(ServerMessage::Events {
            events: vec![
                serde_json::json!({"type": "chat", "player": "Bob", "message": "hello", "room": "Library"}),
                serde_json::json!({"type": "whisper", "player": "Cleo", "message": "psst", "room": "Library"}),
            ],
        });

        let chat = state.chat_log().entries();
        assert_eq!(chat.len(), 2);
        assert_eq!(chat[0].speaker, "Bob");
        assert_eq!(chat[0].text, "hello");
        assert!(!chat[0].is_whisper);
        assert_eq!(chat[1].speaker, "Cleo");
        assert_eq!(chat[1].text, "*whispers* psst");
        assert!(chat[1].is_whisper);
        assert!(state.event_log().is_empty(), "chat stays off the event log");
    }

    #[test]
    fn unknown_tags_become_generic_entries() {
        let mut state = free_roam_state("Ann");
        state.apply_message(classify(r#"{"type": "seance_circle", "candles": 5}"#));
        let last = state.event_log().entries().last().unwrap();
        assert_eq!(last.kind, LogKind::Generic);
        assert!(last.text.contains("seance_circle"));
    }

    #[test]
    fn unparseable_frame_keeps_raw_text() {
        let mut state = free_roam_state("Ann");
        state.apply_message(classify("not json at all"));
        let last = state.event_log().entries().last().unwrap();
        assert_eq!(last.kind, LogKind::Generic);
        assert_eq!(last.text, "not json at all");
    }

    #[test]
    fn top_level_ai_event_routes_like_a_batch_item() {
        let mut state = free_roam_state("Ann");
        state.apply_message(classify(
            r#"{"type": "ai_event", "text": "Shadows flicker in Basement.", "room": "Basement"}"#,
        ));
        let last = state.event_log().entries().last().unwrap();
        assert_eq!(last.kind, LogKind::AiNarration);
        assert_eq!(last.text, "Shadows flicker in Basement.");
    }

    #[test]
    fn narrative_mode_routes_narration_to_the_beat_machine() {
        let mut state = narrative_state("Ann");
        let records = state.apply_message(ServerMessage::Events {
            events: vec![serde_json::json!({
                "type": "ai_event",
                "text": "A door creaks. Footsteps echo. Silence falls. Something moves. The lights flicker."
            })],
        });

        assert!(state.event_log().is_empty(), "narration bypasses the log in narrative mode");
        assert_eq!(state.narrative().phase(), NarrativePhase::BeatPresented);
        assert_eq!(
            state.narrative().display_text(),
            Some("A door creaks. Footsteps echo. Silence falls.")
        );
        if let Some(SeanceEvent::BeatPresented { text, choices }) = records.first() {
            assert_eq!(text, "A door creaks. Footsteps echo. Silence falls.");
            assert_eq!(choices.as_slice(), DEFAULT_CHOICES);
        } else {
            panic!("expected a BeatPresented record, got {records:?}");
        }
    }

    #[test]
    fn free_roam_narration_stays_on_the_log() {
        let mut state = free_roam_state("Ann");
        state.apply_message(ServerMessage::Events {
            events: vec![serde_json::json!({"type": "ai_event", "text": "Something moves in Attic!"})],
        });
        assert_eq!(state.narrative().phase(), NarrativePhase::Idle);
        let last = state.event_log().entries().last().unwrap();
        assert_eq!(last.kind, LogKind::AiNarration);
    }

    #[test]
    fn optimistic_move_applies_before_any_echo() {
        let mut state = free_roam_state("Ann");
        state.apply_message(welcome("Ann", "Library", "Detective", Some(1)));

        let (outbound, records) = state.apply_action(PlayerAction::Move {
            room: "Kitchen".to_owned(),
        });
        assert_eq!(state.current_room(), Some("Kitchen"));
        assert!(matches!(outbound, Some(ClientMessage::Move { room }) if room == "Kitchen"));
        assert!(records
            .iter()
            .any(|r| matches!(r, SeanceEvent::RoomChanged { room } if room == "Kitchen")));

        // The echo that follows reconfirms without a second state change.
        let echo = state.apply_message(ServerMessage::PlayerMoved {
            player: "Ann".to_owned(),
            room: "Kitchen".to_owned(),
        });
        assert!(!echo.iter().any(|r| matches!(r, SeanceEvent::RoomChanged { .. })));
        assert_eq!(state.current_room(), Some("Kitchen"));
    }

    #[test]
    fn chat_action_echoes_under_the_display_name() {
        let mut state = free_roam_state("Ann");
        state.apply_message(welcome("Ann", "Library", "Detective", Some(1)));

        let (outbound, _) = state.apply_action(PlayerAction::Chat {
            message: "anyone here?".to_owned(),
        });
        assert!(matches!(
            outbound,
            Some(ClientMessage::Chat { whisper: false, target: None, .. })
        ));
        let last = state.chat_log().entries().last().unwrap();
        assert_eq!(last.speaker, "Ann");
        assert_eq!(last.text, "anyone here?");
        assert!(!last.is_whisper);
    }

    #[test]
    fn whisper_action_echoes_with_target_prefix() {
        let mut state = free_roam_state("Ann");
        let (outbound, _) = state.apply_action(PlayerAction::Whisper {
            target: "Bob".to_owned(),
            message: "meet me in the Attic".to_owned(),
        });

        if let Some(ClientMessage::Chat {
            message,
            whisper,
            target,
        }) = outbound
        {
            assert_eq!(message, "meet me in the Attic");
            assert!(whisper);
            assert_eq!(target.as_deref(), Some("Bob"));
        } else {
            panic!("expected a chat message, got {outbound:?}");
        }

        let last = state.chat_log().entries().last().unwrap();
        assert!(last.is_whisper);
        assert_eq!(last.text, "*whispers to Bob* meet me in the Attic");
    }

    #[test]
    fn ability_action_logs_and_sends() {
        let mut state = free_roam_state("Ann");
        let (outbound, _) = state.apply_action(PlayerAction::Ability {
            name: "Investigate".to_owned(),
        });
        assert!(matches!(
            outbound,
            Some(ClientMessage::Ability { ability }) if ability == "Investigate"
        ));
        let last = state.event_log().entries().last().unwrap();
        assert_eq!(last.kind, LogKind::Ability);
        assert_eq!(last.text, "You use Investigate.");
    }

    #[test]
    fn selecting_a_choice_clears_it_and_sends_one_ability() {
        let mut state = narrative_state("Ann");
        state.apply_message(ServerMessage::Events {
            events: vec![serde_json::json!({"type": "ai_event", "text": "Something moves."})],
        });

        let (outbound, records) = state.apply_action(PlayerAction::SelectChoice {
            label: "Investigate".to_owned(),
        });
        assert!(matches!(
            outbound,
            Some(ClientMessage::Ability { ability }) if ability == "Investigate"
        ));
        assert_eq!(state.narrative().phase(), NarrativePhase::Idle);
        assert!(state.narrative().choices().is_empty());
        assert_eq!(
            state.narrative().display_text(),
            Some(crate::narrative::CHOICE_ACK)
        );
        assert!(records
            .iter()
            .any(|r| matches!(r, SeanceEvent::ChoiceAcknowledged { label } if label == "Investigate")));
        let last = state.event_log().entries().last().unwrap();
        assert_eq!(last.kind, LogKind::System);
        assert_eq!(last.text, "You chose: Investigate");
    }

    #[test]
    fn stale_choice_selection_sends_nothing() {
        let mut state = narrative_state("Ann");
        let (outbound, records) = state.apply_action(PlayerAction::SelectChoice {
            label: "Investigate".to_owned(),
        });
        assert!(outbound.is_none());
        assert!(records.is_empty());
        assert!(state.event_log().is_empty());
    }

    #[test]
    fn welcome_confirms_a_server_assigned_name() {
        let mut state = free_roam_state("guest-7");
        state.apply_message(welcome("Madame Vesna", "Hallway", "Informant", Some(1)));
        assert_eq!(state.display_name(), "Madame Vesna");

        // Echoes for the confirmed name now count as our own movement.
        state.apply_message(ServerMessage::PlayerMoved {
            player: "Madame Vesna".to_owned(),
            room: "Basement".to_owned(),
        });
        assert_eq!(state.current_room(), Some("Basement"));
    }

    #[test]
    fn known_rooms_cover_the_manor() {
        assert_eq!(KNOWN_ROOMS.len(), 5);
        assert!(KNOWN_ROOMS.contains(&"Hallway"));
    }
}
