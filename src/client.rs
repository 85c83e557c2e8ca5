//! Async client for live multiplayer sessions.
//!
//! [`SeanceClient`] is a thin handle that communicates with a background
//! transport loop task via an unbounded MPSC channel. Display records are
//! emitted on a bounded channel ([`tokio::sync::mpsc::Receiver<SeanceEvent>`])
//! returned from [`SeanceClient::start`].
//!
//! The loop owns the [`SessionState`] outright: every inbound frame and every
//! queued action is applied there, run to completion, before the next one is
//! looked at. Handles read consistent snapshots through the state accessors.
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect(&url).await?;
//! let config = SeanceConfig::new("ann");
//! let (client, mut events) = SeanceClient::start(transport, config);
//!
//! client.move_to("Kitchen")?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SeanceEvent::Log(entry) => println!("{}", entry.render()),
//!         SeanceEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use crate::error::{Result, SeanceError};
use crate::event::SeanceEvent;
use crate::protocol::{classify, GameMode};
use crate::session::{PlayerAction, SessionIdentity, SessionState};
use crate::transport::Transport;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`SeanceClient`] connection.
///
/// Must be supplied to [`SeanceClient::start`]. The only required field is
/// the player id; all others have sensible defaults.
///
/// # Example
///
/// ```
/// use seance_client::client::SeanceConfig;
///
/// let config = SeanceConfig::new("ann");
/// assert_eq!(config.identity.player_id, "ann");
/// ```
///
/// # Tuning
///
/// ```
/// use seance_client::client::SeanceConfig;
/// use std::time::Duration;
///
/// let config = SeanceConfig::new("ann")
///     .with_event_channel_capacity(512)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct SeanceConfig {
    /// Who is connecting, in which mode, to which story session.
    pub identity: SessionIdentity,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up with incoming server messages, records
    /// are dropped (with a warning logged) to avoid blocking the transport loop.
    /// The `Disconnected` event is always delivered regardless of capacity.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Timeout for the graceful shutdown.
    ///
    /// When [`SeanceClient::shutdown`] is called, the background transport
    /// loop is given this much time to close the transport and emit a final
    /// `Disconnected` event. If the timeout expires the task is aborted.
    ///
    /// Defaults to **1 second**. A zero timeout aborts the transport loop
    /// immediately without waiting for graceful shutdown.
    pub shutdown_timeout: Duration,
}

impl SeanceConfig {
    /// Create a new free-roam configuration for the given player id.
    pub fn new(player_id: impl Into<String>) -> Self {
        Self::from_identity(SessionIdentity::new(player_id))
    }

    /// Create a configuration from a prepared [`SessionIdentity`].
    pub fn from_identity(identity: SessionIdentity) -> Self {
        Self {
            identity,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the operating mode.
    #[must_use]
    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.identity.mode = mode;
        self
    }

    /// Set the shareable room code for a narrative session.
    #[must_use]
    pub fn with_room_code(mut self, room_code: impl Into<String>) -> Self {
        self.identity.room_code = Some(room_code.into());
        self
    }

    /// Cap the bounded event channel at `capacity` records.
    ///
    /// Defaults to **256**; values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Bound the graceful shutdown wait.
    ///
    /// Defaults to **1 second**. Zero skips straight to aborting the
    /// transport loop.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Shared state ────────────────────────────────────────────────────

/// Internal shared state between the client handle and the transport loop.
struct ClientState {
    connected: AtomicBool,
    session: Mutex<SessionState>,
}

impl ClientState {
    fn new(identity: SessionIdentity) -> Self {
        Self {
            connected: AtomicBool::new(true),
            session: Mutex::new(SessionState::new(identity)),
        }
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Async client handle for a live session.
///
/// Created via [`SeanceClient::start`], which spawns a background transport
/// loop and returns this handle together with an event receiver.
///
/// The action methods validate their payload, queue a [`PlayerAction`] to the
/// transport loop, and return immediately once the action is queued (no
/// round-trip await). Local effects — the optimistic room change, chat
/// echoes, log entries — are applied by the loop and surface as
/// [`SeanceEvent`] records.
pub struct SeanceClient {
    /// Sender half of the action channel to the transport loop.
    cmd_tx: mpsc::UnboundedSender<PlayerAction>,
    /// State shared with the transport loop.
    state: Arc<ClientState>,
    /// Join handle for the spawned transport loop.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Fires once to request a graceful loop exit.
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    /// Grace period before shutdown aborts the loop.
    shutdown_timeout: Duration,
}

impl SeanceClient {
    /// Start the client transport loop and return a handle plus event receiver.
    ///
    /// The server speaks first: once the transport is up it delivers a
    /// `welcome` frame that bootstraps the session, so the loop sends nothing
    /// until an action is queued.
    ///
    /// # Arguments
    ///
    /// * `transport` — A connected [`Transport`] implementation.
    /// * `config` — Client configuration including the player identity.
    ///
    /// # Returns
    ///
    /// A tuple of `(client_handle, event_receiver)`. The event receiver yields
    /// [`SeanceEvent`]s until the transport closes or the client shuts down.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        transport: impl Transport,
        config: SeanceConfig,
    ) -> (Self, mpsc::Receiver<SeanceEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<PlayerAction>();
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<SeanceEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = Arc::new(ClientState::new(config.identity));
        let loop_state = Arc::clone(&state);

        let task = tokio::spawn(transport_loop(
            transport,
            cmd_rx,
            event_tx,
            loop_state,
            shutdown_rx,
        ));

        let client = Self {
            cmd_tx,
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    // ── Action methods ──────────────────────────────────────────────

    /// Move into a room.
    ///
    /// The move is applied locally the moment it is queued; the server's
    /// movement echo reconfirms it later. The protocol has no move denial.
    ///
    /// # Errors
    ///
    /// Returns [`SeanceError::EmptyPayload`] for an empty room name and
    /// [`SeanceError::NotConnected`] if the transport has closed.
    pub fn move_to(&self, room: impl Into<String>) -> Result<()> {
        let room = room.into();
        if room.is_empty() {
            return Err(SeanceError::EmptyPayload { field: "room" });
        }
        self.send_action(PlayerAction::Move { room })
    }

    /// Send table talk to everyone in the room.
    ///
    /// The message is echoed into the local chat log under this player's
    /// display name without waiting for the server.
    ///
    /// # Errors
    ///
    /// Returns [`SeanceError::EmptyPayload`] for an empty message and
    /// [`SeanceError::NotConnected`] if the transport has closed.
    pub fn send_chat(&self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        if message.is_empty() {
            return Err(SeanceError::EmptyPayload { field: "message" });
        }
        self.send_action(PlayerAction::Chat { message })
    }

    /// Whisper to a single player.
    ///
    /// The local echo carries the whisper prefix; the server delivers the
    /// plain message to the target only.
    ///
    /// # Errors
    ///
    /// Returns [`SeanceError::EmptyPayload`] when the target or message is
    /// empty and [`SeanceError::NotConnected`] if the transport has closed.
    pub fn send_whisper(
        &self,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<()> {
        let target = target.into();
        let message = message.into();
        if target.is_empty() {
            return Err(SeanceError::EmptyPayload { field: "target" });
        }
        if message.is_empty() {
            return Err(SeanceError::EmptyPayload { field: "message" });
        }
        self.send_action(PlayerAction::Whisper { target, message })
    }

    /// Use a role ability.
    ///
    /// # Errors
    ///
    /// Returns [`SeanceError::EmptyPayload`] for an empty ability name and
    /// [`SeanceError::NotConnected`] if the transport has closed.
    pub fn use_ability(&self, ability: impl Into<String>) -> Result<()> {
        let ability = ability.into();
        if ability.is_empty() {
            return Err(SeanceError::EmptyPayload { field: "ability" });
        }
        self.send_action(PlayerAction::Ability { name: ability })
    }

    /// Select one of the currently offered narrative choices.
    ///
    /// Async because the label is checked against the live choice set before
    /// queueing. The loop re-checks on apply, so a beat that changes in the
    /// gap degrades to a logged no-op rather than a wrong send.
    ///
    /// # Errors
    ///
    /// Returns [`SeanceError::ChoiceUnavailable`] when no beat is waiting or
    /// the label is not among the offered choices, [`SeanceError::EmptyPayload`]
    /// for an empty label, and [`SeanceError::NotConnected`] if the transport
    /// has closed.
    pub async fn select_choice(&self, label: impl Into<String>) -> Result<()> {
        let label = label.into();
        if label.is_empty() {
            return Err(SeanceError::EmptyPayload { field: "choice" });
        }
        if !self.state.connected.load(Ordering::Acquire) {
            debug!("choice selected while disconnected, dropping");
            return Err(SeanceError::NotConnected);
        }
        {
            let session = self.state.session.lock().await;
            if !session.narrative().choices().iter().any(|c| *c == label) {
                return Err(SeanceError::ChoiceUnavailable { label });
            }
        }
        self.send_action(PlayerAction::SelectChoice { label })
    }

    /// Shut down the client, closing the transport and stopping the background task.
    ///
    /// After calling this method, the event receiver will yield `None` once the
    /// transport loop exits.
    pub async fn shutdown(&mut self) {
        debug!("SeanceClient: shutdown requested");

        // Ask the transport loop for a graceful exit.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // Give the loop the configured grace period, then abort so the task
        // cannot outlive the handle.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("transport loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("transport loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("transport loop aborted: {join_err}");
                    }
                }
            }
        }

        self.state.connected.store(false, Ordering::Release);
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Returns `true` if the transport is believed to be connected.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// The display name: server-confirmed after welcome, the requested player
    /// id before.
    pub async fn display_name(&self) -> String {
        self.state.session.lock().await.display_name().to_owned()
    }

    /// The room this player is in, if a welcome has arrived.
    pub async fn current_room(&self) -> Option<String> {
        self.state
            .session
            .lock()
            .await
            .current_room()
            .map(str::to_owned)
    }

    /// The assigned role, if a welcome has arrived.
    pub async fn role(&self) -> Option<String> {
        self.state.session.lock().await.role().map(str::to_owned)
    }

    /// Number of players in the session as last reported by the server.
    pub async fn player_count(&self) -> u32 {
        self.state.session.lock().await.player_count()
    }

    /// This player's 1-based join position.
    pub async fn player_index(&self) -> u32 {
        self.state.session.lock().await.player_index()
    }

    /// The currently offered narrative choices; empty when no beat is waiting.
    pub async fn narrative_choices(&self) -> Vec<String> {
        self.state
            .session
            .lock()
            .await
            .narrative()
            .choices()
            .to_vec()
    }

    /// A full snapshot of the session state, including both logs.
    ///
    /// The snapshot is a clone; it does not track later updates. Rendering
    /// layers that follow the event stream rarely need it, but it is the
    /// simplest way to repaint everything after the consumer fell behind.
    pub async fn session(&self) -> SessionState {
        self.state.session.lock().await.clone()
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Queue a [`PlayerAction`] to the transport loop.
    fn send_action(&self, action: PlayerAction) -> Result<()> {
        if !self.state.connected.load(Ordering::Acquire) {
            debug!(
                "action while disconnected: {:?} — dropping",
                std::mem::discriminant(&action)
            );
            return Err(SeanceError::NotConnected);
        }
        self.cmd_tx
            .send(action)
            .map_err(|_| SeanceError::NotConnected)
    }
}

impl std::fmt::Debug for SeanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeanceClient")
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for SeanceClient {
    fn drop(&mut self) {
        // No async context inside `Drop`, so a graceful close is off the
        // table: firing the `shutdown_tx` oneshot would start a path that
        // awaits `transport.close()` with nothing left to drive it. Aborting
        // the task drops the transport loop future immediately instead.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Transport loop ──────────────────────────────────────────────────

/// Background transport loop that multiplexes send/receive via `tokio::select!`.
///
/// Exits when:
/// - The action channel closes (client handle dropped or shutdown called)
/// - The transport returns `None` (server closed connection)
/// - A transport error occurs
async fn transport_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<PlayerAction>,
    event_tx: mpsc::Sender<SeanceEvent>,
    state: Arc<ClientState>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    debug!("transport loop started");

    // Emit the synthetic Connected event before entering the select loop.
    emit_event(&event_tx, SeanceEvent::Connected).await;

    loop {
        tokio::select! {
            // Branch 1: queued action from the client handle
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(action) => {
                        debug!("applying player action: {:?}", std::mem::discriminant(&action));
                        let (outbound, records) = {
                            let mut session = state.session.lock().await;
                            session.apply_action(action)
                        };
                        for record in records {
                            emit_event(&event_tx, record).await;
                        }
                        if let Some(message) = outbound {
                            match serde_json::to_string(&message) {
                                Ok(json) => {
                                    if let Err(e) = transport.send(json).await {
                                        error!("transport send error: {e}");
                                        emit_disconnected(
                                            &event_tx,
                                            &state,
                                            false,
                                            Some(format!("transport send error: {e}")),
                                        ).await;
                                        break;
                                    }
                                }
                                Err(e) => {
                                    error!("failed to serialize ClientMessage: {e}");
                                    // Serialization errors are programming bugs; don't kill the loop.
                                }
                            }
                        }
                    }
                    // Action channel closed — client handle dropped.
                    None => {
                        debug!("action channel closed, shutting down transport loop");
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &state, true, Some("client shut down".into())).await;
                        break;
                    }
                }
            }

            // Branch 2: shutdown signal
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &state, true, Some("client shut down".into())).await;
                break;
            }

            // Branch 3: incoming message from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        // Classification is total: unknown and malformed
                        // frames come back as messages too, so every frame
                        // reaches the session.
                        let message = classify(&text);
                        let records = {
                            let mut session = state.session.lock().await;
                            session.apply_message(message)
                        };
                        for record in records {
                            emit_event(&event_tx, record).await;
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        emit_disconnected(
                            &event_tx,
                            &state,
                            false,
                            Some(format!("transport receive error: {e}")),
                        ).await;
                        break;
                    }
                    // Transport closed cleanly.
                    None => {
                        debug!("transport closed by server");
                        emit_disconnected(&event_tx, &state, true, None).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("transport loop exited");
}

/// Offer a display record to the event channel. A full channel drops the
/// record with a warning; the transport loop never blocks on a slow consumer.
async fn emit_event(event_tx: &mpsc::Sender<SeanceEvent>, event: SeanceEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit a [`Disconnected`](SeanceEvent::Disconnected) event and update state.
///
/// Delivered with a blocking `send().await` rather than `try_send`:
/// `Disconnected` is the stream's final record and has to arrive even when
/// the channel is full.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<SeanceEvent>,
    state: &ClientState,
    clean: bool,
    detail: Option<String>,
) {
    state.connected.store(false, Ordering::Release);
    let event = SeanceEvent::Disconnected { clean, detail };
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::ClientMessage;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// Scripted transport: replays queued frames on `recv()` and records
    /// whatever `send()` saw.
    struct MockTransport {
        /// Frames `recv()` hands out in order.
        incoming: VecDeque<Option<std::result::Result<String, SeanceError>>>,
        /// Everything the client sent.
        sent: Arc<StdMutex<Vec<String>>>,
        /// Set once `close()` has run.
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(
            incoming: Vec<Option<std::result::Result<String, SeanceError>>>,
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
        async fn send(&mut self, message: String) -> std::result::Result<(), SeanceError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, SeanceError>> {
            if let Some(item) = self.incoming.pop_front() {
                // An explicit `None` entry signals a clean transport close;
                // `Some(result)` delivers the scripted message or error.
                item
            } else {
                // Out of script. Park until the test shuts the client down.
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> std::result::Result<(), SeanceError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn welcome_json() -> String {
        serde_json::json!({
            "type": "welcome",
            "message": "Welcome Ann!",
            "mode": "game",
            "difficulty": "normal",
            "player": {
                "name": "Ann",
                "current_room": "Library",
                "role": "Detective",
                "abilities": ["Investigate"],
                "personal_objective": "Find the hidden culprit"
            },
            "total_players": 1,
            "player_index": 1,
            "room_code": null
        })
        .to_string()
    }

    fn chat_json(player: &str, message: &str) -> String {
        serde_json::json!({"type": "chat", "player": player, "message": message}).to_string()
    }

    fn narration_batch_json(text: &str) -> String {
        serde_json::json!({
            "type": "events",
            "events": [{"type": "ai_event", "text": text, "room": "Library"}]
        })
        .to_string()
    }

    /// Drain the Connected, Welcome and greeting-log records after start.
    async fn drain_welcome(events: &mut mpsc::Receiver<SeanceEvent>) {
        let _ = events.recv().await; // Connected
        let _ = events.recv().await; // Welcome
        let _ = events.recv().await; // Log (greeting)
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn connected_is_first_event() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(welcome_json()))]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));

        let first = events.recv().await.unwrap();
        assert!(
            matches!(first, SeanceEvent::Connected),
            "expected Connected as first event, got {first:?}"
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn welcome_populates_the_session() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(welcome_json()))]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));

        let _ = events.recv().await; // Connected
        let event = events.recv().await.unwrap();
        if let SeanceEvent::Welcome {
            player,
            player_count,
            player_index,
            ..
        } = event
        {
            assert_eq!(player.name, "Ann");
            assert_eq!(player_count, 1);
            assert_eq!(player_index, 1);
        } else {
            panic!("expected Welcome event, got {event:?}");
        }

        // The greeting lands on the event log.
        let event = events.recv().await.unwrap();
        assert!(matches!(event, SeanceEvent::Log(_)));

        assert_eq!(client.current_room().await.as_deref(), Some("Library"));
        assert_eq!(client.role().await.as_deref(), Some("Detective"));
        assert_eq!(client.player_count().await, 1);
        assert_eq!(client.display_name().await, "Ann");

        client.shutdown().await;
    }

    #[tokio::test]
    async fn move_to_applies_locally_and_sends() {
        let (transport, sent, _closed) = MockTransport::new(vec![Some(Ok(welcome_json()))]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));
        drain_welcome(&mut events).await;

        client.move_to("Kitchen").unwrap();

        // The room change surfaces before any server confirmation.
        let event = events.recv().await.unwrap();
        assert!(matches!(event, SeanceEvent::RoomChanged { room } if room == "Kitchen"));
        assert_eq!(client.current_room().await.as_deref(), Some("Kitchen"));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        {
            let messages = sent.lock().unwrap();
            let first: ClientMessage = serde_json::from_str(&messages[0]).unwrap();
            assert!(matches!(first, ClientMessage::Move { room } if room == "Kitchen"));
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn send_chat_echoes_locally() {
        let (transport, sent, _closed) = MockTransport::new(vec![Some(Ok(welcome_json()))]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));
        drain_welcome(&mut events).await;

        client.send_chat("anyone here?").unwrap();

        let event = events.recv().await.unwrap();
        if let SeanceEvent::Chat(entry) = event {
            assert_eq!(entry.speaker, "Ann");
            assert_eq!(entry.text, "anyone here?");
            assert!(!entry.is_whisper);
        } else {
            panic!("expected Chat event, got {event:?}");
        }

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        {
            let messages = sent.lock().unwrap();
            let last: ClientMessage = serde_json::from_str(messages.last().unwrap()).unwrap();
            if let ClientMessage::Chat {
                message,
                whisper,
                target,
            } = last
            {
                assert_eq!(message, "anyone here?");
                assert!(!whisper);
                assert!(target.is_none());
            } else {
                panic!("expected Chat message, got {last:?}");
            }
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn send_whisper_carries_the_target() {
        let (transport, sent, _closed) = MockTransport::new(vec![Some(Ok(welcome_json()))]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));
        drain_welcome(&mut events).await;

        client.send_whisper("Bob", "meet me in the Attic").unwrap();

        let event = events.recv().await.unwrap();
        if let SeanceEvent::Chat(entry) = event {
            assert!(entry.is_whisper);
            assert_eq!(entry.text, "*whispers to Bob* meet me in the Attic");
        } else {
            panic!("expected Chat event, got {event:?}");
        }

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        {
            let messages = sent.lock().unwrap();
            let last: ClientMessage = serde_json::from_str(messages.last().unwrap()).unwrap();
            if let ClientMessage::Chat {
                whisper, target, ..
            } = last
            {
                assert!(whisper);
                assert_eq!(target.as_deref(), Some("Bob"));
            } else {
                panic!("expected Chat message, got {last:?}");
            }
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn use_ability_sends_message() {
        let (transport, sent, _closed) = MockTransport::new(vec![Some(Ok(welcome_json()))]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));
        drain_welcome(&mut events).await;

        client.use_ability("Investigate").unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        {
            let messages = sent.lock().unwrap();
            let last: ClientMessage = serde_json::from_str(messages.last().unwrap()).unwrap();
            assert!(matches!(
                last,
                ClientMessage::Ability { ability } if ability == "Investigate"
            ));
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn empty_payloads_are_rejected() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);

        let (mut client, _events) = SeanceClient::start(transport, SeanceConfig::new("ann"));

        assert!(matches!(
            client.move_to(""),
            Err(SeanceError::EmptyPayload { field: "room" })
        ));
        assert!(matches!(
            client.send_chat(""),
            Err(SeanceError::EmptyPayload { field: "message" })
        ));
        assert!(matches!(
            client.send_whisper("", "psst"),
            Err(SeanceError::EmptyPayload { field: "target" })
        ));
        assert!(matches!(
            client.send_whisper("Bob", ""),
            Err(SeanceError::EmptyPayload { field: "message" })
        ));
        assert!(matches!(
            client.use_ability(""),
            Err(SeanceError::EmptyPayload { field: "ability" })
        ));
        assert!(matches!(
            client.select_choice("").await,
            Err(SeanceError::EmptyPayload { field: "choice" })
        ));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(sent.lock().unwrap().is_empty(), "nothing should be sent");

        client.shutdown().await;
    }

    #[tokio::test]
    async fn select_choice_requires_an_offered_choice() {
        let (transport, sent, _closed) = MockTransport::new(vec![
            Some(Ok(welcome_json())),
            Some(Ok(narration_batch_json("Something moves. It is close."))),
        ]);

        let config = SeanceConfig::new("ann").with_mode(GameMode::Narrative);
        let (mut client, mut events) = SeanceClient::start(transport, config);
        drain_welcome(&mut events).await;

        // Wait for the beat to be presented.
        let event = events.recv().await.unwrap();
        assert!(matches!(event, SeanceEvent::BeatPresented { .. }));

        // A label outside the offered set is refused.
        let err = client.select_choice("Flee").await.unwrap_err();
        assert!(matches!(err, SeanceError::ChoiceUnavailable { label } if label == "Flee"));

        client.select_choice("Investigate").await.unwrap();

        // System log entry, then the acknowledgement.
        let event = events.recv().await.unwrap();
        assert!(matches!(event, SeanceEvent::Log(_)));
        let event = events.recv().await.unwrap();
        assert!(matches!(
            event,
            SeanceEvent::ChoiceAcknowledged { label } if label == "Investigate"
        ));

        assert!(client.narrative_choices().await.is_empty());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        {
            let messages = sent.lock().unwrap();
            assert_eq!(messages.len(), 1, "exactly one outbound message");
            let last: ClientMessage = serde_json::from_str(messages.last().unwrap()).unwrap();
            assert!(matches!(
                last,
                ClientMessage::Ability { ability } if ability == "Investigate"
            ));
        }

        // With the choices cleared, a second selection is refused.
        let err = client.select_choice("Investigate").await.unwrap_err();
        assert!(matches!(err, SeanceError::ChoiceUnavailable { .. }));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn disconnected_on_transport_close() {
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok(welcome_json())),
            // Explicit None signals clean transport close.
            None,
        ]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));
        drain_welcome(&mut events).await;

        let event = events.recv().await.unwrap();
        if let SeanceEvent::Disconnected { clean, detail } = event {
            assert!(clean);
            assert!(detail.is_none());
        } else {
            panic!("expected Disconnected event, got {event:?}");
        }

        assert!(!client.is_connected());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn transport_recv_error_emits_disconnected() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Err(
            SeanceError::TransportReceive("boom".into()),
        ))]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));

        let _ = events.recv().await; // Connected
        let event = events.recv().await.unwrap();
        if let SeanceEvent::Disconnected { clean, detail } = event {
            assert!(!clean);
            assert!(detail.unwrap().contains("boom"));
        } else {
            panic!("expected Disconnected event, got {event:?}");
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn not_connected_error_after_shutdown() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(welcome_json()))]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));
        drain_welcome(&mut events).await;

        client.shutdown().await;

        let result = client.move_to("Kitchen");
        assert!(matches!(result, Err(SeanceError::NotConnected)));
    }

    #[tokio::test]
    async fn malformed_frames_surface_as_generic_entries() {
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok("{not valid json".to_owned())),
            Some(Ok(chat_json("Bob", "still here"))),
        ]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));

        let _ = events.recv().await; // Connected
        let event = events.recv().await.unwrap();
        if let SeanceEvent::Log(entry) = event {
            assert_eq!(entry.text, "{not valid json");
        } else {
            panic!("expected a generic log record, got {event:?}");
        }

        // The loop survives and keeps delivering.
        let event = events.recv().await.unwrap();
        assert!(matches!(event, SeanceEvent::Chat(_)));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn config_defaults() {
        let config = SeanceConfig::new("ann");
        assert_eq!(config.identity.player_id, "ann");
        assert_eq!(config.identity.mode, GameMode::FreeRoam);
        assert!(config.identity.room_code.is_none());
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, std::time::Duration::from_secs(1));
    }

    #[tokio::test]
    async fn config_builder_methods() {
        let config = SeanceConfig::new("ann")
            .with_mode(GameMode::Narrative)
            .with_room_code("QK4N7P")
            .with_event_channel_capacity(512)
            .with_shutdown_timeout(std::time::Duration::from_secs(5));
        assert_eq!(config.identity.mode, GameMode::Narrative);
        assert_eq!(config.identity.room_code.as_deref(), Some("QK4N7P"));
        assert_eq!(config.event_channel_capacity, 512);
        assert_eq!(config.shutdown_timeout, std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn event_channel_capacity_is_clamped_to_one() {
        let config = SeanceConfig::new("ann").with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[tokio::test]
    async fn zero_event_channel_capacity_does_not_panic() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);

        let config = SeanceConfig::new("ann")
            .with_event_channel_capacity(0)
            .with_shutdown_timeout(std::time::Duration::from_millis(50));
        let (mut client, mut events) = SeanceClient::start(transport, config);

        // Should not panic despite capacity 0 — clamped to 1.
        let event = events.recv().await.unwrap();
        assert!(matches!(event, SeanceEvent::Connected));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn small_event_channel_capacity_triggers_backpressure() {
        // Use a capacity of 1 and deliver many messages — records get dropped.
        let mut incoming: Vec<Option<std::result::Result<String, SeanceError>>> = Vec::new();
        incoming.push(Some(Ok(welcome_json())));
        for i in 0..20 {
            incoming.push(Some(Ok(chat_json("Bob", &format!("spam {i}")))));
        }
        incoming.push(None);

        let (transport, _sent, _closed) = MockTransport::new(incoming);

        let config = SeanceConfig::new("ann").with_event_channel_capacity(1);
        let (mut client, mut events) = SeanceClient::start(transport, config);

        // Let the channel fill up and records get dropped.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let mut count = 0;
        while let Some(_event) = events.recv().await {
            count += 1;
        }
        // With capacity 1, we should receive fewer records than were produced.
        // At minimum we get Connected (first try_send succeeds) and Disconnected
        // (always delivered via blocking send().await). Welcome and chat
        // records may be dropped when the single-slot channel is full.
        assert!(count >= 2, "expected at least 2 events, got {count}");
        // But fewer than the total produced (Connected + Welcome + greeting
        // log + 20 chats + Disconnected = 24 possible).
        assert!(
            count < 24,
            "expected backpressure to drop some events, but got all {count}"
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn custom_shutdown_timeout_is_used() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(welcome_json()))]);

        let config =
            SeanceConfig::new("ann").with_shutdown_timeout(std::time::Duration::from_millis(100));
        let (mut client, mut events) = SeanceClient::start(transport, config);
        drain_welcome(&mut events).await;

        // The custom grace period is plenty for a clean exit.
        client.shutdown().await;
        assert!(!client.is_connected());
    }

    /// Transport whose `close()` never returns, for exercising the shutdown
    /// timeout and abort path.
    struct HangingCloseTransport {
        close_called: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
    }

    impl HangingCloseTransport {
        fn new() -> (Self, Arc<AtomicBool>, Arc<AtomicBool>) {
            let close_called = Arc::new(AtomicBool::new(false));
            let dropped = Arc::new(AtomicBool::new(false));
            (
                Self {
                    close_called: Arc::clone(&close_called),
                    dropped: Arc::clone(&dropped),
                },
                close_called,
                dropped,
            )
        }
    }

    impl Drop for HangingCloseTransport {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::Release);
        }
    }

    #[async_trait]
    impl Transport for HangingCloseTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), SeanceError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, SeanceError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), SeanceError> {
            self.close_called.store(true, Ordering::Release);
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn shutdown_timeout_aborts_stuck_transport_task() {
        let (transport, close_called, dropped) = HangingCloseTransport::new();
        let config =
            SeanceConfig::new("ann").with_shutdown_timeout(std::time::Duration::from_millis(20));
        let (mut client, mut events) = SeanceClient::start(transport, config);

        // Drain Connected so the channel remains uncongested.
        let event = events.recv().await.unwrap();
        assert!(matches!(event, SeanceEvent::Connected));

        client.shutdown().await;

        assert!(
            close_called.load(Ordering::Acquire),
            "graceful shutdown should reach transport.close()"
        );
        assert!(
            dropped.load(Ordering::Acquire),
            "the timed-out loop task should be aborted and dropped"
        );
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn double_shutdown_does_not_panic() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(welcome_json()))]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));
        drain_welcome(&mut events).await;

        client.shutdown().await;
        client.shutdown().await; // should not panic
    }

    #[tokio::test]
    async fn drop_without_explicit_shutdown() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(welcome_json()))]);

        let (client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));
        drain_welcome(&mut events).await;

        // Drop the client without calling shutdown.
        drop(client);

        // The transport loop should eventually exit; the event channel
        // will close. We just verify we don't hang or panic.
        while let Some(_event) = events.recv().await {}
    }

    #[tokio::test]
    async fn debug_impl_for_client() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(welcome_json()))]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));
        drain_welcome(&mut events).await;

        let debug_str = format!("{client:?}");
        assert!(debug_str.contains("SeanceClient"));
        assert!(debug_str.contains("connected"));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_emits_disconnected() {
        let (transport, _sent, closed) = MockTransport::new(vec![Some(Ok(welcome_json()))]);

        let (mut client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));
        drain_welcome(&mut events).await;

        client.shutdown().await;

        // After shutdown, a Disconnected event should have been emitted.
        let event = events.recv().await.unwrap();
        if let SeanceEvent::Disconnected { clean, detail } = event {
            assert!(clean);
            assert_eq!(detail.as_deref(), Some("client shut down"));
        } else {
            panic!("expected Disconnected event, got {event:?}");
        }

        // The transport should have been closed.
        assert!(closed.load(Ordering::Relaxed));
    }
}
