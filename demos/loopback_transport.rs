//! # Loopback Transport Example
//!
//! Shows how to implement the [`Transport`] trait with a simple in-process
//! loopback channel. This is useful for:
//!
//! - **Testing** — exercise session logic without a real server
//! - **Custom backends** — adapt any I/O layer (TCP, QUIC, WebRTC data channels)
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback_transport
//! ```

use async_trait::async_trait;
use seance_client::{SeanceClient, SeanceConfig, SeanceError, SeanceEvent, Transport};
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Step 1: A channel-backed loopback transport
// ─────────────────────────────────────────────────────────────────────

/// In-process stand-in for a session server connection.
///
/// Two halves, joined by a pair of unbounded channels:
/// - `LoopbackTransport` is the client half; it implements [`Transport`] and
///   goes into `SeanceClient::start`.
/// - [`LoopbackServer`] is the half this example scripts: it injects frames
///   and watches what the client sent.
pub struct LoopbackTransport {
    /// Outbound frames, read by the server half.
    tx: mpsc::UnboundedSender<String>,
    /// Inbound frames, written by the server half.
    rx: mpsc::UnboundedReceiver<String>,
}

/// The scripted server half of the loopback.
pub struct LoopbackServer {
    /// Frames the client sent.
    pub rx: mpsc::UnboundedReceiver<String>,
    /// Frames to deliver to the client, as if from a session server.
    pub tx: mpsc::UnboundedSender<String>,
}

/// A connected `(transport, server)` pair.
fn loopback_pair() -> (LoopbackTransport, LoopbackServer) {
    // One channel per direction.
    let (client_tx, server_rx) = mpsc::unbounded_channel();
    let (server_tx, client_rx) = mpsc::unbounded_channel();

    let transport = LoopbackTransport {
        tx: client_tx,
        rx: client_rx,
    };
    let server = LoopbackServer {
        rx: server_rx,
        tx: server_tx,
    };

    (transport, server)
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: Implement Transport for the client half
// ─────────────────────────────────────────────────────────────────────

#[async_trait]
impl Transport for LoopbackTransport {
    /// Hand a JSON frame to the server half.
    async fn send(&mut self, message: String) -> Result<(), SeanceError> {
        self.tx
            .send(message)
            .map_err(|e| SeanceError::TransportSend(e.to_string()))
    }

    /// Next frame from the server half.
    ///
    /// Yields `None` once the server's sender is dropped, which is how the
    /// client learns the connection ended. Cancel-safe because
    /// `mpsc::UnboundedReceiver::recv` is.
    async fn recv(&mut self) -> Option<Result<String, SeanceError>> {
        self.rx.recv().await.map(Ok)
    }

    /// Nothing to tear down for channels; dropping the halves is enough.
    async fn close(&mut self) -> Result<(), SeanceError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 3: Drive a scripted session over the loopback
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (transport, mut server) = loopback_pair();

    // Start the client. Unlike a request/response protocol, nothing goes out
    // yet: the session server always speaks first with a welcome frame.
    let config = SeanceConfig::new("ann");
    let (mut client, mut event_rx) = SeanceClient::start(transport, config);

    // ── Fake server: send the welcome bootstrap ─────────────────────
    // The JSON must match the wire format — internally tagged, with the
    // payload fields inline next to the tag.
    let welcome = serde_json::json!({
        "type": "welcome",
        "message": "Welcome Madame Vesna! The manor has been expecting you.",
        "mode": "game",
        "player": {
            "name": "Madame Vesna",
            "current_room": "Library",
            "role": "Medium",
            "abilities": ["Commune"]
        },
        "total_players": 1,
        "player_index": 1
    });
    server.tx.send(welcome.to_string())?;

    // The welcome lands as three records: Connected, Welcome, greeting.
    for _ in 0..3 {
        let Some(event) = event_rx.recv().await else {
            return Err("event channel closed during welcome".into());
        };
        match &event {
            SeanceEvent::Connected => tracing::info!("Event: Connected (synthetic)"),
            SeanceEvent::Welcome { player, .. } => {
                tracing::info!("Event: Welcome — server named us {}", player.name);
            }
            SeanceEvent::Log(entry) => tracing::info!("Event: {}", entry.render()),
            other => tracing::info!("Event: {other:?}"),
        }
    }

    // ── Move, optimistically ────────────────────────────────────────
    // The move applies locally the moment it is queued; the room change
    // surfaces before the server has seen anything.
    client.move_to("Kitchen")?;

    let Some(event) = event_rx.recv().await else {
        return Err("event channel closed after move".into());
    };
    if let SeanceEvent::RoomChanged { room } = &event {
        tracing::info!("Event: RoomChanged — already in {room}, no confirmation needed");
    } else {
        tracing::info!("Event: {event:?}");
    }

    // The server side sees the outbound frame.
    let Some(move_frame) = server.rx.recv().await else {
        return Err("server channel closed before the move arrived".into());
    };
    tracing::info!("Server received: {move_frame}");

    // Echo it back the way a real server would. The room already matches,
    // so this only appends a log entry.
    let echo = serde_json::json!({
        "type": "player_moved",
        "player": "Madame Vesna",
        "room": "Kitchen"
    });
    server.tx.send(echo.to_string())?;

    let Some(event) = event_rx.recv().await else {
        return Err("event channel closed after the echo".into());
    };
    if let SeanceEvent::Log(entry) = &event {
        tracing::info!("Event: {}", entry.render());
    } else {
        tracing::info!("Event: {event:?}");
    }

    // ── Hang up from the server side ────────────────────────────────
    // Dropping the sender closes the channel; the client reports a clean
    // disconnect and exits its loop. No reconnection is attempted.
    drop(server.tx);

    while let Some(event) = event_rx.recv().await {
        if let SeanceEvent::Disconnected { clean, .. } = event {
            tracing::info!("Event: Disconnected (clean={clean})");
            break;
        }
        tracing::info!("Event: {event:?}");
    }

    // ── Clean shutdown ──────────────────────────────────────────────
    client.shutdown().await;
    tracing::info!("Done — loopback transport works!");
    Ok(())
}
