//! # Basic Session Example
//!
//! Demonstrates a complete Seance client lifecycle:
//!
//! 1. Connect to a session server via WebSocket
//! 2. Receive the welcome bootstrap (identity, room, roster)
//! 3. Wander between rooms and talk
//! 4. React to session events (movement echoes, joins, AI narration)
//! 5. Shut down gracefully on Ctrl+C or disconnect
//!
//! ## Running
//!
//! ```sh
//! # Start a Seance session server on localhost:8001, then:
//! cargo run --example basic_session
//!
//! # Override the server origin:
//! SEANCE_URL=ws://my-server:8001 cargo run --example basic_session
//! ```

use seance_client::session::KNOWN_ROOMS;
use seance_client::{endpoint, SeanceClient, SeanceConfig, SeanceEvent, WebSocketTransport};

/// Default server origin when `SEANCE_URL` is not set.
const DEFAULT_ORIGIN: &str = "ws://localhost:8001";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // `RUST_LOG=debug` turns up the volume.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let origin = std::env::var("SEANCE_URL").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string());

    // Pick a throwaway player id; the server assigns the display name.
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect();
    let player_id = format!("guest-{suffix}");

    let url = endpoint::ws_url(&origin, &player_id, None);
    tracing::info!("Connecting to {url}");

    // ── Connect ─────────────────────────────────────────────────────
    let transport = WebSocketTransport::connect(&url).await?;

    let config = SeanceConfig::new(&player_id);

    // `start` spawns the background task that drives the transport and
    // emits records on `event_rx`. The server speaks first, so the next
    // thing to happen is the welcome bootstrap.
    let (mut client, mut event_rx) = SeanceClient::start(transport, config);

    // ── Event loop ──────────────────────────────────────────────────
    // Race session records against Ctrl+C.
    loop {
        tokio::select! {
            // Branch 1: Incoming record from the session.
            event = event_rx.recv() => {
                let Some(event) = event else {
                    // Channel closed — transport loop exited.
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    // ── Synthetic: transport connected ───────────────
                    SeanceEvent::Connected => {
                        tracing::info!("Transport connected, awaiting welcome…");
                    }

                    // ── Session bootstrap ────────────────────────────
                    SeanceEvent::Welcome { player, player_count, player_index, room_code } => {
                        tracing::info!(
                            "Welcomed as {} (player {player_index} of {player_count})",
                            player.name
                        );
                        if let Some(code) = room_code {
                            tracing::info!("Room code: {code}");
                        }
                        tracing::info!("Manor rooms: {}", KNOWN_ROOMS.join(", "));

                        // Now that we have an identity, start wandering.
                        client.move_to("Kitchen")?;
                        client.send_chat("anyone else hear that?")?;
                    }

                    // ── Log surface ──────────────────────────────────
                    // Movement, joins, narration and raw payloads all land
                    // here as rendered lines.
                    SeanceEvent::Log(entry) => {
                        println!("{}", entry.render());
                    }

                    SeanceEvent::Chat(entry) => {
                        println!("{}", entry.render());
                    }

                    SeanceEvent::RoomChanged { room } => {
                        tracing::info!("Now in: {room}");
                    }

                    SeanceEvent::PlayerCountChanged { count } => {
                        tracing::info!("Players present: {count}");
                    }

                    // ── Disconnect ───────────────────────────────────
                    SeanceEvent::Disconnected { clean, detail } => {
                        if clean {
                            tracing::info!("Session ended");
                        } else {
                            tracing::warn!(
                                "Connection lost: {}",
                                detail.as_deref().unwrap_or("unknown")
                            );
                        }
                        break;
                    }

                    // ── Catch-all (story-mode beats, acks) ───────────
                    other => {
                        tracing::debug!("Event: {other:?}");
                    }
                }
            }

            // Branch 2: Ctrl+C — shut down gracefully.
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    client.shutdown().await;
    tracing::info!("Client shut down. Goodbye!");
    Ok(())
}
