//! # Seance Client
//!
//! Transport-agnostic async client core for Seance, the haunted-manor social
//! game run by an AI game master.
//!
//! The crate keeps one owned [`SessionState`] in sync with the server over any
//! bidirectional JSON text transport and hands rendering layers an ordered
//! stream of display records. It draws nothing itself — terminals, GUIs and
//! bots all consume the same [`SeanceEvent`] channel.
//!
//! ## Features
//!
//! - **Transport-agnostic** — implement the [`Transport`] trait for any backend
//! - **Never drops a frame** — unknown and malformed server payloads degrade to
//!   generic log entries instead of errors
//! - **WebSocket built-in** — default `transport-websocket` feature provides `WebSocketTransport`
//! - **Event-driven** — consume typed [`SeanceEvent`] records via a channel
//! - **Story sessions** — narration beats and choice selection via the narrative machine
//! - **HTTP extras** — default `api-http` feature covers saves, story codes and PDF export
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "transport-websocket")]
//! use seance_client::{SeanceClient, SeanceConfig, SeanceEvent, WebSocketTransport};
//!
//! # #[cfg(feature = "transport-websocket")]
//! # async fn example() -> Result<(), seance_client::SeanceError> {
//! let url = seance_client::endpoint::ws_url("http://localhost:8001", "ann", None);
//! let transport = WebSocketTransport::connect(&url).await?;
//! let (client, mut events) = SeanceClient::start(transport, SeanceConfig::new("ann"));
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
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "api-http")]
pub mod api;
#[cfg(feature = "tokio-runtime")]
pub mod client;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod log;
pub mod narrative;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
#[cfg(feature = "tokio-runtime")]
pub use client::{SeanceClient, SeanceConfig};
pub use error::SeanceError;
pub use event::SeanceEvent;
pub use log::{ChatEntry, LogEntry, LogKind};
pub use protocol::{ClientMessage, GameMode, ServerMessage};
pub use session::{SessionIdentity, SessionState};
pub use transport::Transport;

#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
