//! Transport implementations for the session protocol.
//!
//! Concrete [`Transport`](crate::Transport) implementations live here, each
//! behind its own feature gate so the core crate stays light. Enable the
//! matching Cargo feature to pull one in:
//!
//! | Feature                | Transport              |
//! |------------------------|------------------------|
//! | `transport-websocket`  | [`WebSocketTransport`] |
//!
//! # Example
//!
//! ```rust,ignore
//! # async fn example() -> Result<(), seance_client::SeanceError> {
//! use seance_client::{Transport, WebSocketTransport};
//!
//! let mut ws = WebSocketTransport::connect("ws://localhost:8001/ws/ann").await?;
//! ws.send(r#"{"type":"move","room":"Library"}"#.to_string()).await?;
//!
//! if let Some(Ok(msg)) = ws.recv().await {
//!     println!("server said: {msg}");
//! }
//!
//! ws.close().await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::WebSocketTransport;
