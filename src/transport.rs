//! Transport abstraction for the session protocol.
//!
//! The [`Transport`] trait defines a bidirectional text message channel between
//! the client and server. The session protocol uses JSON text messages, so
//! every transport implementation must handle message framing internally
//! (e.g., WebSocket frames, length-prefixed TCP, QUIC streams).
//!
//! # Connection Setup
//!
//! The trait deliberately starts at "already connected": what it takes to get
//! there differs per transport (a URL for WebSocket, host:port for TCP, an
//! endpoint for QUIC), so each implementation exposes its own constructor and
//! hands the connected value to `SeanceClient::start`.
//!
//! # Reconnection
//!
//! The trait models a single connection lifetime. When the peer goes away the
//! client reports a terminal disconnect and stops; callers who want back in
//! construct a fresh transport and a fresh client.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use seance_client::error::SeanceError;
//! use seance_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), SeanceError> {
//!         // Send the JSON text message over your transport
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, SeanceError>> {
//!         // Receive the next JSON text message
//!         // Return None when the connection is closed cleanly
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), SeanceError> {
//!         // Gracefully shut down the connection
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::SeanceError;

/// A bidirectional text message transport for the session protocol.
///
/// Implementors shuttle serialized JSON strings between the client and server,
/// one complete message per [`send`](Transport::send) or
/// [`recv`](Transport::recv) call.
///
/// # Object Safety
///
/// The trait is object-safe; `Box<dyn Transport>` works where dynamic dispatch
/// is wanted, though `SeanceClient::start` takes `impl Transport` for the
/// common monomorphized case.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it is used
/// inside `tokio::select!`. If `recv` is cancelled before completion, calling it
/// again must not lose data. Channel-based implementations (e.g., wrapping
/// `mpsc::Receiver`) are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text message to the server.
    ///
    /// # Errors
    ///
    /// Returns [`SeanceError::TransportSend`] if the message could not be sent
    /// (e.g., connection broken, write buffer full).
    async fn send(&mut self, message: String) -> Result<(), SeanceError>;

    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))` — a complete message arrived
    /// - `Some(Err(e))` — the transport failed (e.g., [`SeanceError::TransportReceive`])
    /// - `None` — the server closed the connection cleanly
    ///
    /// # Cancel Safety
    ///
    /// This method **MUST** be cancel-safe (see [trait documentation](Transport)).
    async fn recv(&mut self) -> Option<Result<String, SeanceError>>;

    /// Close the transport connection gracefully.
    ///
    /// Once closed, [`send`](Transport::send) and [`recv`](Transport::recv)
    /// may return errors or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails; resources should be
    /// released either way.
    async fn close(&mut self) -> Result<(), SeanceError>;
}
