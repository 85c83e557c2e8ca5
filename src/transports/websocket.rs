//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! [`WebSocketTransport`] carries the session protocol over a WebSocket
//! connection. Both `ws://` and `wss://` URLs work; TLS is negotiated
//! transparently via [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! The session server speaks JSON over text frames only. Binary frames are
//! skipped with a warning, pings are answered by tungstenite itself.
//!
//! # Feature gate
//!
//! Only compiled when the `transport-websocket` feature is enabled (it is
//! enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), seance_client::SeanceError> {
//! use seance_client::{Transport, WebSocketTransport};
//!
//! let url = seance_client::endpoint::ws_url("ws://localhost:8001", "ann", None);
//! let mut transport = WebSocketTransport::connect(&url).await?;
//!
//! // The server speaks first: the welcome frame is already on its way.
//! if let Some(Ok(msg)) = transport.recv().await {
//!     println!("received: {msg}");
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::SeanceError;
use crate::transport::Transport;

/// The underlying WebSocket stream type.
///
/// Public so callers who build their own connection (custom TLS, proxies,
/// extra headers) can hand it to [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// Wraps a `tokio-tungstenite` [`WebSocketStream`](tokio_tungstenite::WebSocketStream)
/// and translates between the session server's text-message protocol and
/// WebSocket frames.
///
/// # Construction
///
/// [`WebSocketTransport::connect`] covers the normal case:
///
/// ```rust,no_run
/// # async fn example() -> Result<(), seance_client::SeanceError> {
/// use seance_client::WebSocketTransport;
///
/// let transport = WebSocketTransport::connect("ws://localhost:8001/ws/ann").await?;
/// # Ok(())
/// # }
/// ```
///
/// [`WebSocketTransport::from_stream`] takes over a stream that was connected
/// some other way.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe: a dropped `recv` future consumes
/// no frames, so the client's `tokio::select!` loop can race it against other
/// branches freely.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a WebSocket connection to the given URL.
    ///
    /// Accepts `ws://` and `wss://` schemes; TLS setup is handled by
    /// `tokio-tungstenite` via [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
    ///
    /// # Errors
    ///
    /// Returns [`SeanceError::Io`] when the URL is invalid or the server is
    /// unreachable. An underlying I/O error keeps its
    /// [`ErrorKind`](std::io::ErrorKind); everything else is reported as
    /// [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, SeanceError> {
        tracing::debug!(url = %url, "opening WebSocket to the session server");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            SeanceError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "WebSocket open, awaiting the server's welcome");

        Ok(Self {
            stream,
            closed: false,
        })
    }

    /// Wrap an already-connected WebSocket stream.
    ///
    /// For connection setups [`connect`](Self::connect) cannot express:
    /// custom TLS configuration, proxy tunnels, authentication headers.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }

    /// Like [`connect`](Self::connect), with a deadline on the whole handshake.
    ///
    /// # Errors
    ///
    /// Returns [`SeanceError::Timeout`] when the deadline elapses, otherwise
    /// whatever [`connect`](Self::connect) returns.
    pub async fn connect_with_timeout(
        url: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, SeanceError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| SeanceError::Timeout)?
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), SeanceError> {
        if self.closed {
            return Err(SeanceError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| SeanceError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, SeanceError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(SeanceError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                // `Utf8Bytes` keeps its buffer private, so the payload is
                // copied out into a `String` here.
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "server sent a close frame");
                    return None;
                }
                Message::Ping(_) => {
                    // tungstenite queues the Pong reply itself.
                    tracing::debug!("ping from server, pong queued by tungstenite");
                }
                Message::Pong(_) => {
                    tracing::debug!("pong from server, ignored");
                }
                Message::Binary(_) => {
                    tracing::warn!("binary frame from server, the session protocol is text-only");
                }
                Message::Frame(_) => {
                    // The read half never yields this variant; the arm exists
                    // to keep the match exhaustive.
                    tracing::debug!("raw frame from server, skipped");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), SeanceError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| SeanceError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
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

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[test]
    fn websocket_transport_is_debug() {
        fn assert_debug<T: std::fmt::Debug>() {}
        assert_debug::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let result = WebSocketTransport::connect("not-a-websocket-url").await;
        let err = result.unwrap_err();
        assert!(matches!(err, SeanceError::Io(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let result = WebSocketTransport::connect("ws://127.0.0.1:1").await;
        let err = result.unwrap_err();
        assert!(matches!(err, SeanceError::Io(_)));
    }

    // ── Fake-server helpers ──────────────────────────────────────────────

    use tokio::net::TcpListener;

    /// Bind a local WebSocket server, run `handler` on the first accepted
    /// connection, and return the URL to dial.
    async fn spawn_fake_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    // ── Fake-server tests ────────────────────────────────────────────────

    #[tokio::test]
    async fn server_frames_arrive_in_order() {
        let url = spawn_fake_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"welcome"}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"chat","player":"Bob","message":"hi"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();

        let first = transport.recv().await.unwrap().unwrap();
        assert_eq!(first, r#"{"type":"welcome"}"#);

        let second = transport.recv().await.unwrap().unwrap();
        assert_eq!(second, r#"{"type":"chat","player":"Bob","message":"hi"}"#);
    }

    #[tokio::test]
    async fn close_frame_ends_the_stream() {
        let url = spawn_fake_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn binary_frames_are_skipped() {
        let url = spawn_fake_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"player_left","player":"Bob"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();

        // recv() should step over the binary frame and yield the text frame.
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#"{"type":"player_left","player":"Bob"}"#);
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url = spawn_fake_server(|mut ws| async move {
            // Read until the client closes.
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();

        let err = transport
            .send(r#"{"type":"move","room":"Attic"}"#.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, SeanceError::TransportClosed));
    }

    #[tokio::test]
    async fn double_close_is_idempotent() {
        let url =
            spawn_fake_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        // Second close should also succeed.
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn connect_with_timeout_times_out() {
        // A listener that accepts the TCP connection but never answers the
        // WebSocket handshake guarantees the deadline fires.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _socket = listener.accept().await;
            std::future::pending::<()>().await;
        });

        let result = WebSocketTransport::connect_with_timeout(
            &format!("ws://{addr}"),
            std::time::Duration::from_millis(50),
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, SeanceError::Timeout));
    }

    #[tokio::test]
    async fn from_stream_wraps_an_existing_connection() {
        let url = spawn_fake_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"welcome","message":"hello"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        // Dial the raw stream ourselves, then hand it over.
        let (ws_stream, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        let mut transport = WebSocketTransport::from_stream(ws_stream);

        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#"{"type":"welcome","message":"hello"}"#);
    }

    #[tokio::test]
    async fn sent_text_reaches_the_peer() {
        let url = spawn_fake_server(|mut ws| async move {
            // Echo the first message back, then hang up.
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(text)).await.unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport
            .send(r#"{"type":"ability","ability":"Investigate"}"#.to_string())
            .await
            .unwrap();

        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#"{"type":"ability","ability":"Investigate"}"#);
    }

    #[tokio::test]
    async fn recv_after_close_returns_none_or_error() {
        let url =
            spawn_fake_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();

        // recv must not hang on a closed transport.
        let result = transport.recv().await;
        match result {
            None => {}         // stream ended
            Some(Err(_)) => {} // transport error, also fine
            Some(Ok(msg)) => panic!("expected None or error after close, got Ok({msg:?})"),
        }
    }
}
