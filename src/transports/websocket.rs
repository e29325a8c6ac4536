//! WebSocket transport built on `tokio-tungstenite`.
//!
//! [`WebSocketTransport`] carries one session frame per WebSocket text
//! message. `ws://` and `wss://` URLs both work; TLS is handled by
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), tictactoe_session_client::SessionError> {
//! use tictactoe_session_client::client::{SessionClient, SessionClientConfig};
//! use tictactoe_session_client::WebSocketTransport;
//!
//! let transport = WebSocketTransport::connect("ws://localhost:4000/session").await?;
//! let (mut client, mut inbox) = SessionClient::start(transport, SessionClientConfig::new());
//! // drain `inbox` into a `Session` ...
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::transport::Transport;

/// The underlying WebSocket stream type, public for [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// `recv` is cancel-safe: `StreamExt::next` on the tungstenite stream does not
/// consume a frame unless it completes.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Connect to the authority at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the URL is invalid or the handshake
    /// fails. I/O error kinds are preserved; anything else maps to
    /// [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        debug!(url = %url, "connecting to session authority");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            SessionError::Io(std::io::Error::new(kind, e))
        })?;

        info!(url = %url, "session channel established");

        Ok(Self::from_stream(stream))
    }

    /// Like [`connect`](Self::connect), failing with [`SessionError::Timeout`]
    /// if the handshake does not finish within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Timeout`] on deadline, or any error of `connect`.
    pub async fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, SessionError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| SessionError::Timeout)?
    }

    /// Wrap an already-established stream (custom TLS, headers, proxies).
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, SessionError>> {
        loop {
            let msg = match self.stream.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(SessionError::TransportReceive(e.to_string()))),
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    debug!(?frame, "authority closed the session channel");
                    return None;
                }
                // tungstenite queues the pong itself.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => {
                    warn!("skipping binary frame; session frames are JSON text");
                }
                Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }
}

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
    use crate::board::Symbol;
    use crate::protocol::{ClientMessage, ServerMessage};
    use tokio::net::TcpListener;

    type ServerStream = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Accept one connection on a local port and hand it to `authority`.
    async fn start_authority<F, Fut>(authority: F) -> String
    where
        F: FnOnce(ServerStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            authority(ws).await;
        });

        format!("ws://{addr}")
    }

    fn text(msg: &ServerMessage) -> Message {
        Message::Text(serde_json::to_string(msg).unwrap().into())
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }

    #[tokio::test]
    async fn connect_with_timeout_times_out() {
        // TEST-NET-1 is non-routable.
        let err =
            WebSocketTransport::connect_with_timeout("ws://192.0.2.1:1", Duration::from_millis(50))
                .await
                .unwrap_err();
        assert!(matches!(err, SessionError::Timeout));
    }

    #[tokio::test]
    async fn recv_yields_session_frames_and_skips_binary() {
        let url = start_authority(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(text(&ServerMessage::SessionStart { symbol: Symbol::O }))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();

        let frame = transport.recv().await.unwrap().unwrap();
        let msg: ServerMessage = serde_json::from_str(&frame).unwrap();
        assert_eq!(msg, ServerMessage::SessionStart { symbol: Symbol::O });
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn move_attempt_reaches_authority() {
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
        let url = start_authority(|mut ws| async move {
            if let Some(Ok(Message::Text(frame))) = ws.next().await {
                let _ = seen_tx.send(frame.to_string());
            }
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let intent = ClientMessage::MoveAttempt {
            index: 6,
            symbol: Symbol::X,
        };
        transport
            .send(serde_json::to_string(&intent).unwrap())
            .await
            .unwrap();

        let frame = seen_rx.await.unwrap();
        let parsed: ClientMessage = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed, intent);

        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn send_after_close_is_rejected_and_close_is_idempotent() {
        let url =
            start_authority(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("{}".to_string()).await.unwrap_err();
        assert!(matches!(err, SessionError::TransportClosed));
    }
}
