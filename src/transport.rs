//! Byte-level transport abstraction underneath the event channel.
//!
//! The [`Transport`] trait is a bidirectional text message channel between the
//! client and the authority. Each frame is one JSON-encoded
//! [`ClientMessage`](crate::ClientMessage) or
//! [`ServerMessage`](crate::ServerMessage); framing is the transport's job.
//!
//! Connection setup is not part of this trait. Construct a connected transport
//! externally, then pass it to `SessionClient::start`.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use tictactoe_session_client::error::SessionError;
//! use tictactoe_session_client::transport::Transport;
//! use tokio::sync::mpsc;
//!
//! struct ChannelTransport {
//!     tx: mpsc::UnboundedSender<String>,
//!     rx: mpsc::UnboundedReceiver<String>,
//! }
//!
//! #[async_trait]
//! impl Transport for ChannelTransport {
//!     async fn send(&mut self, message: String) -> Result<(), SessionError> {
//!         self.tx
//!             .send(message)
//!             .map_err(|e| SessionError::TransportSend(e.to_string()))
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, SessionError>> {
//!         self.rx.recv().await.map(Ok)
//!     }
//!
//!     async fn close(&mut self) -> Result<(), SessionError> {
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::SessionError;

/// A bidirectional text message transport.
///
/// Object-safe, so `Box<dyn Transport>` works.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe: the client polls it inside
/// `tokio::select!`, and a cancelled `recv` must not lose a frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one JSON text message to the authority.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TransportSend`] if the message could not be sent.
    async fn send(&mut self, message: String) -> Result<(), SessionError>;

    /// Receive the next JSON text message from the authority.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the authority closed the connection cleanly
    async fn recv(&mut self) -> Option<Result<String, SessionError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations should
    /// still release resources.
    async fn close(&mut self) -> Result<(), SessionError>;
}
