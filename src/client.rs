//! Async event channel client.
//!
//! [`SessionClient`] owns a background transport loop task. Outbound intents
//! travel to the loop over an unbounded MPSC channel; inbound frames are
//! decoded, validated into [`InboundEvent`](crate::InboundEvent)s and pushed,
//! in arrival order, into the bounded inbox returned from
//! [`SessionClient::start`]. The [`Session`](crate::Session) is driven only
//! from whatever task drains that inbox.
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = connect_somehow().await;
//! let (client, mut inbox) = SessionClient::start(transport, SessionClientConfig::new());
//! let mut session = Session::new();
//!
//! while let Some(event) = inbox.recv().await {
//!     match event {
//!         ClientEvent::Inbound(event) => {
//!             session.apply(event);
//!             println!("{}", ViewAdapter::new(&session).render());
//!         }
//!         ClientEvent::Disconnected { .. } => break,
//!         ClientEvent::Connected => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::channel::EventChannel;
use crate::error::{Result, SessionError};
use crate::event::{ClientEvent, InboundEvent};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::Transport;

/// Default capacity of the bounded inbox.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`SessionClient`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tictactoe_session_client::client::SessionClientConfig;
///
/// let config = SessionClientConfig::new()
///     .with_event_channel_capacity(16)
///     .with_shutdown_timeout(Duration::from_millis(250));
/// assert_eq!(config.event_channel_capacity, 16);
/// ```
#[derive(Debug, Clone)]
pub struct SessionClientConfig {
    /// Capacity of the bounded inbox.
    ///
    /// When the inbox is full the transport loop waits for the consumer
    /// rather than dropping a game event, since a lost `move.applied` would
    /// leave turn ownership wrong for the rest of the session.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Timeout for the graceful shutdown.
    ///
    /// [`SessionClient::shutdown`] gives the transport loop this long to close
    /// the transport and emit the final `Disconnected` event before aborting
    /// it. Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl SessionClientConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the capacity of the bounded inbox. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for the graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for SessionClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Handle to a running event channel.
///
/// Created via [`SessionClient::start`]. Implements [`EventChannel`], so it
/// can be handed straight to [`Session::attempt_move`](crate::Session::attempt_move)
/// or [`ViewAdapter::on_cell_activated`](crate::ViewAdapter::on_cell_activated).
///
/// Every `start` must be paired with teardown: call
/// [`shutdown`](SessionClient::shutdown), or drop the handle to abort the loop.
pub struct SessionClient {
    cmd_tx: mpsc::UnboundedSender<ClientMessage>,
    connected: Arc<AtomicBool>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl SessionClient {
    /// Start the transport loop and return the handle plus the inbox.
    ///
    /// The inbox yields [`ClientEvent::Connected`] first, then one
    /// [`ClientEvent::Inbound`] per valid frame, and finally
    /// [`ClientEvent::Disconnected`].
    #[must_use = "the inbox must be drained to drive the session"]
    pub fn start(
        transport: impl Transport,
        config: SessionClientConfig,
    ) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMessage>();
        // tokio panics on a zero-capacity channel.
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<ClientEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let connected = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(transport_loop(
            transport,
            cmd_rx,
            event_tx,
            Arc::clone(&connected),
            shutdown_rx,
        ));

        let client = Self {
            cmd_tx,
            connected,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    /// Returns `true` while the transport loop is believed to be running.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Close the transport and stop the background task.
    ///
    /// The inbox yields `Disconnected` and then `None` once the loop exits.
    /// A full inbox does not hold up shutdown: an inbound event still waiting
    /// for room is dropped, and `Disconnected` is queued behind whatever the
    /// consumer has not read yet.
    pub async fn shutdown(&mut self) {
        debug!("SessionClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

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

        self.connected.store(false, Ordering::Release);
    }

    fn send(&self, msg: ClientMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.cmd_tx
            .send(msg)
            .map_err(|_| SessionError::NotConnected)
    }
}

impl EventChannel for SessionClient {
    fn emit(&self, intent: ClientMessage) -> Result<()> {
        self.send(intent)
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        // No executor context here to drive `transport.close()`; aborting
        // drops the loop future immediately.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Transport loop ──────────────────────────────────────────────────

/// Multiplexes outbound intents, inbound frames and the shutdown signal.
///
/// Exits when the command channel closes, the shutdown signal fires, the
/// transport returns `None`, or a transport error occurs.
async fn transport_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    event_tx: mpsc::Sender<ClientEvent>,
    connected: Arc<AtomicBool>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("transport loop started");

    deliver(&event_tx, ClientEvent::Connected).await;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(msg) => {
                        debug!(event = msg.name(), "sending client message");
                        match serde_json::to_string(&msg) {
                            Ok(json) => {
                                if let Err(e) = transport.send(json).await {
                                    error!("transport send error: {e}");
                                    emit_disconnected(
                                        &event_tx,
                                        &connected,
                                        Some(format!("transport send error: {e}")),
                                    );
                                    break;
                                }
                            }
                            Err(e) => {
                                error!("failed to serialize ClientMessage: {e}");
                            }
                        }
                    }
                    None => {
                        debug!("command channel closed, shutting down transport loop");
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &connected, Some("client shut down".into()));
                        break;
                    }
                }
            }

            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &connected, Some("client shut down".into()));
                break;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        if let Some(event) = decode_inbound(&text) {
                            // Waiting on a full inbox must not block teardown.
                            tokio::select! {
                                delivered = event_tx.send(ClientEvent::Inbound(event)) => {
                                    if delivered.is_err() {
                                        debug!("inbox closed, receiver dropped");
                                    }
                                }
                                _ = &mut shutdown_rx => {
                                    debug!("shutdown signal received with a full inbox");
                                    let _ = transport.close().await;
                                    emit_disconnected(
                                        &event_tx,
                                        &connected,
                                        Some("client shut down".into()),
                                    );
                                    break;
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        emit_disconnected(
                            &event_tx,
                            &connected,
                            Some(format!("transport receive error: {e}")),
                        );
                        break;
                    }
                    None => {
                        debug!("transport closed by authority");
                        emit_disconnected(&event_tx, &connected, None);
                        break;
                    }
                }
            }
        }
    }

    debug!("transport loop exited");
}

/// Decode one frame into a validated event. Malformed frames and out-of-range
/// indices are rejected here, before they can reach the session.
fn decode_inbound(text: &str) -> Option<InboundEvent> {
    let msg = match serde_json::from_str::<ServerMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("failed to deserialize server message: {e} (raw: {text})");
            return None;
        }
    };
    let name = msg.name();
    match InboundEvent::try_from(msg) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(event = name, "rejecting server message: {e}");
            None
        }
    }
}

/// Push an event into the inbox, waiting for room if it is full.
async fn deliver(event_tx: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
    if event_tx.send(event).await.is_err() {
        debug!("inbox closed, receiver dropped");
    }
}

/// Emit the final [`ClientEvent::Disconnected`] and mark the handle disconnected.
///
/// Never waits: if the inbox is full, a detached task finishes the hand-off
/// once the consumer drains, so the loop can exit immediately.
fn emit_disconnected(
    event_tx: &mpsc::Sender<ClientEvent>,
    connected: &AtomicBool,
    reason: Option<String>,
) {
    connected.store(false, Ordering::Release);
    match event_tx.try_send(ClientEvent::Disconnected { reason }) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(event)) => {
            debug!("inbox full, deferring Disconnected");
            let event_tx = event_tx.clone();
            tokio::spawn(async move {
                deliver(&event_tx, event).await;
            });
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("inbox closed, receiver dropped");
        }
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
    use crate::board::{CellIndex, Symbol};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// Records sent frames and replays scripted incoming frames.
    struct MockTransport {
        incoming: VecDeque<Option<std::result::Result<String, SessionError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(
            incoming: Vec<Option<std::result::Result<String, SessionError>>>,
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
        async fn send(&mut self, message: String) -> std::result::Result<(), SessionError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, SessionError>> {
            if let Some(item) = self.incoming.pop_front() {
                item
            } else {
                // Script exhausted: stay open until shutdown.
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> std::result::Result<(), SessionError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    fn frame(msg: &ServerMessage) -> Option<std::result::Result<String, SessionError>> {
        Some(Ok(serde_json::to_string(msg).unwrap()))
    }

    async fn wait_for_sent(sent: &Arc<StdMutex<Vec<String>>>, count: usize) -> Vec<String> {
        for _ in 0..100 {
            {
                let messages = sent.lock().unwrap();
                if messages.len() >= count {
                    return messages.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} sent message(s)");
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[test]
    fn config_clamps_capacity() {
        let config = SessionClientConfig::default().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
        assert_eq!(config.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT);
    }

    #[test]
    fn decode_rejects_out_of_range_index() {
        assert_eq!(
            decode_inbound(r#"{"event":"move.applied","data":{"index":9,"symbol":"X"}}"#),
            None
        );
        assert_eq!(decode_inbound("not json"), None);
        assert_eq!(
            decode_inbound(r#"{"event":"session.start","data":{"symbol":"O"}}"#),
            Some(InboundEvent::SessionStart { symbol: Symbol::O })
        );
    }

    #[tokio::test]
    async fn first_event_is_connected() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = SessionClient::start(transport, SessionClientConfig::new());

        assert_eq!(events.recv().await.unwrap(), ClientEvent::Connected);
        assert!(client.is_connected());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn inbound_frames_arrive_in_order() {
        let (transport, _sent, _closed) = MockTransport::new(vec![
            frame(&ServerMessage::SessionStart { symbol: Symbol::X }),
            frame(&ServerMessage::MoveApplied {
                index: 4,
                symbol: Symbol::X,
            }),
            frame(&ServerMessage::OpponentDeparted {}),
        ]);
        let (mut client, mut events) = SessionClient::start(transport, SessionClientConfig::new());

        let _ = events.recv().await; // Connected
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Inbound(InboundEvent::SessionStart { symbol: Symbol::X })
        );
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Inbound(InboundEvent::MoveApplied {
                index: CellIndex::new(4).unwrap(),
                symbol: Symbol::X
            })
        );
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Inbound(InboundEvent::OpponentDeparted)
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_frames_are_skipped() {
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok("{garbage".into())),
            Some(Ok(
                r#"{"event":"move.applied","data":{"index":12,"symbol":"O"}}"#.into(),
            )),
            frame(&ServerMessage::OpponentDeparted {}),
        ]);
        let (mut client, mut events) = SessionClient::start(transport, SessionClientConfig::new());

        let _ = events.recv().await; // Connected
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Inbound(InboundEvent::OpponentDeparted)
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn emit_sends_move_attempt_frame() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = SessionClient::start(transport, SessionClientConfig::new());
        let _ = events.recv().await; // Connected

        client
            .emit(ClientMessage::move_attempt(
                CellIndex::new(2).unwrap(),
                Symbol::O,
            ))
            .unwrap();

        let messages = wait_for_sent(&sent, 1).await;
        let parsed: ClientMessage = serde_json::from_str(&messages[0]).unwrap();
        assert_eq!(
            parsed,
            ClientMessage::MoveAttempt {
                index: 2,
                symbol: Symbol::O
            }
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_transport_and_disconnects() {
        let (transport, _sent, closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = SessionClient::start(transport, SessionClientConfig::new());
        let _ = events.recv().await; // Connected

        client.shutdown().await;

        assert!(closed.load(Ordering::Relaxed));
        assert!(!client.is_connected());
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Disconnected {
                reason: Some("client shut down".into())
            }
        );
        assert!(events.recv().await.is_none());
        assert!(matches!(
            client.emit(ClientMessage::MoveAttempt {
                index: 0,
                symbol: Symbol::X
            }),
            Err(SessionError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn authority_close_emits_clean_disconnect() {
        let (transport, _sent, _closed) = MockTransport::new(vec![None]);
        let (mut client, mut events) = SessionClient::start(transport, SessionClientConfig::new());

        let _ = events.recv().await; // Connected
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Disconnected { reason: None }
        );
        assert!(!client.is_connected());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn receive_error_emits_disconnect_with_reason() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Err(
            SessionError::TransportReceive("reset".into()),
        ))]);
        let (mut client, mut events) = SessionClient::start(transport, SessionClientConfig::new());

        let _ = events.recv().await; // Connected
        match events.recv().await.unwrap() {
            ClientEvent::Disconnected { reason: Some(reason) } => {
                assert!(reason.contains("reset"), "reason: {reason}");
            }
            other => panic!("expected Disconnected, got {other:?}"),
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn small_inbox_applies_backpressure_without_loss() {
        let incoming = (0..9u8)
            .map(|i| {
                frame(&ServerMessage::MoveApplied {
                    index: i,
                    symbol: Symbol::X,
                })
            })
            .collect();
        let (transport, _sent, _closed) = MockTransport::new(incoming);
        let config = SessionClientConfig::new().with_event_channel_capacity(1);
        let (mut client, mut events) = SessionClient::start(transport, config);

        let _ = events.recv().await; // Connected
        for i in 0..9 {
            tokio::time::sleep(Duration::from_millis(1)).await;
            assert_eq!(
                events.recv().await.unwrap(),
                ClientEvent::Inbound(InboundEvent::MoveApplied {
                    index: CellIndex::new(i).unwrap(),
                    symbol: Symbol::X
                })
            );
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_with_full_inbox_still_closes_and_disconnects() {
        let incoming = (0..3u8)
            .map(|i| {
                frame(&ServerMessage::MoveApplied {
                    index: i,
                    symbol: Symbol::X,
                })
            })
            .collect();
        let (transport, _sent, closed) = MockTransport::new(incoming);
        let config = SessionClientConfig::new()
            .with_event_channel_capacity(1)
            .with_shutdown_timeout(Duration::from_secs(5));
        let (mut client, mut events) = SessionClient::start(transport, config);

        // `Connected` fills the inbox; the loop is now waiting to deliver.
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_secs(1), client.shutdown())
            .await
            .expect("shutdown should not wait for the consumer");

        assert!(closed.load(Ordering::Relaxed), "transport was not closed");
        assert!(!client.is_connected());
        assert_eq!(events.recv().await.unwrap(), ClientEvent::Connected);
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Disconnected {
                reason: Some("client shut down".into())
            }
        );
        assert!(events.recv().await.is_none());
    }
}
