#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for the session client integration tests.
//!
//! Provides a channel-backed [`LoopbackTransport`] with its authority half,
//! a [`RecordingChannel`] for synchronous tests, and helpers for building
//! wire frames.

use std::cell::RefCell;
use std::time::Duration;

use async_trait::async_trait;
use tictactoe_session_client::{
    CellIndex, ClientMessage, EventChannel, InboundEvent, ServerMessage, Session, SessionError,
    Symbol, Transport,
};
use tokio::sync::mpsc;

// ── LoopbackTransport ───────────────────────────────────────────────

/// Client half of an in-process transport pair.
pub struct LoopbackTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Authority half: reads intents the client sent and pushes frames to it.
pub struct LoopbackAuthority {
    rx: mpsc::UnboundedReceiver<String>,
    tx: mpsc::UnboundedSender<String>,
}

/// Create a connected `(transport, authority)` pair.
pub fn loopback_pair() -> (LoopbackTransport, LoopbackAuthority) {
    let (client_tx, authority_rx) = mpsc::unbounded_channel();
    let (authority_tx, client_rx) = mpsc::unbounded_channel();
    (
        LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        },
        LoopbackAuthority {
            rx: authority_rx,
            tx: authority_tx,
        },
    )
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), SessionError> {
        self.tx
            .send(message)
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, SessionError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

impl LoopbackAuthority {
    /// Push one server message to the client.
    pub fn send(&self, msg: &ServerMessage) {
        self.tx.send(serde_json::to_string(msg).unwrap()).unwrap();
    }

    /// Push a raw text frame to the client.
    pub fn send_raw(&self, frame: &str) {
        self.tx.send(frame.to_string()).unwrap();
    }

    /// Wait for the next intent the client emitted.
    pub async fn next_intent(&mut self) -> ClientMessage {
        let frame = tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .expect("timed out waiting for client intent")
            .expect("client transport dropped");
        serde_json::from_str(&frame).expect("client intent should decode")
    }

    /// Returns `true` if the client has not sent anything yet.
    pub fn nothing_sent(&mut self) -> bool {
        self.rx.try_recv().is_err()
    }

    /// Simulate the authority closing the connection.
    pub fn hang_up(self) {
        drop(self);
    }
}

// ── RecordingChannel ────────────────────────────────────────────────

/// Synchronous [`EventChannel`] that records every emitted intent.
#[derive(Default)]
pub struct RecordingChannel {
    pub emitted: RefCell<Vec<ClientMessage>>,
}

impl EventChannel for RecordingChannel {
    fn emit(&self, intent: ClientMessage) -> Result<(), SessionError> {
        self.emitted.borrow_mut().push(intent);
        Ok(())
    }
}

impl RecordingChannel {
    pub fn count(&self) -> usize {
        self.emitted.borrow().len()
    }
}

// ── Builders ────────────────────────────────────────────────────────

pub fn idx(raw: usize) -> CellIndex {
    CellIndex::new(raw).unwrap()
}

pub fn move_applied(index: usize, symbol: Symbol) -> InboundEvent {
    InboundEvent::MoveApplied {
        index: idx(index),
        symbol,
    }
}

pub fn server_move(index: u8, symbol: Symbol) -> ServerMessage {
    ServerMessage::MoveApplied { index, symbol }
}

/// A session that has received `session.start` for `symbol`.
pub fn started(symbol: Symbol) -> Session {
    let mut session = Session::new();
    session.apply(InboundEvent::SessionStart { symbol });
    session
}

/// Alternating moves starting with X, one per listed cell.
pub fn alternating(cells: &[usize]) -> Vec<(usize, Symbol)> {
    cells
        .iter()
        .enumerate()
        .map(|(n, cell)| (*cell, if n % 2 == 0 { Symbol::X } else { Symbol::O }))
        .collect()
}
