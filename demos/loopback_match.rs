//! # Loopback Match
//!
//! Plays a full game against an in-process authority:
//!
//! - the **authority** task assigns `X` to the client, accepts its attempts,
//!   echoes them as `move.applied`, and answers with its own `O` moves
//! - the **client** drains its inbox into a [`Session`], renders it with
//!   [`ViewAdapter`], and activates the first empty cell on its turn
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback_match
//! RUST_LOG=debug cargo run --example loopback_match
//! ```

use async_trait::async_trait;
use tictactoe_session_client::{
    BoardState, CellIndex, ClientEvent, ClientMessage, ServerMessage, Session, SessionClient,
    SessionClientConfig, SessionError, Symbol, Transport, ViewAdapter,
};
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Loopback transport
// ─────────────────────────────────────────────────────────────────────

struct LoopbackTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
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

// ─────────────────────────────────────────────────────────────────────
// Authority
// ─────────────────────────────────────────────────────────────────────

/// Accepts `X` attempts from the client and replies with `O` moves.
async fn run_authority(
    mut from_client: mpsc::UnboundedReceiver<String>,
    to_client: mpsc::UnboundedSender<String>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let send = |msg: &ServerMessage| -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        to_client.send(serde_json::to_string(msg)?)?;
        Ok(())
    };

    let mut board = BoardState::new();
    send(&ServerMessage::SessionStart { symbol: Symbol::X })?;

    while let Some(frame) = from_client.recv().await {
        let intent: ClientMessage = serde_json::from_str(&frame)?;
        let ClientMessage::MoveAttempt { index, symbol } = intent;
        let Ok(cell) = CellIndex::try_from(index) else {
            tracing::warn!(index, "authority: ignoring out-of-range attempt");
            continue;
        };
        let Ok(next) = board.with_move(cell, symbol) else {
            tracing::warn!(index, "authority: ignoring attempt on a marked cell");
            continue;
        };
        board = next;
        send(&ServerMessage::MoveApplied { index, symbol })?;
        if board.is_terminal() {
            break;
        }

        if let Some(reply) = board.empty_cells().last() {
            board = board.with_move(reply, Symbol::O)?;
            send(&ServerMessage::MoveApplied {
                index: reply.into(),
                symbol: Symbol::O,
            })?;
            if board.is_terminal() {
                break;
            }
        }
    }

    tracing::info!("authority: game over\n{board}");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (client_tx, authority_rx) = mpsc::unbounded_channel();
    let (authority_tx, client_rx) = mpsc::unbounded_channel();
    let authority = tokio::spawn(run_authority(authority_rx, authority_tx));

    let transport = LoopbackTransport {
        tx: client_tx,
        rx: client_rx,
    };
    let (mut client, mut inbox) = SessionClient::start(transport, SessionClientConfig::new());
    let mut session = Session::new();

    while let Some(event) = inbox.recv().await {
        match event {
            ClientEvent::Connected => tracing::info!("connected to loopback authority"),
            ClientEvent::Inbound(event) => {
                session.apply(event);
                let view = ViewAdapter::new(&session);
                println!("{}", view.render());

                if session.is_terminal() {
                    break;
                }
                if let Some(cell) = session.board().empty_cells().next() {
                    view.on_cell_activated(cell.get(), &client);
                }
            }
            ClientEvent::Disconnected { reason } => {
                tracing::info!("disconnected: {}", reason.as_deref().unwrap_or("clean"));
                break;
            }
        }
    }

    client.shutdown().await;
    authority.await??;
    Ok(())
}
