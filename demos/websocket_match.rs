//! # WebSocket Match
//!
//! Terminal client for an authority reachable over WebSocket:
//!
//! 1. Connect and wait for `session.start`
//! 2. Render the board after every inbound event
//! 3. Read a cell number (0-8) per line from stdin and route it through the
//!    [`ViewAdapter`]; illegal input simply leaves the board unchanged
//! 4. Shut down on Ctrl+C, on disconnect, or once the game is over
//!
//! ## Running
//!
//! ```sh
//! cargo run --example websocket_match
//! TICTACTOE_URL=ws://my-host:4000/session cargo run --example websocket_match
//! ```

use tictactoe_session_client::{
    ClientEvent, Session, SessionClient, SessionClientConfig, ViewAdapter, WebSocketTransport,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Default authority URL when `TICTACTOE_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:4000/session";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let url = std::env::var("TICTACTOE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    tracing::info!("Connecting to {url}");

    let transport = WebSocketTransport::connect(&url).await?;
    let (mut client, mut inbox) = SessionClient::start(transport, SessionClientConfig::new());
    let mut session = Session::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", ViewAdapter::new(&session).render());

    loop {
        tokio::select! {
            event = inbox.recv() => {
                match event {
                    Some(ClientEvent::Inbound(event)) => {
                        session.apply(event);
                        println!("{}", ViewAdapter::new(&session).render());
                        if session.is_terminal() {
                            break;
                        }
                    }
                    Some(ClientEvent::Connected) => tracing::info!("connected"),
                    Some(ClientEvent::Disconnected { reason }) => {
                        tracing::info!("disconnected: {}", reason.as_deref().unwrap_or("clean"));
                        break;
                    }
                    None => break,
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim().parse::<usize>() {
                    Ok(index) => {
                        if !ViewAdapter::new(&session).on_cell_activated(index, &client) {
                            tracing::debug!(index, "move not available");
                        }
                    }
                    Err(_) => println!("enter a cell number 0-8"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, leaving");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
