//! # Tic-Tac-Toe Session Client
//!
//! Client-side session state machine for two-player tic-tac-toe played
//! against a remote authority over an event channel.
//!
//! The authority assigns symbols, sequences moves and is trusted. This crate
//! keeps the local view consistent with it:
//!
//! - [`BoardState`]: the 3x3 grid and its win/draw evaluation
//! - [`Session`]: turn ownership, status, and the legality gate for local moves
//! - [`ViewAdapter`]: a read-only projection for rendering, plus input routing
//! - [`SessionClient`](client::SessionClient): the async event channel over any
//!   [`Transport`], delivering typed [`InboundEvent`]s into one ordered inbox
//!
//! ## Flow
//!
//! ```text
//! Transport ──frames──▶ SessionClient ──ClientEvent──▶ inbox ──▶ Session::apply
//!     ▲                                                              │
//!     └──── move.attempt ◀── EventChannel::emit ◀── ViewAdapter ◀────┘
//! ```

pub mod board;
pub mod channel;
#[cfg(feature = "tokio-runtime")]
pub mod client;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod transports;
pub mod view;

// Re-export primary types for ergonomic imports.
pub use board::{BoardState, Cell, CellIndex, Symbol};
pub use channel::EventChannel;
#[cfg(feature = "tokio-runtime")]
pub use client::{SessionClient, SessionClientConfig};
pub use error::{Result, SessionError};
pub use event::{ClientEvent, InboundEvent};
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{Applied, Session, SessionPhase, StatusView};
pub use transport::Transport;
#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
pub use view::{RenderedView, ViewAdapter};
