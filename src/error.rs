//! Error types for the tic-tac-toe session client.

use thiserror::Error;

use crate::board::Symbol;
use crate::session::SessionPhase;

/// Errors that can occur while driving a session.
///
/// Game-level variants ([`ProtocolViolation`](SessionError::ProtocolViolation),
/// [`Desync`](SessionError::Desync), [`InvalidIndex`](SessionError::InvalidIndex))
/// are absorbed by the session and only reported for diagnostics. Transport
/// variants surface from [`SessionClient`](crate::client::SessionClient) and
/// [`Transport`](crate::Transport) implementations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An inbound event arrived in a phase that does not accept it.
    #[error("protocol violation: `{event}` received while {phase:?}")]
    ProtocolViolation {
        /// Wire name of the offending event.
        event: &'static str,
        /// Phase the session was in when the event arrived.
        phase: SessionPhase,
    },

    /// The authority applied a move to a cell that is already marked locally.
    #[error("desync: cell {index} already holds {existing}, authority applied {applied}")]
    Desync {
        /// Target cell.
        index: usize,
        /// Mark the local board held before the event.
        existing: Symbol,
        /// Mark the authority claims for the cell.
        applied: Symbol,
    },

    /// A cell index outside `0..=8`.
    #[error("invalid cell index {0}, expected 0..=8")]
    InvalidIndex(usize),

    /// [`BoardState::with_move`](crate::BoardState::with_move) targeted a marked cell.
    #[error("cell {index} is already marked")]
    IllegalOverwrite {
        /// Target cell.
        index: usize,
    },

    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The outbound channel is gone; the client has shut down or the transport closed.
    #[error("not connected to the authority")]
    NotConnected,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for session client operations.
pub type Result<T> = std::result::Result<T, SessionError>;
