//! Wire types for the session event channel.
//!
//! Every frame is one JSON text message, adjacently tagged as
//! `{"event": "<name>", "data": {…}}`:
//!
//! | Event               | Direction | Payload                   |
//! |---------------------|-----------|---------------------------|
//! | `session.start`     | inbound   | `{"symbol": "X" \| "O"}`  |
//! | `opponent.departed` | inbound   | `{}`                      |
//! | `move.applied`      | inbound   | `{"index": 0..8, "symbol"}` |
//! | `move.attempt`      | outbound  | `{"index": 0..8, "symbol"}` |
//!
//! Indices are carried as raw `u8` on the wire. They are validated into
//! [`CellIndex`](crate::CellIndex) when a [`ServerMessage`] is converted into an
//! [`InboundEvent`](crate::InboundEvent), so out-of-range values are rejected at
//! the boundary.

use serde::{Deserialize, Serialize};

use crate::board::{CellIndex, Symbol};

/// Message types sent from the client to the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    /// The local player wants to mark a cell. The authority either echoes a
    /// `move.applied` or ignores the attempt.
    #[serde(rename = "move.attempt")]
    MoveAttempt { index: u8, symbol: Symbol },
}

impl ClientMessage {
    /// Build a move attempt for a validated cell.
    pub fn move_attempt(index: CellIndex, symbol: Symbol) -> Self {
        ClientMessage::MoveAttempt {
            index: index.into(),
            symbol,
        }
    }

    /// Wire name of this message.
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::MoveAttempt { .. } => "move.attempt",
        }
    }
}

/// Message types sent from the authority to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// The authority assigns this client's symbol. First move goes to `X`.
    #[serde(rename = "session.start")]
    SessionStart { symbol: Symbol },
    /// The opponent disconnected.
    #[serde(rename = "opponent.departed")]
    OpponentDeparted {},
    /// A move by either player was accepted by the authority.
    #[serde(rename = "move.applied")]
    MoveApplied { index: u8, symbol: Symbol },
}

impl ServerMessage {
    /// Wire name of this message.
    pub fn name(&self) -> &'static str {
        match self {
            ServerMessage::SessionStart { .. } => "session.start",
            ServerMessage::OpponentDeparted {} => "opponent.departed",
            ServerMessage::MoveApplied { .. } => "move.applied",
        }
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

    #[test]
    fn move_attempt_wire_shape() {
        let msg = ClientMessage::move_attempt(CellIndex::new(4).unwrap(), Symbol::X);
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "event": "move.attempt", "data": { "index": 4, "symbol": "X" } })
        );
    }

    #[test]
    fn opponent_departed_carries_empty_payload() {
        let json = serde_json::to_string(&ServerMessage::OpponentDeparted {}).unwrap();
        assert_eq!(json, r#"{"event":"opponent.departed","data":{}}"#);
    }

    #[test]
    fn names_match_wire_tags() {
        let msg = ServerMessage::MoveApplied {
            index: 2,
            symbol: Symbol::O,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], msg.name());
    }
}
