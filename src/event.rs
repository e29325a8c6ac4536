//! Typed events delivered through the session inbox.

use crate::board::{CellIndex, Symbol};
use crate::error::SessionError;
use crate::protocol::ServerMessage;

/// A validated inbound game event, ready for [`Session::apply`](crate::Session::apply).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundEvent {
    /// `session.start`: the authority assigned the local symbol.
    SessionStart { symbol: Symbol },
    /// `opponent.departed`: the opponent disconnected.
    OpponentDeparted,
    /// `move.applied`: a move by either player was accepted.
    MoveApplied { index: CellIndex, symbol: Symbol },
}

impl InboundEvent {
    /// Wire name of the event this was decoded from.
    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::SessionStart { .. } => "session.start",
            InboundEvent::OpponentDeparted => "opponent.departed",
            InboundEvent::MoveApplied { .. } => "move.applied",
        }
    }
}

impl TryFrom<ServerMessage> for InboundEvent {
    type Error = SessionError;

    fn try_from(msg: ServerMessage) -> Result<Self, Self::Error> {
        Ok(match msg {
            ServerMessage::SessionStart { symbol } => InboundEvent::SessionStart { symbol },
            ServerMessage::OpponentDeparted {} => InboundEvent::OpponentDeparted,
            ServerMessage::MoveApplied { index, symbol } => InboundEvent::MoveApplied {
                index: CellIndex::try_from(index)?,
                symbol,
            },
        })
    }
}

/// Events emitted by [`SessionClient`](crate::client::SessionClient) on its inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Synthetic: the transport loop is running.
    Connected,
    /// A validated game event from the authority.
    Inbound(InboundEvent),
    /// The transport loop has exited. Always the last event on the inbox.
    Disconnected {
        /// Why the loop stopped. `None` for a clean close by the authority.
        reason: Option<String>,
    },
}

impl From<InboundEvent> for ClientEvent {
    fn from(event: InboundEvent) -> Self {
        ClientEvent::Inbound(event)
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
    fn move_applied_index_is_validated() {
        let ok = InboundEvent::try_from(ServerMessage::MoveApplied {
            index: 8,
            symbol: Symbol::O,
        })
        .unwrap();
        assert_eq!(
            ok,
            InboundEvent::MoveApplied {
                index: CellIndex::new(8).unwrap(),
                symbol: Symbol::O
            }
        );

        let err = InboundEvent::try_from(ServerMessage::MoveApplied {
            index: 9,
            symbol: Symbol::O,
        })
        .unwrap_err();
        assert!(matches!(err, SessionError::InvalidIndex(9)));
    }

    #[test]
    fn names_follow_server_messages() {
        let start = ServerMessage::SessionStart { symbol: Symbol::X };
        let name = start.name();
        assert_eq!(InboundEvent::try_from(start).unwrap().name(), name);
        assert_eq!(InboundEvent::OpponentDeparted.name(), "opponent.departed");
    }
}
