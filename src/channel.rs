//! Outbound half of the event channel.
//!
//! The inbound half is the ordered inbox returned by
//! [`SessionClient::start`](crate::client::SessionClient::start); the session
//! only ever needs to *emit* intents, so that is all this trait exposes.
//!
//! # Implementing a Custom Channel
//!
//! ```rust
//! use std::cell::RefCell;
//! use tictactoe_session_client::{ClientMessage, EventChannel, SessionError};
//!
//! #[derive(Default)]
//! struct Recorder(RefCell<Vec<ClientMessage>>);
//!
//! impl EventChannel for Recorder {
//!     fn emit(&self, intent: ClientMessage) -> Result<(), SessionError> {
//!         self.0.borrow_mut().push(intent);
//!         Ok(())
//!     }
//! }
//! ```

use tokio::sync::mpsc;

use crate::error::{Result, SessionError};
use crate::protocol::ClientMessage;

/// Sink for outbound intents.
///
/// `emit` must not block: it is called from UI input handlers and returns as
/// soon as the intent is queued.
pub trait EventChannel {
    /// Queue an outbound message for the authority.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] (or a transport error) if the
    /// channel can no longer deliver messages.
    fn emit(&self, intent: ClientMessage) -> Result<()>;
}

impl EventChannel for mpsc::UnboundedSender<ClientMessage> {
    fn emit(&self, intent: ClientMessage) -> Result<()> {
        self.send(intent).map_err(|_| SessionError::NotConnected)
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

    #[test]
    fn unbounded_sender_forwards_intents() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let intent = ClientMessage::MoveAttempt {
            index: 3,
            symbol: Symbol::O,
        };
        tx.emit(intent.clone()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), intent);
    }

    #[test]
    fn closed_sender_reports_not_connected() {
        let (tx, rx) = mpsc::unbounded_channel::<ClientMessage>();
        drop(rx);
        let err = tx
            .emit(ClientMessage::MoveAttempt {
                index: 0,
                symbol: Symbol::X,
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
    }
}
