//! Read-only projection of a [`Session`] for rendering, plus input routing.

use std::fmt;

use tracing::warn;

use crate::board::{Symbol, CELL_COUNT};
use crate::channel::EventChannel;
use crate::session::{Session, StatusView};

/// Everything a front-end needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    /// `'X'`, `'O'` or `' '` per cell, row-major.
    pub cells: [char; CELL_COUNT],
    /// Human-readable status line.
    pub status_text: String,
    /// `You are 'X'.` once the authority assigned a symbol.
    pub symbol_text: Option<String>,
}

impl fmt::Display for RenderedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(symbol_text) = &self.symbol_text {
            writeln!(f, "{symbol_text}")?;
        }
        writeln!(f, "{}", self.status_text)?;
        for (row, chunk) in self.cells.chunks(3).enumerate() {
            if row > 0 {
                writeln!(f, "---+---+---")?;
            }
            let line: Vec<String> = chunk.iter().map(|c| format!(" {c} ")).collect();
            writeln!(f, "{}", line.join("|"))?;
        }
        Ok(())
    }
}

/// Borrows a [`Session`] to render it and to route cell activations.
///
/// Holds no state of its own; build one per frame.
#[derive(Debug, Clone, Copy)]
pub struct ViewAdapter<'a> {
    session: &'a Session,
}

impl<'a> ViewAdapter<'a> {
    /// Borrow `session` for one render or input pass.
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Project the session into display cells and status text.
    pub fn render(&self) -> RenderedView {
        let mut cells = [' '; CELL_COUNT];
        for (out, cell) in cells.iter_mut().zip(self.session.board().cells()) {
            if let Some(symbol) = cell.symbol() {
                *out = symbol.as_char();
            }
        }

        RenderedView {
            cells,
            status_text: self.status_text(),
            symbol_text: self
                .session
                .local_symbol()
                .map(|symbol| format!("You are '{symbol}'.")),
        }
    }

    /// Status line for the current session state.
    pub fn status_text(&self) -> String {
        match self.session.status() {
            StatusView::Waiting => "Waiting for opponent...".to_string(),
            StatusView::InProgress(_) if self.session.is_local_turn() => "Your turn".to_string(),
            StatusView::InProgress(_) => "Opponent's turn".to_string(),
            StatusView::OpponentLeft => "Your opponent left the game.".to_string(),
            StatusView::Won(_) => "You win!".to_string(),
            StatusView::Lost => "You lose.".to_string(),
            StatusView::Draw => "Draw game.".to_string(),
        }
    }

    /// Display character for a cell; `' '` for empty or out-of-range cells.
    pub fn cell_char(&self, index: usize) -> char {
        self.session
            .board()
            .cells()
            .get(index)
            .and_then(|cell| cell.symbol())
            .map_or(' ', Symbol::as_char)
    }

    /// Route a cell activation to [`Session::attempt_move`].
    ///
    /// Returns `true` if a move intent was emitted. Channel failures are
    /// logged and reported as `false`; the UI simply stays unchanged.
    pub fn on_cell_activated<C>(&self, index: usize, channel: &C) -> bool
    where
        C: EventChannel + ?Sized,
    {
        match self.session.attempt_move(index, channel) {
            Ok(emitted) => emitted,
            Err(e) => {
                warn!(index, "failed to emit move attempt: {e}");
                false
            }
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
    use crate::board::CellIndex;
    use crate::error::{Result, SessionError};
    use crate::event::InboundEvent;
    use crate::protocol::ClientMessage;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<ClientMessage>>);

    impl EventChannel for Recorder {
        fn emit(&self, intent: ClientMessage) -> Result<()> {
            self.0.borrow_mut().push(intent);
            Ok(())
        }
    }

    struct Closed;

    impl EventChannel for Closed {
        fn emit(&self, _intent: ClientMessage) -> Result<()> {
            Err(SessionError::NotConnected)
        }
    }

    fn move_applied(index: usize, symbol: Symbol) -> InboundEvent {
        InboundEvent::MoveApplied {
            index: CellIndex::new(index).unwrap(),
            symbol,
        }
    }

    #[test]
    fn waiting_view() {
        let session = Session::new();
        let view = ViewAdapter::new(&session).render();
        assert_eq!(view.cells, [' '; 9]);
        assert_eq!(view.status_text, "Waiting for opponent...");
        assert_eq!(view.symbol_text, None);
    }

    #[test]
    fn in_progress_view_tracks_turn() {
        let mut session = Session::new();
        session.apply(InboundEvent::SessionStart { symbol: Symbol::X });
        let view = ViewAdapter::new(&session).render();
        assert_eq!(view.status_text, "Your turn");
        assert_eq!(view.symbol_text.as_deref(), Some("You are 'X'."));

        session.apply(move_applied(4, Symbol::X));
        let adapter = ViewAdapter::new(&session);
        let view = adapter.render();
        assert_eq!(view.status_text, "Opponent's turn");
        assert_eq!(view.cells[4], 'X');
        assert_eq!(adapter.cell_char(4), 'X');
        assert_eq!(adapter.cell_char(99), ' ');
    }

    #[test]
    fn terminal_texts() {
        let mut lost = Session::new();
        lost.apply(InboundEvent::SessionStart { symbol: Symbol::O });
        for (i, s) in [
            (0, Symbol::X),
            (3, Symbol::O),
            (1, Symbol::X),
            (4, Symbol::O),
            (2, Symbol::X),
        ] {
            lost.apply(move_applied(i, s));
        }
        assert_eq!(ViewAdapter::new(&lost).status_text(), "You lose.");

        let mut left = Session::new();
        left.apply(InboundEvent::SessionStart { symbol: Symbol::O });
        left.apply(InboundEvent::OpponentDeparted);
        assert_eq!(
            ViewAdapter::new(&left).status_text(),
            "Your opponent left the game."
        );
    }

    #[test]
    fn cell_activation_routes_to_session() {
        let mut session = Session::new();
        session.apply(InboundEvent::SessionStart { symbol: Symbol::X });
        let channel = Recorder::default();
        let adapter = ViewAdapter::new(&session);

        assert!(adapter.on_cell_activated(8, &channel));
        assert!(!adapter.on_cell_activated(9, &channel));
        assert_eq!(channel.0.borrow().len(), 1);
    }

    #[test]
    fn cell_activation_absorbs_channel_errors() {
        let mut session = Session::new();
        session.apply(InboundEvent::SessionStart { symbol: Symbol::X });
        assert!(!ViewAdapter::new(&session).on_cell_activated(0, &Closed));
    }

    #[test]
    fn display_draws_grid() {
        let mut session = Session::new();
        session.apply(InboundEvent::SessionStart { symbol: Symbol::X });
        session.apply(move_applied(0, Symbol::X));
        let text = ViewAdapter::new(&session).render().to_string();
        assert_eq!(
            text,
            "You are 'X'.\nOpponent's turn\n X |   |   \n---+---+---\n   |   |   \n---+---+---\n   |   |   \n"
        );
    }
}
