//! Client-side session state machine.
//!
//! [`Session`] is the single source of truth for turn ownership. It advances
//! only when the authority says so: inbound [`InboundEvent`]s go through
//! [`Session::apply`], and local intents go out through
//! [`Session::attempt_move`] without touching the board. The board catches up
//! when the authority echoes the move back as `move.applied`.
//!
//! # Example
//!
//! ```
//! use tictactoe_session_client::{CellIndex, InboundEvent, Session, StatusView, Symbol};
//!
//! let mut session = Session::new();
//! session.apply(InboundEvent::SessionStart { symbol: Symbol::X });
//! assert!(session.is_local_turn());
//!
//! session.apply(InboundEvent::MoveApplied {
//!     index: CellIndex::new(4).unwrap(),
//!     symbol: Symbol::X,
//! });
//! assert!(!session.is_local_turn());
//! assert_eq!(session.status(), StatusView::InProgress(Symbol::O));
//! ```

use tracing::{debug, warn};

use crate::board::{BoardState, Cell, CellIndex, Symbol};
use crate::channel::EventChannel;
use crate::error::{Result, SessionError};
use crate::event::InboundEvent;
use crate::protocol::ClientMessage;

/// Game-logic phase. `Terminal` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Waiting,
    InProgress,
    Terminal,
}

/// Display-facing projection of the session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusView {
    /// No symbol assigned yet.
    #[default]
    Waiting,
    /// Game running; the symbol is whoever moves next.
    InProgress(Symbol),
    /// The opponent disconnected.
    OpponentLeft,
    /// The local player completed a line.
    Won(Symbol),
    /// The opponent completed a line.
    Lost,
    /// Board full with no line.
    Draw,
}

impl StatusView {
    /// Returns the game-logic phase for this status.
    pub fn phase(self) -> SessionPhase {
        match self {
            StatusView::Waiting => SessionPhase::Waiting,
            StatusView::InProgress(_) => SessionPhase::InProgress,
            StatusView::OpponentLeft | StatusView::Won(_) | StatusView::Lost | StatusView::Draw => {
                SessionPhase::Terminal
            }
        }
    }
}

/// Result of applying one inbound event.
///
/// Informational only: anomalies are already logged and absorbed by the time
/// this is returned.
#[derive(Debug)]
pub enum Applied {
    /// The event was applied normally.
    Accepted,
    /// The event was applied, but an anomaly was detected (a [`SessionError::Desync`]).
    Flagged(SessionError),
    /// The event was discarded and the session is unchanged.
    Discarded(SessionError),
}

impl Applied {
    /// Returns `true` if the event changed (or was allowed to change) the session.
    pub fn is_applied(&self) -> bool {
        matches!(self, Applied::Accepted | Applied::Flagged(_))
    }

    /// Returns the anomaly, if one was detected.
    pub fn anomaly(&self) -> Option<&SessionError> {
        match self {
            Applied::Accepted => None,
            Applied::Flagged(err) | Applied::Discarded(err) => Some(err),
        }
    }
}

/// One game between the local player and a remote opponent.
///
/// Construct a fresh `Session` per match and drop it when the match view goes
/// away.
#[derive(Debug, Clone, Default)]
pub struct Session {
    local_symbol: Option<Symbol>,
    is_local_turn: bool,
    board: BoardState,
    status: StatusView,
    last_move: Option<(CellIndex, Symbol)>,
    anomalies: usize,
}

impl Session {
    /// Creates a session waiting for an opponent: empty board, no symbol.
    pub fn new() -> Self {
        Self::default()
    }

    // ── State accessors ─────────────────────────────────────────────

    /// The symbol assigned by the authority, once the session has started.
    pub fn local_symbol(&self) -> Option<Symbol> {
        self.local_symbol
    }

    /// `true` iff the local player may emit a move intent right now.
    pub fn is_local_turn(&self) -> bool {
        self.is_local_turn
    }

    /// The board as last reported by the authority.
    pub fn board(&self) -> &BoardState {
        &self.board
    }

    /// Current status, as shown to the player.
    pub fn status(&self) -> StatusView {
        self.status
    }

    /// Lifecycle phase derived from [`status`](Session::status).
    pub fn phase(&self) -> SessionPhase {
        self.status.phase()
    }

    /// `true` once the match is won, lost, drawn or abandoned.
    pub fn is_terminal(&self) -> bool {
        self.phase() == SessionPhase::Terminal
    }

    /// The symbol expected to move next, while the game is in progress.
    pub fn turn_owner(&self) -> Option<Symbol> {
        match self.status {
            StatusView::InProgress(owner) => Some(owner),
            _ => None,
        }
    }

    /// The most recently applied move.
    pub fn last_move(&self) -> Option<(CellIndex, Symbol)> {
        self.last_move
    }

    /// Number of inbound events that were discarded or flagged.
    pub fn anomalies(&self) -> usize {
        self.anomalies
    }

    // ── Inbound events ──────────────────────────────────────────────

    /// Apply one inbound event from the authority.
    ///
    /// Never fails: protocol violations are logged and discarded, desyncs are
    /// logged and the board is mirrored to the authority's claim.
    pub fn apply(&mut self, event: InboundEvent) -> Applied {
        let applied = match event {
            InboundEvent::SessionStart { symbol } => self.on_session_start(symbol),
            InboundEvent::OpponentDeparted => self.on_opponent_left(),
            InboundEvent::MoveApplied { index, symbol } => self.on_move_applied(index, symbol),
        };

        match &applied {
            Applied::Accepted => {
                debug!(event = event.name(), status = ?self.status, "applied inbound event");
            }
            Applied::Flagged(err) => {
                self.anomalies += 1;
                warn!(event = event.name(), "{err}; board mirrored to authority");
            }
            Applied::Discarded(err) => {
                self.anomalies += 1;
                warn!(event = event.name(), "{err}; event discarded");
            }
        }

        applied
    }

    fn on_session_start(&mut self, symbol: Symbol) -> Applied {
        if self.phase() != SessionPhase::Waiting {
            return Applied::Discarded(self.violation("session.start"));
        }
        self.local_symbol = Some(symbol);
        self.is_local_turn = symbol == Symbol::X;
        self.status = StatusView::InProgress(Symbol::X);
        Applied::Accepted
    }

    fn on_opponent_left(&mut self) -> Applied {
        match self.status {
            StatusView::InProgress(_) => {
                self.is_local_turn = false;
                self.status = StatusView::OpponentLeft;
                Applied::Accepted
            }
            StatusView::OpponentLeft => Applied::Accepted,
            _ => Applied::Discarded(self.violation("opponent.departed")),
        }
    }

    /// `true` when `symbol` is not the side expected to move next. This
    /// covers an opening move by `O` as well as two moves in a row.
    fn is_out_of_turn(&self, symbol: Symbol) -> bool {
        self.turn_owner().is_some_and(|owner| owner != symbol)
    }

    fn on_move_applied(&mut self, index: CellIndex, symbol: Symbol) -> Applied {
        let local = match (self.phase(), self.local_symbol) {
            (SessionPhase::InProgress, Some(local)) => local,
            _ => return Applied::Discarded(self.violation("move.applied")),
        };

        let desync = match self.board.get(index) {
            Cell::Mark(existing) => Some(SessionError::Desync {
                index: index.get(),
                existing,
                applied: symbol,
            }),
            Cell::Empty => None,
        };
        if desync.is_none() && self.is_out_of_turn(symbol) {
            warn!(%index, %symbol, "authority applied a move out of turn order");
        }

        let board = self.board;
        self.board = board
            .with_move(index, symbol)
            .unwrap_or_else(|_| board.with_overwrite(index, symbol));
        self.last_move = Some((index, symbol));

        // Turn flag first; a terminal board overrides it below.
        if symbol != local {
            self.is_local_turn = true;
            self.status = StatusView::InProgress(local);
        } else {
            self.is_local_turn = false;
            self.status = StatusView::InProgress(local.opponent());
        }

        if let Some(winner) = self.board.winner() {
            self.is_local_turn = false;
            self.status = if winner == local {
                StatusView::Won(local)
            } else {
                StatusView::Lost
            };
        } else if self.board.is_full() {
            self.is_local_turn = false;
            self.status = StatusView::Draw;
        }

        match desync {
            Some(err) => Applied::Flagged(err),
            None => Applied::Accepted,
        }
    }

    fn violation(&self, event: &'static str) -> SessionError {
        SessionError::ProtocolViolation {
            event,
            phase: self.phase(),
        }
    }

    // ── Local intents ───────────────────────────────────────────────

    /// The move intent the local player may emit for `index`, or `None` if
    /// the move is not legal right now.
    pub fn legal_intent(&self, index: usize) -> Option<ClientMessage> {
        let index = CellIndex::new(index).ok()?;
        if self.phase() != SessionPhase::InProgress
            || !self.is_local_turn
            || !self.board.is_empty(index.get())
        {
            return None;
        }
        let symbol = self.local_symbol?;
        Some(ClientMessage::move_attempt(index, symbol))
    }

    /// Attempt a local move.
    ///
    /// If legal, emits `move.attempt` on `channel` and returns `Ok(true)`. The
    /// board is **not** updated here; it advances when the authority echoes
    /// the move as `move.applied`. Illegal attempts are a silent no-op and
    /// return `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns the channel's error if a legal intent could not be queued.
    pub fn attempt_move<C>(&self, index: usize, channel: &C) -> Result<bool>
    where
        C: EventChannel + ?Sized,
    {
        match self.legal_intent(index) {
            Some(intent) => {
                debug!(index, "emitting move attempt");
                channel.emit(intent)?;
                Ok(true)
            }
            None => {
                debug!(index, status = ?self.status, "ignoring illegal local move attempt");
                Ok(false)
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
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<ClientMessage>>);

    impl EventChannel for Recorder {
        fn emit(&self, intent: ClientMessage) -> Result<()> {
            self.0.borrow_mut().push(intent);
            Ok(())
        }
    }

    struct Broken;

    impl EventChannel for Broken {
        fn emit(&self, _intent: ClientMessage) -> Result<()> {
            Err(SessionError::NotConnected)
        }
    }

    fn idx(raw: usize) -> CellIndex {
        CellIndex::new(raw).unwrap()
    }

    fn started(symbol: Symbol) -> Session {
        let mut session = Session::new();
        assert!(session
            .apply(InboundEvent::SessionStart { symbol })
            .is_applied());
        session
    }

    fn applied(session: &mut Session, index: usize, symbol: Symbol) -> Applied {
        session.apply(InboundEvent::MoveApplied {
            index: idx(index),
            symbol,
        })
    }

    #[test]
    fn new_session_is_waiting() {
        let session = Session::new();
        assert_eq!(session.status(), StatusView::Waiting);
        assert_eq!(session.phase(), SessionPhase::Waiting);
        assert_eq!(session.local_symbol(), None);
        assert!(!session.is_local_turn());
        assert_eq!(session.board(), &BoardState::new());
    }

    #[test]
    fn session_start_as_o_waits_for_x() {
        let session = started(Symbol::O);
        assert_eq!(session.local_symbol(), Some(Symbol::O));
        assert!(!session.is_local_turn());
        assert_eq!(session.turn_owner(), Some(Symbol::X));
    }

    #[test]
    fn duplicate_session_start_is_discarded() {
        let mut session = started(Symbol::X);
        let result = session.apply(InboundEvent::SessionStart { symbol: Symbol::O });
        assert!(matches!(
            result,
            Applied::Discarded(SessionError::ProtocolViolation {
                event: "session.start",
                phase: SessionPhase::InProgress
            })
        ));
        assert_eq!(session.local_symbol(), Some(Symbol::X));
        assert!(session.is_local_turn());
        assert_eq!(session.anomalies(), 1);
    }

    #[test]
    fn move_before_start_is_discarded() {
        let mut session = Session::new();
        let result = applied(&mut session, 0, Symbol::X);
        assert!(matches!(result, Applied::Discarded(_)));
        assert!(session.board().is_empty(0));
        assert_eq!(session.phase(), SessionPhase::Waiting);
    }

    #[test]
    fn opponent_left_before_start_is_discarded() {
        let mut session = Session::new();
        assert!(matches!(
            session.apply(InboundEvent::OpponentDeparted),
            Applied::Discarded(_)
        ));
        assert_eq!(session.status(), StatusView::Waiting);
    }

    #[test]
    fn opponent_left_is_idempotent() {
        let mut session = started(Symbol::X);
        assert!(matches!(
            session.apply(InboundEvent::OpponentDeparted),
            Applied::Accepted
        ));
        assert!(matches!(
            session.apply(InboundEvent::OpponentDeparted),
            Applied::Accepted
        ));
        assert_eq!(session.status(), StatusView::OpponentLeft);
        assert!(!session.is_local_turn());
        assert_eq!(session.anomalies(), 0);
    }

    #[test]
    fn opponent_left_after_win_keeps_result() {
        let mut session = started(Symbol::X);
        for (i, s) in [
            (0, Symbol::X),
            (3, Symbol::O),
            (1, Symbol::X),
            (4, Symbol::O),
            (2, Symbol::X),
        ] {
            applied(&mut session, i, s);
        }
        assert_eq!(session.status(), StatusView::Won(Symbol::X));
        assert!(matches!(
            session.apply(InboundEvent::OpponentDeparted),
            Applied::Discarded(_)
        ));
        assert_eq!(session.status(), StatusView::Won(Symbol::X));
    }

    #[test]
    fn turn_follows_last_mover() {
        let mut session = started(Symbol::O);
        applied(&mut session, 0, Symbol::X);
        assert!(session.is_local_turn());
        assert_eq!(session.turn_owner(), Some(Symbol::O));
        applied(&mut session, 4, Symbol::O);
        assert!(!session.is_local_turn());
        assert_eq!(session.turn_owner(), Some(Symbol::X));
        assert_eq!(session.last_move(), Some((idx(4), Symbol::O)));
    }

    #[test]
    fn opening_move_by_o_is_out_of_turn() {
        let mut session = started(Symbol::X);
        assert!(session.is_out_of_turn(Symbol::O));
        assert!(!session.is_out_of_turn(Symbol::X));

        // Still mirrored: the authority decides, the turn follows the mover.
        assert!(applied(&mut session, 0, Symbol::O).is_applied());
        assert!(session.is_local_turn());
        assert!(session.is_out_of_turn(Symbol::O));
    }

    #[test]
    fn repeated_mover_is_out_of_turn() {
        let mut session = started(Symbol::O);
        applied(&mut session, 0, Symbol::X);
        assert!(session.is_out_of_turn(Symbol::X));
        assert!(!session.is_out_of_turn(Symbol::O));
    }

    #[test]
    fn duplicate_move_is_flagged_and_not_double_applied() {
        let mut session = started(Symbol::X);
        applied(&mut session, 4, Symbol::X);
        let before = *session.board();

        let result = applied(&mut session, 4, Symbol::X);
        assert!(matches!(
            result,
            Applied::Flagged(SessionError::Desync { index: 4, .. })
        ));
        assert_eq!(session.board(), &before);
        assert_eq!(session.board().mark_count(Symbol::X), 1);
        assert!(!session.is_local_turn());
        assert_eq!(session.anomalies(), 1);
    }

    #[test]
    fn desync_mirrors_authority() {
        let mut session = started(Symbol::X);
        applied(&mut session, 4, Symbol::X);
        let result = applied(&mut session, 4, Symbol::O);
        assert!(matches!(
            result.anomaly(),
            Some(SessionError::Desync {
                existing: Symbol::X,
                applied: Symbol::O,
                ..
            })
        ));
        assert_eq!(session.board().get(idx(4)), Cell::Mark(Symbol::O));
        assert!(session.is_local_turn());
    }

    #[test]
    fn attempt_move_emits_without_touching_board() {
        let session = started(Symbol::X);
        let channel = Recorder::default();
        assert!(session.attempt_move(4, &channel).unwrap());
        assert!(session.board().is_empty(4));
        assert_eq!(
            channel.0.borrow().as_slice(),
            &[ClientMessage::MoveAttempt {
                index: 4,
                symbol: Symbol::X
            }]
        );
    }

    #[test]
    fn attempt_move_rejects_illegal_attempts() {
        let channel = Recorder::default();

        let waiting = Session::new();
        assert!(!waiting.attempt_move(0, &channel).unwrap());

        let not_my_turn = started(Symbol::O);
        assert!(!not_my_turn.attempt_move(0, &channel).unwrap());

        let mut occupied = started(Symbol::O);
        applied(&mut occupied, 0, Symbol::X);
        assert!(!occupied.attempt_move(0, &channel).unwrap());
        assert!(!occupied.attempt_move(9, &channel).unwrap());
        assert!(occupied.attempt_move(1, &channel).unwrap());

        assert_eq!(channel.0.borrow().len(), 1);
    }

    #[test]
    fn attempt_move_surfaces_channel_failure() {
        let session = started(Symbol::X);
        assert!(matches!(
            session.attempt_move(0, &Broken),
            Err(SessionError::NotConnected)
        ));
        // Illegal attempts never reach the channel.
        assert!(!session.attempt_move(42, &Broken).unwrap());
    }

    #[test]
    fn status_phase_projection() {
        assert_eq!(StatusView::Waiting.phase(), SessionPhase::Waiting);
        assert_eq!(
            StatusView::InProgress(Symbol::O).phase(),
            SessionPhase::InProgress
        );
        for terminal in [
            StatusView::OpponentLeft,
            StatusView::Won(Symbol::X),
            StatusView::Lost,
            StatusView::Draw,
        ] {
            assert_eq!(terminal.phase(), SessionPhase::Terminal);
        }
    }
}
