#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Behavioural tests for the session state machine: the end-to-end
//! scenarios, turn alternation, terminal absorption and duplicate delivery.

mod common;

use tictactoe_session_client::{
    Applied, BoardState, Cell, ClientMessage, InboundEvent, SessionError, SessionPhase,
    StatusView, Symbol, ViewAdapter,
};

use common::{alternating, idx, move_applied, started, RecordingChannel};

/// Small deterministic generator so game sequences are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) as usize) % bound
    }
}

/// Random legal game: alternating moves into empty cells until terminal.
fn random_game(seed: u64) -> Vec<(usize, Symbol)> {
    let mut rng = Lcg(seed);
    let mut board = BoardState::new();
    let mut mover = Symbol::X;
    let mut moves = Vec::new();
    while !board.is_terminal() {
        let empty: Vec<_> = board.empty_cells().collect();
        let cell = empty[rng.next(empty.len())];
        board = board.with_move(cell, mover).unwrap();
        moves.push((cell.get(), mover));
        mover = mover.opponent();
    }
    moves
}

/// Independent line check used as the reference for `winner()`.
fn has_line(board: &BoardState, symbol: Symbol) -> bool {
    let owns = |i: usize| board.get(idx(i)) == Cell::Mark(symbol);
    (0..3).any(|r| owns(r * 3) && owns(r * 3 + 1) && owns(r * 3 + 2))
        || (0..3).any(|c| owns(c) && owns(c + 3) && owns(c + 6))
        || (owns(0) && owns(4) && owns(8))
        || (owns(2) && owns(4) && owns(6))
}

// ════════════════════════════════════════════════════════════════════
// Scenarios
// ════════════════════════════════════════════════════════════════════

#[test]
fn scenario_a_first_move_round_trip() {
    let session = started(Symbol::X);
    assert!(session.is_local_turn());
    assert_eq!(ViewAdapter::new(&session).status_text(), "Your turn");

    let channel = RecordingChannel::default();
    assert!(session.attempt_move(4, &channel).unwrap());
    assert_eq!(
        channel.emitted.borrow().as_slice(),
        &[ClientMessage::MoveAttempt {
            index: 4,
            symbol: Symbol::X
        }]
    );
    // Nothing changes locally until the authority echoes the move.
    assert!(session.board().is_empty(4));
    assert!(session.is_local_turn());

    let mut session = session;
    assert!(matches!(
        session.apply(move_applied(4, Symbol::X)),
        Applied::Accepted
    ));
    assert_eq!(session.board().get(idx(4)), Cell::Mark(Symbol::X));
    assert!(!session.is_local_turn());
}

#[test]
fn scenario_b_opponent_completes_row() {
    let mut session = started(Symbol::O);
    for (i, s) in [(0, Symbol::X), (3, Symbol::O), (1, Symbol::X), (4, Symbol::O)] {
        session.apply(move_applied(i, s));
    }
    assert!(!session.is_local_turn());
    assert_eq!(session.board().to_string(), "XX.\nOO.\n...");

    session.apply(move_applied(2, Symbol::X));
    assert_eq!(session.status(), StatusView::Lost);
    assert!(!session.is_local_turn());
    assert_eq!(session.phase(), SessionPhase::Terminal);
}

#[test]
fn scenario_c_ninth_move_without_line_is_draw() {
    // X O X
    // X O O
    // O X X
    let moves = alternating(&[0, 1, 2, 4, 3, 5, 7, 6, 8]);
    let mut session = started(Symbol::O);
    for (n, (i, s)) in moves.iter().enumerate() {
        session.apply(move_applied(*i, *s));
        if n < 8 {
            assert_eq!(session.phase(), SessionPhase::InProgress, "after move {n}");
        }
    }
    assert_eq!(session.status(), StatusView::Draw);
    assert!(!session.is_local_turn());
    assert_eq!(ViewAdapter::new(&session).status_text(), "Draw game.");
}

#[test]
fn scenario_d_opponent_departs() {
    let mut session = started(Symbol::X);
    session.apply(move_applied(0, Symbol::X));
    session.apply(move_applied(4, Symbol::O));
    assert!(session.is_local_turn());

    session.apply(InboundEvent::OpponentDeparted);
    assert_eq!(session.status(), StatusView::OpponentLeft);
    assert!(!session.is_local_turn());

    let channel = RecordingChannel::default();
    assert!(!session.attempt_move(8, &channel).unwrap());
    assert_eq!(channel.count(), 0);
}

#[test]
fn winning_own_move_ends_turn() {
    let mut session = started(Symbol::X);
    for (i, s) in alternating(&[0, 3, 1, 4, 2]) {
        session.apply(move_applied(i, s));
    }
    assert_eq!(session.status(), StatusView::Won(Symbol::X));
    assert!(!session.is_local_turn());
    assert_eq!(ViewAdapter::new(&session).status_text(), "You win!");
}

// ════════════════════════════════════════════════════════════════════
// Properties over generated games
// ════════════════════════════════════════════════════════════════════

#[test]
fn winner_matches_reference_after_every_move() {
    for seed in 0..300 {
        let mut board = BoardState::new();
        for (i, s) in random_game(seed) {
            board = board.with_move(idx(i), s).unwrap();
            let expected = [Symbol::X, Symbol::O]
                .into_iter()
                .find(|sym| has_line(&board, *sym));
            assert_eq!(board.winner(), expected, "seed {seed}\n{board}");
        }
    }
}

#[test]
fn turn_flag_tracks_last_mover_until_terminal() {
    for seed in 0..300 {
        for local in [Symbol::X, Symbol::O] {
            let mut session = started(local);
            assert_eq!(session.is_local_turn(), local == Symbol::X);
            for (i, s) in random_game(seed) {
                assert!(session.apply(move_applied(i, s)).is_applied());
                if session.is_terminal() {
                    assert!(!session.is_local_turn());
                } else {
                    assert_eq!(session.is_local_turn(), s != local, "seed {seed}");
                    assert_eq!(session.turn_owner(), Some(s.opponent()));
                }
            }
            assert!(session.is_terminal(), "generated games end terminal");
            assert_eq!(session.anomalies(), 0);
        }
    }
}

#[test]
fn terminal_sessions_never_emit() {
    for seed in 0..100 {
        for local in [Symbol::X, Symbol::O] {
            let mut session = started(local);
            for (i, s) in random_game(seed) {
                session.apply(move_applied(i, s));
            }
            let channel = RecordingChannel::default();
            for index in 0..16 {
                assert!(!session.attempt_move(index, &channel).unwrap());
            }
            assert_eq!(channel.count(), 0);
        }
    }

    let mut left = started(Symbol::X);
    left.apply(InboundEvent::OpponentDeparted);
    let channel = RecordingChannel::default();
    for index in 0..9 {
        assert!(!ViewAdapter::new(&left).on_cell_activated(index, &channel));
    }
    assert_eq!(channel.count(), 0);
}

#[test]
fn terminal_session_ignores_further_moves() {
    let mut session = started(Symbol::X);
    for (i, s) in alternating(&[0, 3, 1, 4, 2]) {
        session.apply(move_applied(i, s));
    }
    let board = *session.board();

    let result = session.apply(move_applied(8, Symbol::O));
    assert!(matches!(
        result,
        Applied::Discarded(SessionError::ProtocolViolation {
            event: "move.applied",
            phase: SessionPhase::Terminal
        })
    ));
    assert_eq!(session.board(), &board);
    assert_eq!(session.status(), StatusView::Won(Symbol::X));
}

// ════════════════════════════════════════════════════════════════════
// Duplicate delivery
// ════════════════════════════════════════════════════════════════════

#[test]
fn duplicate_move_applied_is_desync_not_double_apply() {
    let mut session = started(Symbol::O);
    session.apply(move_applied(0, Symbol::X));
    assert!(session.is_local_turn());

    let result = session.apply(move_applied(0, Symbol::X));
    assert!(matches!(
        result,
        Applied::Flagged(SessionError::Desync {
            index: 0,
            existing: Symbol::X,
            applied: Symbol::X
        })
    ));
    assert_eq!(session.board().mark_count(Symbol::X), 1);
    assert!(session.is_local_turn());
    assert_eq!(session.anomalies(), 1);
}

#[test]
fn duplicate_session_start_does_not_reassign_symbol() {
    let mut session = started(Symbol::O);
    session.apply(move_applied(0, Symbol::X));
    session.apply(InboundEvent::SessionStart { symbol: Symbol::X });

    assert_eq!(session.local_symbol(), Some(Symbol::O));
    assert!(session.is_local_turn());
    assert_eq!(session.board().mark_count(Symbol::X), 1);
}
