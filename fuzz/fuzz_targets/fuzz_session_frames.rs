#![no_main]

use libfuzzer_sys::fuzz_target;
use tictactoe_session_client::{InboundEvent, ServerMessage, Session, SessionPhase, ViewAdapter};

// Each input line is one inbound frame. Whatever the authority sends, the
// session must not panic, and a terminal session must never hand out a move.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut session = Session::new();
    for line in text.lines() {
        let Ok(msg) = serde_json::from_str::<ServerMessage>(line) else {
            continue;
        };
        let Ok(event) = InboundEvent::try_from(msg) else {
            continue;
        };
        session.apply(event);

        let _ = ViewAdapter::new(&session).render();
        if session.phase() != SessionPhase::InProgress || !session.is_local_turn() {
            assert!((0..9).all(|i| session.legal_intent(i).is_none()));
        }
    }
});
