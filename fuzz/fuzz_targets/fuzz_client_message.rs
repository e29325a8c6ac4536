#![no_main]

use libfuzzer_sys::fuzz_target;
use tictactoe_session_client::{CellIndex, ClientMessage, ServerMessage};

// Outbound frames as an authority would read them. Anything that decodes must
// survive a re-encode unchanged and must never be mistaken for an inbound event.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(msg) = serde_json::from_str::<ClientMessage>(text) else {
        return;
    };

    let json = serde_json::to_string(&msg).expect("ClientMessage always serializes");
    assert_eq!(serde_json::from_str::<ClientMessage>(&json).ok(), Some(msg.clone()));
    assert!(serde_json::from_str::<ServerMessage>(&json).is_err());

    let ClientMessage::MoveAttempt { index, .. } = msg;
    assert_eq!(CellIndex::try_from(index).is_ok(), usize::from(index) < 9);
});
