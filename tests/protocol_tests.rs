#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire-format tests: JSON fixtures for every event in the channel contract,
//! and boundary validation of cell indices.

use tictactoe_session_client::{
    CellIndex, ClientMessage, InboundEvent, ServerMessage, SessionError, Symbol,
};

fn decode(json: &str) -> ServerMessage {
    serde_json::from_str(json).expect("fixture should decode")
}

// ════════════════════════════════════════════════════════════════════
// Inbound fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn session_start_fixture() {
    let msg = decode(r#"{"event":"session.start","data":{"symbol":"O"}}"#);
    assert_eq!(msg, ServerMessage::SessionStart { symbol: Symbol::O });
}

#[test]
fn opponent_departed_fixture() {
    let msg = decode(r#"{"event":"opponent.departed","data":{}}"#);
    assert_eq!(msg, ServerMessage::OpponentDeparted {});
    assert_eq!(
        InboundEvent::try_from(msg).unwrap(),
        InboundEvent::OpponentDeparted
    );
}

#[test]
fn move_applied_fixture() {
    let msg = decode(r#"{"event":"move.applied","data":{"index":7,"symbol":"X"}}"#);
    assert_eq!(
        InboundEvent::try_from(msg).unwrap(),
        InboundEvent::MoveApplied {
            index: CellIndex::new(7).unwrap(),
            symbol: Symbol::X
        }
    );
}

#[test]
fn field_order_does_not_matter() {
    let msg = decode(r#"{"data":{"symbol":"O","index":0},"event":"move.applied"}"#);
    assert_eq!(
        msg,
        ServerMessage::MoveApplied {
            index: 0,
            symbol: Symbol::O
        }
    );
}

// ════════════════════════════════════════════════════════════════════
// Rejections
// ════════════════════════════════════════════════════════════════════

#[test]
fn out_of_range_index_rejected_at_boundary() {
    for index in [9u8, 10, 200, 255] {
        let msg = ServerMessage::MoveApplied {
            index,
            symbol: Symbol::X,
        };
        let err = InboundEvent::try_from(msg).unwrap_err();
        assert!(
            matches!(err, SessionError::InvalidIndex(i) if i == usize::from(index)),
            "index {index}: {err}"
        );
    }
}

#[test]
fn negative_or_oversized_index_fails_to_decode() {
    for json in [
        r#"{"event":"move.applied","data":{"index":-1,"symbol":"X"}}"#,
        r#"{"event":"move.applied","data":{"index":256,"symbol":"X"}}"#,
    ] {
        assert!(serde_json::from_str::<ServerMessage>(json).is_err(), "{json}");
    }
}

#[test]
fn unknown_event_and_symbol_fail_to_decode() {
    for json in [
        r#"{"event":"game.begin","data":{"symbol":"X"}}"#,
        r#"{"event":"session.start","data":{"symbol":"Z"}}"#,
        r#"{"event":"session.start","data":{}}"#,
        r#"{"data":{"symbol":"X"}}"#,
    ] {
        assert!(serde_json::from_str::<ServerMessage>(json).is_err(), "{json}");
    }
}

#[test]
fn outbound_messages_do_not_decode_as_inbound() {
    let json = serde_json::to_string(&ClientMessage::MoveAttempt {
        index: 1,
        symbol: Symbol::O,
    })
    .unwrap();
    assert!(serde_json::from_str::<ServerMessage>(&json).is_err());
}

// ════════════════════════════════════════════════════════════════════
// Outbound
// ════════════════════════════════════════════════════════════════════

#[test]
fn move_attempt_fixture() {
    let json = serde_json::to_string(&ClientMessage::move_attempt(
        CellIndex::new(8).unwrap(),
        Symbol::O,
    ))
    .unwrap();
    assert_eq!(
        json,
        r#"{"event":"move.attempt","data":{"index":8,"symbol":"O"}}"#
    );
}

#[test]
fn move_attempt_decodes_for_authority_side_tooling() {
    let msg: ClientMessage =
        serde_json::from_str(r#"{"event":"move.attempt","data":{"index":3,"symbol":"X"}}"#)
            .unwrap();
    assert_eq!(msg.name(), "move.attempt");
    assert_eq!(
        msg,
        ClientMessage::MoveAttempt {
            index: 3,
            symbol: Symbol::X
        }
    );
}
