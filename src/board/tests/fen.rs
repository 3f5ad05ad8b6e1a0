//! FEN parsing, formatting, and wire-move tests.

use crate::board::{FenError, Position};

#[test]
fn startpos_round_trips() {
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    let pos = Position::from_fen(fen).unwrap();
    assert_eq!(pos.to_fen(), fen);
}

#[test]
fn kiwipete_round_trips() {
    let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
    let pos = Position::from_fen(fen).unwrap();
    assert_eq!(pos.to_fen(), fen);
}

#[test]
fn hash_matches_full_reconstruction() {
    for fen in [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 b - - 7 1",
    ] {
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(pos.hash(), pos.compute_hash(), "{fen}");
        assert_eq!(pos.pk_hash(), pos.compute_pk_hash(), "{fen}");
    }
}

#[test]
fn ep_square_is_dropped_when_no_capturer_exists() {
    // e3 is given, but no black pawn can take there.
    let pos = Position::from_fen("4k3/8/8/8/8/8/4P3/4K3 b - e3 0 1").unwrap();
    assert_eq!(pos.ep_square, None);

    // With a black pawn beside the pushed pawn the square stands.
    let pos = Position::from_fen("4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1").unwrap();
    assert_eq!(pos.ep_square, Some("e3".parse().unwrap()));
}

#[test]
fn chess960_file_letters_select_specific_rooks() {
    // Inner rook on b1 carries the right, not the a1 rook.
    let pos = Position::from_fen("4k3/8/8/8/8/8/8/RR2K3 w B - 0 1").unwrap();
    assert_eq!(pos.castle_rooks, 1u64 << 1);
}

#[test]
fn classic_letters_pick_outermost_rooks() {
    let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let expected = (1u64 << 0) | (1u64 << 7) | (1u64 << 56) | (1u64 << 63);
    assert_eq!(pos.castle_rooks, expected);
}

#[test]
fn castle_moves_print_per_mode() {
    let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let mv = pos.parse_move("e1g1").unwrap();
    assert_eq!(pos.move_to_uci(mv), "e1g1");

    pos.set_chess960(true);
    assert_eq!(pos.move_to_uci(mv), "e1h1");
    // King-takes-rook input is accepted in standard mode too.
    pos.set_chess960(false);
    let same = pos.parse_move("e1h1").unwrap();
    assert_eq!(same, mv);
}

#[test]
fn promotion_moves_round_trip_on_the_wire() {
    let mut pos = Position::from_fen("8/P7/8/8/8/8/8/K1k5 w - - 0 1").unwrap();
    for uci in ["a7a8q", "a7a8r", "a7a8b", "a7a8n"] {
        let mv = pos.parse_move(uci).unwrap();
        assert_eq!(pos.move_to_uci(mv), uci);
    }
}

#[test]
fn malformed_fens_are_rejected() {
    assert!(matches!(
        Position::from_fen("only two parts"),
        Err(FenError::TooFewParts { .. })
    ));
    assert!(matches!(
        Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNX w KQkq - 0 1"),
        Err(FenError::InvalidPiece { .. })
    ));
    assert!(matches!(
        Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"),
        Err(FenError::InvalidSideToMove { .. })
    ));
    assert!(matches!(
        Position::from_fen("4k3/8/8/8/8/8/8/4K3 w K - 0 1"),
        Err(FenError::MissingCastleRook { .. })
    ));
    assert!(matches!(
        Position::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1"),
        Err(FenError::BadKingCount { .. })
    ));
    assert!(matches!(
        Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq z9 0 1"),
        Err(FenError::InvalidEnPassant { .. })
    ));
}

#[test]
fn malformed_moves_are_rejected() {
    let mut pos = Position::new();
    assert!(pos.parse_move("e2").is_err());
    assert!(pos.parse_move("e2e4x9").is_err());
    assert!(pos.parse_move("i2i4").is_err());
    assert!(pos.parse_move("e2e5").is_err(), "not a legal pawn move");
    assert!(pos.parse_move("e7e8k").is_err(), "king promotion");
}
