//! Apply/revert round-trip tests.

use crate::board::{Move, MoveKind, Piece, Position, Square, Undo, NONE_MOVE, NULL_MOVE};
use rand::prelude::*;

fn find_move(pos: &mut Position, uci: &str) -> Move {
    pos.parse_move(uci).expect("expected move to be legal")
}

/// Everything `apply` must restore, in one comparable bundle.
fn snapshot(pos: &Position) -> (u64, u64, i32, u64, Option<Square>, u32, usize, u64) {
    (
        pos.hash,
        pos.pk_hash,
        pos.psqt_mat,
        pos.castle_rooks,
        pos.ep_square,
        pos.fifty_move_rule,
        pos.history.len(),
        pos.king_attackers,
    )
}

#[test]
fn en_passant_round_trips() {
    let mut pos =
        Position::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
            .unwrap();
    let before = snapshot(&pos);
    let mv = find_move(&mut pos, "e5f6");
    assert_eq!(mv.kind(), MoveKind::EnPassant);

    let undo = pos.apply(mv).expect("en passant is legal here");
    assert_eq!(pos.piece_at(Square::new(4, 5)), None, "captured pawn gone");
    pos.revert(mv, undo);
    assert_eq!(snapshot(&pos), before);
}

#[test]
fn promotion_round_trips() {
    let mut pos = Position::from_fen("8/P7/8/8/8/8/8/K1k5 w - - 0 1").unwrap();
    let before = snapshot(&pos);
    let mv = find_move(&mut pos, "a7a8q");

    let undo = pos.apply(mv).unwrap();
    assert_eq!(
        pos.piece_at(Square::new(7, 0)),
        Some((crate::board::Color::White, Piece::Queen))
    );
    pos.revert(mv, undo);
    assert_eq!(snapshot(&pos), before);
    assert_eq!(
        pos.piece_at(Square::new(6, 0)),
        Some((crate::board::Color::White, Piece::Pawn))
    );
}

#[test]
fn castle_round_trips_and_strips_rights() {
    let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let before = snapshot(&pos);
    let mv = find_move(&mut pos, "e1g1");
    assert_eq!(mv.kind(), MoveKind::Castle);

    let undo = pos.apply(mv).unwrap();
    // King on g1, rook on f1, white rights gone, black rights intact.
    assert_eq!(pos.king_square(crate::board::Color::White), Square::new(0, 6));
    assert_eq!(
        pos.piece_at(Square::new(0, 5)),
        Some((crate::board::Color::White, Piece::Rook))
    );
    assert_eq!(pos.castle_rooks & 0xFF, 0);
    assert_ne!(pos.castle_rooks >> 56, 0);

    pos.revert(mv, undo);
    assert_eq!(snapshot(&pos), before);
}

#[test]
fn rook_move_strips_one_right_only() {
    let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let mv = find_move(&mut pos, "h1g1");
    let undo = pos.apply(mv).unwrap();
    assert_eq!(pos.castle_rooks & (1 << 7), 0, "h1 right gone");
    assert_ne!(pos.castle_rooks & 1, 0, "a1 right kept");
    pos.revert(mv, undo);
}

#[test]
fn capturing_a_castle_rook_strips_the_right() {
    let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/5n2/R3K2R b KQkq - 0 1").unwrap();
    let mv = find_move(&mut pos, "f2h1");
    let undo = pos.apply(mv).unwrap();
    assert_eq!(pos.castle_rooks & (1 << 7), 0, "captured rook's right gone");
    pos.revert(mv, undo);
    assert_ne!(pos.castle_rooks & (1 << 7), 0);
}

#[test]
fn null_move_round_trips() {
    let mut pos =
        Position::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
            .unwrap();
    let hash = pos.hash();
    let ep = pos.ep_square;
    let side = pos.side_to_move();
    let fifty = pos.fifty_move_rule();

    let undo = pos.apply_null();
    assert_eq!(pos.ep_square, None);
    assert_ne!(pos.hash(), hash);
    assert_ne!(pos.side_to_move(), side);
    assert_eq!(pos.fifty_move_rule(), fifty + 1);

    pos.revert_null(undo);
    assert_eq!(pos.hash(), hash);
    assert_eq!(pos.ep_square, ep);
    assert_eq!(pos.side_to_move(), side);
    assert_eq!(pos.fifty_move_rule(), fifty);
}

#[test]
fn two_null_moves_compose_to_identity() {
    let mut pos = Position::new();
    let before = snapshot(&pos);
    let first = pos.apply_null();
    let second = pos.apply_null();
    pos.revert_null(second);
    pos.revert_null(first);
    assert_eq!(snapshot(&pos), before);
}

#[test]
fn illegal_move_leaves_position_untouched() {
    // The e-file knight is pinned to the king by the rook on e8.
    let mut pos = Position::from_fen("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
    let before = snapshot(&pos);
    let pinned = Move::normal(Square::new(1, 4), Square::new(3, 3)); // e2d4
    assert!(pos.is_pseudo_legal(pinned));
    assert!(pos.apply(pinned).is_none());
    assert_eq!(snapshot(&pos), before);
}

#[test]
fn legal_moves_stable_after_apply_revert() {
    let mut pos = Position::new();
    let initial_moves = pos.legal_moves();
    let mut initial_list: Vec<String> = initial_moves.iter().map(|m| pos.move_to_uci(*m)).collect();
    initial_list.sort();

    for mv in initial_moves.iter() {
        let undo = pos.apply(*mv).unwrap();
        pos.revert(*mv, undo);
    }

    let after_moves = pos.legal_moves();
    let mut after_list: Vec<String> = after_moves.iter().map(|m| pos.move_to_uci(*m)).collect();
    after_list.sort();

    assert_eq!(initial_list, after_list);
}

#[test]
fn incremental_state_matches_recompute_after_random_moves() {
    let mut pos = Position::new();
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut played: Vec<(Move, Undo)> = Vec::new();

    for _ in 0..120 {
        let moves = pos.legal_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        let undo = pos.apply(mv).unwrap();
        played.push((mv, undo));

        assert_eq!(pos.hash(), pos.compute_hash());
        assert_eq!(pos.pk_hash(), pos.compute_pk_hash());
        assert_eq!(pos.psqt_mat, pos.compute_psqt_mat());
    }

    while let Some((mv, undo)) = played.pop() {
        pos.revert(mv, undo);
        assert_eq!(pos.hash(), pos.compute_hash());
    }
    assert_eq!(pos.hash(), Position::new().hash());
}

#[test]
fn generated_moves_are_pseudo_legal_and_sentinels_are_not() {
    let fens = [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1",
    ];
    for fen in fens {
        let pos = Position::from_fen(fen).unwrap();
        let mut moves = crate::board::MoveList::new();
        pos.generate_all(&mut moves);
        for mv in &moves {
            assert!(pos.is_pseudo_legal(*mv), "{fen}: {mv:?} not pseudo-legal");
        }
        assert!(!pos.is_pseudo_legal(NONE_MOVE));
        assert!(!pos.is_pseudo_legal(NULL_MOVE));
    }
}

#[test]
fn stale_moves_from_other_positions_are_rejected() {
    let pos = Position::new();
    // A move whose from-square holds an enemy piece.
    assert!(!pos.is_pseudo_legal(Move::normal(Square::new(6, 4), Square::new(4, 4))));
    // A move from an empty square.
    assert!(!pos.is_pseudo_legal(Move::normal(Square::new(3, 3), Square::new(4, 3))));
    // A slider move through the blocked e-file.
    assert!(!pos.is_pseudo_legal(Move::normal(Square::new(0, 4), Square::new(3, 4))));
    // A castle with pieces between king and rook.
    assert!(!pos.is_pseudo_legal(Move::castle(Square::new(0, 4), Square::new(0, 7))));
}

#[test]
fn tactical_classification_and_estimates() {
    let mut pos =
        Position::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
            .unwrap();
    let ep = find_move(&mut pos, "e5f6");
    assert!(pos.is_tactical(ep));
    assert_eq!(pos.estimated_value(ep), 100);

    let quiet = find_move(&mut pos, "g1f3");
    assert!(!pos.is_tactical(quiet));
    assert_eq!(pos.estimated_value(quiet), 0);

    let mut promo_pos = Position::from_fen("8/P7/8/8/8/8/8/K1k5 w - - 0 1").unwrap();
    let promo = find_move(&mut promo_pos, "a7a8q");
    assert!(promo_pos.is_tactical(promo));
    assert!(promo_pos.estimated_value(promo) > 1000);
}

#[test]
fn fifty_move_and_repetition_draws() {
    let mut pos = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w - - 99 1").unwrap();
    assert!(!pos.is_draw(1));
    let mv = find_move(&mut pos, "h1h2");
    pos.apply(mv).unwrap();
    assert!(!pos.is_draw(1), "100 halfmoves is not yet a draw here");
    let mv = pos.parse_move("e8d8").unwrap();
    pos.apply(mv).unwrap();
    assert!(pos.is_draw(1), "101 halfmoves crosses the rule");

    // Twofold repetition inside the search horizon counts immediately.
    let mut pos = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w - - 0 1").unwrap();
    for uci in ["h1h2", "e8d8", "h2h1", "d8e8"] {
        let mv = pos.parse_move(uci).unwrap();
        pos.apply(mv).unwrap();
    }
    assert!(pos.is_draw(4), "repetition within the search tree");
    assert!(!pos.is_draw(1), "pre-root repetition needs a second visit");
}
