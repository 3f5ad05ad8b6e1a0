//! Engine facade flows: positions, options, games, pondering.

use sable::engine::Engine;
use sable::search::Limits;

#[test]
fn plays_a_short_game_against_itself() {
    let mut engine = Engine::new();
    for _ in 0..6 {
        let result = engine.go(Limits::Depth(4), None);
        let Some(best) = result.best_move else {
            break; // mate or stalemate
        };
        let uci = engine.position().move_to_uci(best);
        engine.apply_move(&uci).expect("engine move is legal");
    }
    // The game stayed internally consistent throughout.
    let pos = engine.position();
    assert_eq!(pos.hash(), pos.compute_hash());
}

#[test]
fn ponder_move_is_a_legal_reply() {
    let mut engine = Engine::new();
    let result = engine.go(Limits::Depth(6), None);
    let best = result.best_move.expect("startpos has a move");

    if let Some(ponder) = result.ponder_move {
        let mut pos = engine.position().clone();
        let undo = pos.apply(best).expect("best move applies");
        assert!(pos.legal_moves().contains(ponder), "ponder reply illegal");
        pos.revert(best, undo);
    }
}

#[test]
fn new_game_clears_learned_state() {
    let mut engine = Engine::new();
    engine.go(Limits::Depth(5), None);
    assert!(engine.transposition_table().hashfull() > 0);
    engine.new_game();
    assert_eq!(engine.transposition_table().hashfull(), 0);
}

#[test]
fn options_round_trip() {
    let mut engine = Engine::new();
    engine.set_threads(3);
    engine.set_hash_mb(4);
    engine.set_chess960(true);
    assert_eq!(engine.threads(), 3);
    assert_eq!(engine.hash_mb(), 4);
    assert!(engine.chess960());

    // Floors: zero is promoted to the minimum.
    engine.set_threads(0);
    engine.set_hash_mb(0);
    assert_eq!(engine.threads(), 1);
    assert_eq!(engine.hash_mb(), 1);
}

#[test]
fn chess960_position_castles_king_onto_rook() {
    let mut engine = Engine::new();
    engine.set_chess960(true);
    // A Chess960 start: king on c1 is not where standard castling expects it.
    engine
        .set_position("nrk1bbrn/pppppppp/8/8/8/8/PPPPPPPP/NRK1BBRN w GBgb - 0 1")
        .unwrap();
    let result = engine.go(Limits::Depth(4), None);
    assert!(result.best_move.is_some());
}

#[test]
fn multithreaded_game_move_is_legal() {
    let mut engine = Engine::new();
    engine.set_threads(4);
    engine
        .set_position("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3")
        .unwrap();
    let result = engine.go(Limits::Depth(6), None);
    let best = result.best_move.expect("middlegame has moves");
    let mut pos = engine.position().clone();
    assert!(pos.legal_moves().contains(best));
}
