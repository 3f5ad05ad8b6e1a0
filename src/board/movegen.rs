//! Pseudo-legal move generation, split into noisy and quiet streams.
//!
//! Generated moves may still expose their own king; `apply` is the final
//! legality filter. Castles are the exception: their full path and attack
//! tests run at generation time, where the work is naturally bounded.

use super::attack_tables::{bishop_attacks, queen_attacks, rook_attacks};
use super::attack_tables::{KING_ATTACKS, KNIGHT_ATTACKS, PAWN_ATTACKS};
use super::state::Position;
use super::types::bitboard::{rank_mask, BitIter, RANK_1, RANK_8};
use super::types::{Color, Move, MoveList, Piece, Square, PROMOTION_PIECES};

impl Position {
    /// Captures, en-passant, and promotions.
    pub(crate) fn generate_noisy(&self, moves: &mut MoveList) {
        let us = self.side_to_move;
        let them = us.opponent();
        let occupied = self.occupied();
        let enemy = self.colours[them.index()];
        let last_rank = if us == Color::White { RANK_8 } else { RANK_1 };
        let forward: isize = if us == Color::White { 8 } else { -8 };

        // Pawns: captures, promotion pushes, en passant
        for from_idx in BitIter(self.bitboard(us, Piece::Pawn)) {
            let from = Square::from_index(from_idx);

            for to_idx in BitIter(PAWN_ATTACKS[us.index()][from_idx] & enemy) {
                let to = Square::from_index(to_idx);
                if to.bit() & last_rank != 0 {
                    for promo in PROMOTION_PIECES {
                        moves.push(Move::promotion(from, to, promo));
                    }
                } else {
                    moves.push(Move::normal(from, to));
                }
            }

            let push_idx = (from_idx as isize + forward) as usize;
            let push = Square::from_index(push_idx);
            if push.bit() & last_rank != 0 && occupied & push.bit() == 0 {
                for promo in PROMOTION_PIECES {
                    moves.push(Move::promotion(from, push, promo));
                }
            }

            if let Some(ep) = self.ep_square {
                if PAWN_ATTACKS[us.index()][from_idx] & ep.bit() != 0 {
                    moves.push(Move::en_passant(from, ep));
                }
            }
        }

        // Piece captures
        self.generate_piece_moves(moves, enemy);
    }

    /// Non-captures: pawn pushes below the last rank, piece moves to empty
    /// squares, and castles.
    pub(crate) fn generate_quiet(&self, moves: &mut MoveList) {
        let us = self.side_to_move;
        let occupied = self.occupied();
        let last_rank = if us == Color::White { RANK_8 } else { RANK_1 };
        let start_rank = if us == Color::White { 1 } else { 6 };
        let forward: isize = if us == Color::White { 8 } else { -8 };

        for from_idx in BitIter(self.bitboard(us, Piece::Pawn)) {
            let from = Square::from_index(from_idx);
            let push_idx = (from_idx as isize + forward) as usize;
            let push = Square::from_index(push_idx);
            if occupied & push.bit() != 0 || push.bit() & last_rank != 0 {
                continue;
            }
            moves.push(Move::normal(from, push));
            if from.rank() == start_rank {
                let double = Square::from_index((push_idx as isize + forward) as usize);
                if occupied & double.bit() == 0 {
                    moves.push(Move::normal(from, double));
                }
            }
        }

        self.generate_piece_moves(moves, !occupied);

        // Castles, fully validated here
        if !self.in_check() {
            let back_rank = if us == Color::White { 0 } else { 7 };
            let king = self.king_square(us);
            let rooks = self.castle_rooks & self.colours[us.index()] & rank_mask(back_rank);
            for rook_idx in BitIter(rooks) {
                let rook_sq = Square::from_index(rook_idx);
                if self.castle_pseudo_legal(king, rook_sq) {
                    moves.push(Move::castle(king, rook_sq));
                }
            }
        }
    }

    /// Knight through king moves restricted to `targets`.
    fn generate_piece_moves(&self, moves: &mut MoveList, targets: u64) {
        let us = self.side_to_move;
        let occupied = self.occupied();

        for from_idx in BitIter(self.bitboard(us, Piece::Knight)) {
            let from = Square::from_index(from_idx);
            for to_idx in BitIter(KNIGHT_ATTACKS[from_idx] & targets) {
                moves.push(Move::normal(from, Square::from_index(to_idx)));
            }
        }
        for from_idx in BitIter(self.bitboard(us, Piece::Bishop)) {
            let from = Square::from_index(from_idx);
            for to_idx in BitIter(bishop_attacks(from_idx, occupied) & targets) {
                moves.push(Move::normal(from, Square::from_index(to_idx)));
            }
        }
        for from_idx in BitIter(self.bitboard(us, Piece::Rook)) {
            let from = Square::from_index(from_idx);
            for to_idx in BitIter(rook_attacks(from_idx, occupied) & targets) {
                moves.push(Move::normal(from, Square::from_index(to_idx)));
            }
        }
        for from_idx in BitIter(self.bitboard(us, Piece::Queen)) {
            let from = Square::from_index(from_idx);
            for to_idx in BitIter(queen_attacks(from_idx, occupied) & targets) {
                moves.push(Move::normal(from, Square::from_index(to_idx)));
            }
        }
        let king_idx = self.king_square(us).index();
        for to_idx in BitIter(KING_ATTACKS[king_idx] & targets) {
            moves.push(Move::normal(
                Square::from_index(king_idx),
                Square::from_index(to_idx),
            ));
        }
    }

    /// All pseudo-legal moves, noisy first.
    pub(crate) fn generate_all(&self, moves: &mut MoveList) {
        self.generate_noisy(moves);
        self.generate_quiet(moves);
    }

    /// Fully legal moves, filtered through apply/revert.
    #[must_use]
    pub fn legal_moves(&mut self) -> MoveList {
        let mut pseudo = MoveList::new();
        self.generate_all(&mut pseudo);

        let mut legal = MoveList::new();
        for &mv in &pseudo {
            if let Some(undo) = self.apply(mv) {
                self.revert(mv, undo);
                legal.push(mv);
            }
        }
        legal
    }

    /// Count leaf nodes of the legal move tree to `depth`.
    #[must_use]
    pub fn perft(&mut self, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }
        let mut moves = MoveList::new();
        self.generate_all(&mut moves);

        let mut nodes = 0;
        for &mv in &moves {
            if let Some(undo) = self.apply(mv) {
                nodes += if depth == 1 { 1 } else { self.perft(depth - 1) };
                self.revert(mv, undo);
            }
        }
        nodes
    }
}
