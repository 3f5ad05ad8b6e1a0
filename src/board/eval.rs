//! Static evaluation.
//!
//! The bulk of the score is the incrementally-maintained material +
//! piece-square accumulator. On top of that: a pawn-king structure term
//! served from the per-thread cache, a passed-pawn advance term that
//! depends on the rest of the board, and a bishop-pair bonus. The two
//! halves of every packed score are blended by game phase at the end.

use super::attack_tables::KING_ATTACKS;
use super::masks::{ADJACENT_FILES, PASSED_SPANS};
use super::pst::{make_score, score_eg, score_mg, PHASE_TOTAL, PHASE_WEIGHTS};
use super::state::Position;
use super::types::bitboard::{file_mask, popcount, BitIter};
use super::types::{Color, Piece, Square};
use crate::pawn_king::PawnKingTable;

const BISHOP_PAIR: i32 = make_score(25, 45);
const PAWN_ISOLATED: i32 = make_score(-11, -14);
const PAWN_DOUBLED: i32 = make_score(-10, -22);
const KING_SHELTER: i32 = make_score(9, -2);

/// Passed pawn bonus by relative rank.
const PASSED_RANK: [i32; 8] = [
    0,
    make_score(5, 12),
    make_score(8, 18),
    make_score(14, 34),
    make_score(32, 60),
    make_score(70, 110),
    make_score(120, 180),
    0,
];

/// Extra for a passed pawn whose stop square is empty.
const PASSED_FREE_ADVANCE: i32 = make_score(8, 24);

/// Side-to-move bonus.
const TEMPO: i32 = 12;

impl Position {
    /// Evaluate the position in centipawns from the side to move's
    /// perspective.
    #[must_use]
    pub fn evaluate(&self, pawn_king: &mut PawnKingTable) -> i32 {
        let (passed, pk_eval) = match pawn_king.get(self.pk_hash) {
            Some(hit) => hit,
            None => {
                let computed = self.evaluate_pawns_and_kings();
                pawn_king.store(self.pk_hash, computed.0, computed.1);
                computed
            }
        };

        let mut score = self.psqt_mat + pk_eval + self.evaluate_passers(passed);

        for color in [Color::White, Color::Black] {
            let sign = if color == Color::White { 1 } else { -1 };
            if popcount(self.bitboard(color, Piece::Bishop)) >= 2 {
                score += sign * BISHOP_PAIR;
            }
        }

        let tapered = self.taper(score);
        match self.side_to_move {
            Color::White => tapered + TEMPO,
            Color::Black => -tapered + TEMPO,
        }
    }

    /// Blend the packed halves by remaining material.
    fn taper(&self, packed: i32) -> i32 {
        let mut phase = 0;
        for piece in 0..6 {
            phase += PHASE_WEIGHTS[piece] * popcount(self.pieces[piece]) as i32;
        }
        let phase = phase.min(PHASE_TOTAL);
        (score_mg(packed) * phase + score_eg(packed) * (PHASE_TOTAL - phase)) / PHASE_TOTAL
    }

    /// Cacheable pawn and king structure: returns the passed-pawn
    /// bitboard for both colours and the packed structure score.
    pub(crate) fn evaluate_pawns_and_kings(&self) -> (u64, i32) {
        let mut passed = 0u64;
        let mut eval = 0i32;

        for color in [Color::White, Color::Black] {
            let sign = if color == Color::White { 1 } else { -1 };
            let us = self.bitboard(color, Piece::Pawn);
            let them = self.bitboard(color.opponent(), Piece::Pawn);

            for sq_idx in BitIter(us) {
                let sq = Square::from_index(sq_idx);
                let file = sq.file();

                if ADJACENT_FILES[file] & us == 0 {
                    eval += sign * PAWN_ISOLATED;
                }
                if popcount(file_mask(file) & us) > 1 {
                    eval += sign * PAWN_DOUBLED;
                }
                if PASSED_SPANS[color.index()][sq_idx] & them == 0 {
                    passed |= sq.bit();
                    let rel_rank = match color {
                        Color::White => sq.rank(),
                        Color::Black => 7 - sq.rank(),
                    };
                    eval += sign * PASSED_RANK[rel_rank];
                }
            }

            // Shelter: own pawns in the king's immediate zone.
            let king_idx = self.king_square(color).index();
            let shield = KING_ATTACKS[king_idx] & us;
            eval += sign * KING_SHELTER * popcount(shield) as i32;
        }

        (passed, eval)
    }

    /// Board-dependent passed pawn term, outside the pawn-king cache.
    fn evaluate_passers(&self, passed: u64) -> i32 {
        let mut eval = 0i32;
        let occupied = self.occupied();

        for color in [Color::White, Color::Black] {
            let sign = if color == Color::White { 1 } else { -1 };
            let ours = passed & self.colours[color.index()];
            for sq_idx in BitIter(ours) {
                let stop = match color {
                    Color::White => sq_idx + 8,
                    Color::Black => sq_idx.wrapping_sub(8),
                };
                if stop < 64 && occupied & (1u64 << stop) == 0 {
                    eval += sign * PASSED_FREE_ADVANCE;
                }
            }
        }
        eval
    }
}
