//! The move executor: apply and revert moves against all incremental state.
//!
//! `apply` never panics on a pseudo-legal move that turns out to be
//! illegal: it detects the exposed king, reverts itself, and reports the
//! move as illegal. Every other code path pairs each `apply` with exactly
//! one `revert`.

use super::attack_tables::{bishop_attacks, queen_attacks, rook_attacks};
use super::attack_tables::{KING_ATTACKS, KNIGHT_ATTACKS, PAWN_ATTACKS};
use super::masks::BETWEEN;
use super::state::{NullUndo, Position, Undo};
use super::types::bitboard::{BitIter, RANK_1, RANK_8};
use super::types::{Color, Move, MoveKind, Piece, Square, NONE_MOVE, NULL_MOVE};
use crate::zobrist::ZOBRIST;

/// Piece values used for move-ordering estimates and exchange pruning.
pub(crate) const SEE_VALUES: [i32; 6] = [100, 450, 450, 675, 1300, 0];

/// Where the king lands for a castle encoded king-square -> rook-square.
#[inline]
pub(crate) fn castle_king_target(king: Square, rook: Square) -> Square {
    let file = if rook.index() > king.index() { 6 } else { 2 };
    Square::new(king.rank(), file)
}

/// Where the rook lands for a castle encoded king-square -> rook-square.
#[inline]
pub(crate) fn castle_rook_target(king: Square, rook: Square) -> Square {
    let file = if rook.index() > king.index() { 5 } else { 3 };
    Square::new(king.rank(), file)
}

impl Position {
    /// Apply `mv`. Returns `None` (with the position unchanged) when the
    /// move would leave the mover's own king in check.
    pub fn apply(&mut self, mv: Move) -> Option<Undo> {
        let mut undo = Undo {
            hash: self.hash,
            pk_hash: self.pk_hash,
            king_attackers: self.king_attackers,
            castle_rooks: self.castle_rooks,
            ep_square: self.ep_square,
            fifty_move_rule: self.fifty_move_rule,
            psqt_mat: self.psqt_mat,
            captured_piece: None,
        };

        self.history.push(self.hash);

        let us = self.side_to_move;
        let them = us.opponent();
        let from = mv.from();
        let to = mv.to();
        let old_castle_rooks = self.castle_rooks;

        if let Some(ep) = self.ep_square.take() {
            self.hash ^= ZOBRIST.en_passant_keys[ep.file()];
        }

        match mv.kind() {
            MoveKind::Normal => {
                let (_, piece) = self.squares[from.index()].expect("apply from empty square");
                if let Some((cap_color, captured)) = self.squares[to.index()] {
                    self.remove_piece(to, cap_color, captured);
                    undo.captured_piece = Some(captured);
                }
                self.remove_piece(from, us, piece);
                self.set_piece(to, us, piece);

                if piece == Piece::Pawn || undo.captured_piece.is_some() {
                    self.fifty_move_rule = 0;
                } else {
                    self.fifty_move_rule += 1;
                }

                // A double push only leaves an en-passant target when an
                // enemy pawn is actually placed to take it.
                if piece == Piece::Pawn && from.index().abs_diff(to.index()) == 16 {
                    let ep = Square::from_index(usize::midpoint(from.index(), to.index()));
                    if PAWN_ATTACKS[us.index()][ep.index()] & self.bitboard(them, Piece::Pawn) != 0
                    {
                        self.ep_square = Some(ep);
                        self.hash ^= ZOBRIST.en_passant_keys[ep.file()];
                    }
                }
            }
            MoveKind::Castle => {
                // from = king square, to = rook square.
                let king_to = castle_king_target(from, to);
                let rook_to = castle_rook_target(from, to);
                self.remove_piece(from, us, Piece::King);
                self.remove_piece(to, us, Piece::Rook);
                self.set_piece(king_to, us, Piece::King);
                self.set_piece(rook_to, us, Piece::Rook);
                self.fifty_move_rule += 1;
            }
            MoveKind::EnPassant => {
                let cap_sq = Square::from_index(if us == Color::White {
                    to.index() - 8
                } else {
                    to.index() + 8
                });
                self.remove_piece(cap_sq, them, Piece::Pawn);
                self.remove_piece(from, us, Piece::Pawn);
                self.set_piece(to, us, Piece::Pawn);
                undo.captured_piece = Some(Piece::Pawn);
                self.fifty_move_rule = 0;
            }
            MoveKind::Promotion => {
                if let Some((cap_color, captured)) = self.squares[to.index()] {
                    self.remove_piece(to, cap_color, captured);
                    undo.captured_piece = Some(captured);
                }
                self.remove_piece(from, us, Piece::Pawn);
                self.set_piece(to, us, mv.promoted_piece());
                self.fifty_move_rule = 0;
            }
        }

        self.castle_rooks &= self.castle_masks[from.index()] & self.castle_masks[to.index()];
        if self.castle_rooks != old_castle_rooks {
            self.hash ^= ZOBRIST.castle_hash(old_castle_rooks ^ self.castle_rooks);
        }

        self.hash ^= ZOBRIST.black_to_move_key;
        self.side_to_move = them;

        // Legality: the mover's king must not be left attacked.
        let our_king = self.king_square(us);
        if self.attackers_to(our_king, self.occupied(), them) != 0 {
            self.revert(mv, undo);
            return None;
        }

        self.recompute_king_attackers();
        Some(undo)
    }

    /// Reverse a successful `apply`.
    pub fn revert(&mut self, mv: Move, undo: Undo) {
        self.history.pop();

        let us = self.side_to_move.opponent();
        let them = self.side_to_move;
        self.side_to_move = us;

        let from = mv.from();
        let to = mv.to();

        match mv.kind() {
            MoveKind::Normal => {
                let (_, piece) = self.squares[to.index()].expect("revert to empty square");
                self.remove_piece(to, us, piece);
                self.set_piece(from, us, piece);
                if let Some(captured) = undo.captured_piece {
                    self.set_piece(to, them, captured);
                }
            }
            MoveKind::Castle => {
                let king_to = castle_king_target(from, to);
                let rook_to = castle_rook_target(from, to);
                self.remove_piece(king_to, us, Piece::King);
                self.remove_piece(rook_to, us, Piece::Rook);
                self.set_piece(from, us, Piece::King);
                self.set_piece(to, us, Piece::Rook);
            }
            MoveKind::EnPassant => {
                let cap_sq = Square::from_index(if us == Color::White {
                    to.index() - 8
                } else {
                    to.index() + 8
                });
                self.remove_piece(to, us, Piece::Pawn);
                self.set_piece(from, us, Piece::Pawn);
                self.set_piece(cap_sq, them, Piece::Pawn);
            }
            MoveKind::Promotion => {
                self.remove_piece(to, us, mv.promoted_piece());
                self.set_piece(from, us, Piece::Pawn);
                if let Some(captured) = undo.captured_piece {
                    self.set_piece(to, them, captured);
                }
            }
        }

        self.hash = undo.hash;
        self.pk_hash = undo.pk_hash;
        self.king_attackers = undo.king_attackers;
        self.castle_rooks = undo.castle_rooks;
        self.ep_square = undo.ep_square;
        self.fifty_move_rule = undo.fifty_move_rule;
        self.psqt_mat = undo.psqt_mat;
    }

    /// Hand the move to the opponent: flip the side to move, clear the
    /// en-passant square, bump the fifty-move counter. No board change.
    pub fn apply_null(&mut self) -> NullUndo {
        let undo = NullUndo {
            hash: self.hash,
            king_attackers: self.king_attackers,
            ep_square: self.ep_square,
            fifty_move_rule: self.fifty_move_rule,
        };

        self.history.push(self.hash);
        if let Some(ep) = self.ep_square.take() {
            self.hash ^= ZOBRIST.en_passant_keys[ep.file()];
        }
        self.fifty_move_rule += 1;
        self.hash ^= ZOBRIST.black_to_move_key;
        self.side_to_move = self.side_to_move.opponent();
        self.recompute_king_attackers();
        undo
    }

    /// Reverse an `apply_null`.
    pub fn revert_null(&mut self, undo: NullUndo) {
        self.history.pop();
        self.side_to_move = self.side_to_move.opponent();
        self.hash = undo.hash;
        self.king_attackers = undo.king_attackers;
        self.ep_square = undo.ep_square;
        self.fifty_move_rule = undo.fifty_move_rule;
    }

    // =========================================================================
    // Move classification
    // =========================================================================

    /// Captures, en-passant, and promotions.
    #[must_use]
    pub fn is_tactical(&self, mv: Move) -> bool {
        match mv.kind() {
            MoveKind::EnPassant | MoveKind::Promotion => true,
            MoveKind::Castle => false,
            MoveKind::Normal => self.squares[mv.to().index()].is_some(),
        }
    }

    /// Approximate static gain of a move in centipawns: value of whatever
    /// is captured, plus the upgrade for promotions.
    #[must_use]
    pub fn estimated_value(&self, mv: Move) -> i32 {
        match mv.kind() {
            MoveKind::EnPassant => SEE_VALUES[Piece::Pawn.index()],
            MoveKind::Castle => 0,
            MoveKind::Promotion => {
                let captured = self.squares[mv.to().index()]
                    .map_or(0, |(_, piece)| SEE_VALUES[piece.index()]);
                captured + SEE_VALUES[mv.promoted_piece().index()]
                    - SEE_VALUES[Piece::Pawn.index()]
            }
            MoveKind::Normal => self.squares[mv.to().index()]
                .map_or(0, |(_, piece)| SEE_VALUES[piece.index()]),
        }
    }

    // =========================================================================
    // Pseudo-legality (validating possibly-stale hash moves)
    // =========================================================================

    /// Cheap validity test for a move that may come from the transposition
    /// table and no longer fit this position. Moves that pass are safe to
    /// feed to `apply`, which still performs the final own-king check.
    #[must_use]
    pub fn is_pseudo_legal(&self, mv: Move) -> bool {
        if mv == NONE_MOVE || mv == NULL_MOVE {
            return false;
        }
        // Promotion piece bits must be clean on non-promotions.
        if !mv.is_promotion() && mv.as_u16() >> 14 != 0 {
            return false;
        }

        let us = self.side_to_move;
        let from = mv.from();
        let to = mv.to();
        let Some((color, piece)) = self.squares[from.index()] else {
            return false;
        };
        if color != us {
            return false;
        }

        match mv.kind() {
            MoveKind::Castle => self.castle_pseudo_legal(from, to),
            MoveKind::EnPassant => {
                piece == Piece::Pawn
                    && self.ep_square == Some(to)
                    && PAWN_ATTACKS[us.index()][from.index()] & to.bit() != 0
            }
            MoveKind::Promotion => {
                let last_rank = if us == Color::White { RANK_8 } else { RANK_1 };
                piece == Piece::Pawn
                    && to.bit() & last_rank != 0
                    && self.pawn_reaches(from, to, us)
            }
            MoveKind::Normal => {
                // Never land on our own piece.
                if self.colours[us.index()] & to.bit() != 0 {
                    return false;
                }
                match piece {
                    Piece::Pawn => {
                        let last_rank = if us == Color::White { RANK_8 } else { RANK_1 };
                        to.bit() & last_rank == 0 && self.pawn_reaches(from, to, us)
                    }
                    Piece::Knight => KNIGHT_ATTACKS[from.index()] & to.bit() != 0,
                    Piece::King => KING_ATTACKS[from.index()] & to.bit() != 0,
                    Piece::Bishop => bishop_attacks(from.index(), self.occupied()) & to.bit() != 0,
                    Piece::Rook => rook_attacks(from.index(), self.occupied()) & to.bit() != 0,
                    Piece::Queen => queen_attacks(from.index(), self.occupied()) & to.bit() != 0,
                }
            }
        }
    }

    /// Pawn push or capture geometry for a non-en-passant pawn move.
    fn pawn_reaches(&self, from: Square, to: Square, us: Color) -> bool {
        let occupied = self.occupied();
        let forward: isize = if us == Color::White { 8 } else { -8 };
        let from_idx = from.index() as isize;
        let to_idx = to.index() as isize;

        if PAWN_ATTACKS[us.index()][from.index()] & to.bit() != 0 {
            // Captures need a victim.
            return self.colours[us.opponent().index()] & to.bit() != 0;
        }
        if to_idx == from_idx + forward {
            return occupied & to.bit() == 0;
        }
        let start_rank = if us == Color::White { 1 } else { 6 };
        if from.rank() == start_rank && to_idx == from_idx + 2 * forward {
            let mid = Square::from_index((from_idx + forward) as usize);
            return occupied & (mid.bit() | to.bit()) == 0;
        }
        false
    }

    /// Full castle validation: rights, clear paths, and no attacked square
    /// on the king's walk. `from` is our king, `rook_sq` the chosen rook.
    pub(crate) fn castle_pseudo_legal(&self, from: Square, rook_sq: Square) -> bool {
        let us = self.side_to_move;
        let them = us.opponent();

        if self.in_check() {
            return false;
        }
        if self.castle_rooks & rook_sq.bit() & self.colours[us.index()] == 0 {
            return false;
        }
        if self.squares[from.index()] != Some((us, Piece::King)) || from.rank() != rook_sq.rank() {
            return false;
        }

        let king_to = castle_king_target(from, rook_sq);
        let rook_to = castle_rook_target(from, rook_sq);

        // Occupancy with king and castling rook lifted off the board.
        let occ = self.occupied() & !(from.bit() | rook_sq.bit());

        let king_path = BETWEEN[from.index()][king_to.index()] | king_to.bit();
        let rook_path = BETWEEN[rook_sq.index()][rook_to.index()] | rook_to.bit();
        if (king_path | rook_path) & occ != 0 {
            return false;
        }

        for sq in BitIter(king_path) {
            if self.attackers_to(Square::from_index(sq), occ, them) != 0 {
                return false;
            }
        }
        true
    }
}
