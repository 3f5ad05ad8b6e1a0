//! Zobrist hashing for chess positions.
//!
//! Provides incrementally-updatable 64-bit position hashes for the
//! transposition table, plus a pawn-and-king-only hash for the pawn
//! structure cache. Keys come from a fixed-seed RNG so hashes are
//! deterministic across runs and platforms.

use once_cell::sync::Lazy;
use rand::prelude::*;

use crate::board::{Color, Piece, Square};

pub(crate) struct ZobristKeys {
    // piece_keys[piece_type][color][square_index]
    pub(crate) piece_keys: [[[u64; 64]; 2]; 6],
    pub(crate) black_to_move_key: u64,
    // en_passant_keys[file_index] (only the file matters for the EP target)
    pub(crate) en_passant_keys: [u64; 8],
    // castle_keys[square]: one key per rook square, XOR-folded for every
    // set bit of the castle-rooks mask. Matches the bitboard castling
    // representation, so stripping a rook's right is a single XOR.
    pub(crate) castle_keys: [u64; 64],
}

impl ZobristKeys {
    fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(0x5AB1E_u64);
        let mut piece_keys = [[[0; 64]; 2]; 6];
        let mut en_passant_keys = [0; 8];
        let mut castle_keys = [0; 64];

        for piece in &mut piece_keys {
            for color in piece.iter_mut() {
                for key in color.iter_mut() {
                    *key = rng.gen();
                }
            }
        }

        let black_to_move_key = rng.gen();

        for key in &mut en_passant_keys {
            *key = rng.gen();
        }

        for key in &mut castle_keys {
            *key = rng.gen();
        }

        ZobristKeys {
            piece_keys,
            black_to_move_key,
            en_passant_keys,
            castle_keys,
        }
    }

    /// XOR of the castle keys for every set bit of a castle-rooks mask.
    pub(crate) fn castle_hash(&self, castle_rooks: u64) -> u64 {
        let mut hash = 0;
        let mut rooks = castle_rooks;
        while rooks != 0 {
            let sq = rooks.trailing_zeros() as usize;
            rooks &= rooks - 1;
            hash ^= self.castle_keys[sq];
        }
        hash
    }
}

pub(crate) static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);

#[inline]
pub(crate) fn piece_key(piece: Piece, color: Color, sq: Square) -> u64 {
    ZOBRIST.piece_keys[piece.index()][color.index()][sq.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic() {
        let a = ZobristKeys::new();
        let b = ZobristKeys::new();
        assert_eq!(a.piece_keys[3][1][42], b.piece_keys[3][1][42]);
        assert_eq!(a.black_to_move_key, b.black_to_move_key);
        assert_eq!(a.castle_keys[7], b.castle_keys[7]);
    }

    #[test]
    fn castle_hash_folds_per_rook() {
        let keys = &*ZOBRIST;
        let mask = (1u64 << 0) | (1u64 << 7);
        assert_eq!(
            keys.castle_hash(mask),
            keys.castle_keys[0] ^ keys.castle_keys[7]
        );
        assert_eq!(keys.castle_hash(0), 0);
    }
}
