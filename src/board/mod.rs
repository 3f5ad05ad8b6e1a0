//! Position representation and move execution.
//!
//! Uses bitboards per piece kind and per colour, with incrementally
//! maintained Zobrist hashes and a packed material/piece-square
//! accumulator. Supports full chess rules including Chess960 castling.
//!
//! # Example
//! ```
//! use sable::board::Position;
//!
//! let mut pos = Position::new();
//! let moves = pos.legal_moves();
//! assert_eq!(moves.len(), 20);
//! ```

mod attack_tables;
mod error;
mod eval;
mod fen;
mod make_unmake;
mod masks;
mod movegen;
mod pst;
mod state;
mod types;

#[cfg(test)]
mod tests;

// Public API - types users need
pub use error::{FenError, MoveParseError, SquareError};
pub use state::{NullUndo, Position, Undo};
pub use types::{Color, Move, MoveKind, MoveList, Piece, Square, MAX_PLY, NONE_MOVE, NULL_MOVE};

pub(crate) use make_unmake::SEE_VALUES;
pub(crate) use pst::PAWN_EG;
pub(crate) use types::bitboard;
