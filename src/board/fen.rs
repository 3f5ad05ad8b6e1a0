//! FEN parsing and formatting, plus wire-format move conversion.
//!
//! Castling fields accept the classic K/Q/k/q letters and the Chess960
//! file letters A-H / a-h. Castle moves print king-to-rook in Chess960
//! mode and king-to-g/c in standard mode; parsing accepts both spellings.

use std::fmt::Write as _;
use std::str::FromStr;

use super::error::{FenError, MoveParseError};
use super::make_unmake::castle_king_target;
use super::state::Position;
use super::types::bitboard::{exactly_one, rank_mask, BitIter};
use super::types::{file_to_index, rank_to_index, Color, Move, Piece, Square};

impl Position {
    /// Parse a position from FEN notation.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut pos = Position::empty();
        let parts: Vec<&str> = fen.split_whitespace().collect();

        if parts.len() < 4 {
            return Err(FenError::TooFewParts { found: parts.len() });
        }

        // Piece placement
        for (rank_idx, rank_str) in parts[0].split('/').enumerate() {
            if rank_idx >= 8 {
                return Err(FenError::InvalidRank { rank: rank_idx });
            }
            let mut file = 0;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let color = if c.is_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    let piece = Piece::from_char(c).ok_or(FenError::InvalidPiece { char: c })?;
                    if file >= 8 {
                        return Err(FenError::TooManyFiles {
                            rank: rank_idx,
                            files: file + 1,
                        });
                    }
                    pos.set_piece(Square::new(7 - rank_idx, file), color, piece);
                    file += 1;
                }
            }
        }

        for (color, name) in [(Color::White, "white"), (Color::Black, "black")] {
            if !exactly_one(pos.bitboard(color, Piece::King)) {
                return Err(FenError::BadKingCount { color_name: name });
            }
        }

        // Side to move
        match parts[1] {
            "w" => pos.side_to_move = Color::White,
            "b" => pos.side_to_move = Color::Black,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.to_string(),
                })
            }
        }

        // Castling rights -> rook-square bitboard
        for c in parts[2].chars() {
            if c == '-' {
                continue;
            }
            let color = if c.is_uppercase() {
                Color::White
            } else {
                Color::Black
            };
            let back_rank = if color == Color::White { 0 } else { 7 };
            let king_file = pos.king_square(color).file();
            let rooks = pos.bitboard(color, Piece::Rook) & rank_mask(back_rank);

            let rook_sq = match c.to_ascii_lowercase() {
                // Classic letters: outermost rook on the named side of the king.
                'k' => BitIter(rooks)
                    .filter(|&sq| sq % 8 > king_file)
                    .max(),
                'q' => BitIter(rooks)
                    .filter(|&sq| sq % 8 < king_file)
                    .min(),
                file @ 'a'..='h' => {
                    let sq = back_rank * 8 + file_to_index(file);
                    (rooks & (1u64 << sq) != 0).then_some(sq)
                }
                _ => return Err(FenError::InvalidCastling { char: c }),
            };
            let rook_sq = rook_sq.ok_or(FenError::MissingCastleRook { char: c })?;
            pos.castle_rooks |= 1u64 << rook_sq;
        }
        pos.build_castle_masks();

        // En passant target, kept only when a capture is actually available
        if parts[3] != "-" {
            let ep: Square = parts[3]
                .parse()
                .map_err(|_| FenError::InvalidEnPassant {
                    found: parts[3].to_string(),
                })?;
            let capturers = super::attack_tables::PAWN_ATTACKS
                [pos.side_to_move.opponent().index()][ep.index()]
                & pos.bitboard(pos.side_to_move, Piece::Pawn);
            if capturers != 0 {
                pos.ep_square = Some(ep);
            }
        }

        if parts.len() >= 5 {
            pos.fifty_move_rule = parts[4].parse().unwrap_or(0);
        }

        pos.refresh_incremental_state();
        Ok(pos)
    }

    /// Build the per-square castling masks from the current rights. A move
    /// touching the king square drops that side's rooks; a move touching a
    /// rook square drops that rook.
    fn build_castle_masks(&mut self) {
        self.castle_masks = [!0u64; 64];
        for color in [Color::White, Color::Black] {
            let back_rank = if color == Color::White { 0 } else { 7 };
            if self.castle_rooks & rank_mask(back_rank) != 0 {
                let king_sq = self.king_square(color);
                self.castle_masks[king_sq.index()] &= !rank_mask(back_rank);
            }
        }
        for sq in BitIter(self.castle_rooks) {
            self.castle_masks[sq] &= !(1u64 << sq);
        }
    }

    /// Format the position as a FEN string.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut rows: Vec<String> = Vec::new();
        for rank in (0..8).rev() {
            let mut row = String::new();
            let mut empty = 0;
            for file in 0..8 {
                match self.piece_at(Square::new(rank, file)) {
                    Some((color, piece)) => {
                        if empty > 0 {
                            let _ = write!(row, "{empty}");
                            empty = 0;
                        }
                        row.push(piece.to_fen_char(color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                let _ = write!(row, "{empty}");
            }
            rows.push(row);
        }

        let active = match self.side_to_move {
            Color::White => "w",
            Color::Black => "b",
        };

        let mut castling = String::new();
        for color in [Color::White, Color::Black] {
            let back_rank = if color == Color::White { 0 } else { 7 };
            let king_file = self.king_square(color).file();
            // High files first so K precedes Q.
            let rooks: Vec<usize> = BitIter(self.castle_rooks & rank_mask(back_rank)).collect();
            for &sq in rooks.iter().rev() {
                let file = sq % 8;
                let c = if self.chess960 {
                    (b'a' + file as u8) as char
                } else if file > king_file {
                    'k'
                } else {
                    'q'
                };
                castling.push(match color {
                    Color::White => c.to_ascii_uppercase(),
                    Color::Black => c,
                });
            }
        }
        if castling.is_empty() {
            castling.push('-');
        }

        let ep = self
            .ep_square
            .map_or_else(|| "-".to_string(), |sq| sq.to_string());

        format!(
            "{} {} {} {} {} {}",
            rows.join("/"),
            active,
            castling,
            ep,
            self.fifty_move_rule,
            self.history.len() / 2 + 1
        )
    }

    // =========================================================================
    // Wire-format moves
    // =========================================================================

    /// Long-algebraic spelling of a move under the current Chess960 flag.
    #[must_use]
    pub fn move_to_uci(&self, mv: Move) -> String {
        if mv.is_castle() {
            let to = if self.chess960 {
                mv.to()
            } else {
                castle_king_target(mv.from(), mv.to())
            };
            return format!("{}{}", mv.from(), to);
        }
        let mut s = format!("{}{}", mv.from(), mv.to());
        if mv.is_promotion() {
            s.push(mv.promoted_piece().to_char());
        }
        s
    }

    /// Parse a move in long algebraic notation against the current legal
    /// move set. Castles are accepted both as king-to-rook and as the
    /// standard king-to-g/c spelling.
    pub fn parse_move(&mut self, uci: &str) -> Result<Move, MoveParseError> {
        if uci.len() < 4 || uci.len() > 5 {
            return Err(MoveParseError::InvalidLength { len: uci.len() });
        }

        let chars: Vec<char> = uci.chars().collect();
        if !('a'..='h').contains(&chars[0])
            || !('1'..='8').contains(&chars[1])
            || !('a'..='h').contains(&chars[2])
            || !('1'..='8').contains(&chars[3])
        {
            return Err(MoveParseError::InvalidSquare {
                notation: uci.to_string(),
            });
        }
        if uci.len() == 5 {
            let piece = Piece::from_char(chars[4]);
            if !matches!(
                piece,
                Some(Piece::Knight | Piece::Bishop | Piece::Rook | Piece::Queen)
            ) {
                return Err(MoveParseError::InvalidPromotion { char: chars[4] });
            }
        }

        let from = Square::new(rank_to_index(chars[1]), file_to_index(chars[0]));
        let to = Square::new(rank_to_index(chars[3]), file_to_index(chars[2]));

        for mv in &self.legal_moves() {
            if self.move_to_uci(*mv) == uci {
                return Ok(*mv);
            }
            // King-takes-rook spelling, accepted in either mode.
            if mv.is_castle() && mv.from() == from && mv.to() == to {
                return Ok(*mv);
            }
        }

        Err(MoveParseError::IllegalMove {
            notation: uci.to_string(),
        })
    }
}

impl FromStr for Position {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::from_fen(s)
    }
}
