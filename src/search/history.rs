//! Per-thread move-ordering tables: quiet-move history and killers.

use crate::board::{Color, Move, Piece, MAX_PLY, NONE_MOVE};

/// History scores saturate at this magnitude.
const HISTORY_MAX: i32 = 1 << 14;

/// Success counters for quiet moves, indexed by colour, moving piece, and
/// destination square. Rewarded and penalised by depth squared at beta
/// cutoffs, so deep confirmations dominate shallow noise.
pub struct HistoryTable {
    scores: Box<[[[i32; 64]; 6]; 2]>,
}

impl HistoryTable {
    #[must_use]
    pub fn new() -> Self {
        HistoryTable {
            scores: Box::new([[[0; 64]; 6]; 2]),
        }
    }

    #[inline]
    #[must_use]
    pub fn score(&self, color: Color, piece: Piece, mv: Move) -> i32 {
        self.scores[color.index()][piece.index()][mv.to().index()]
    }

    pub fn update(&mut self, color: Color, piece: Piece, mv: Move, delta: i32) {
        let entry = &mut self.scores[color.index()][piece.index()][mv.to().index()];
        *entry = (*entry + delta).clamp(-HISTORY_MAX, HISTORY_MAX);
    }

    /// Reward a cutoff move and punish the quiets tried before it.
    pub fn reward_cutoff(
        &mut self,
        color: Color,
        pieces: &[(Piece, Move)],
        cutoff: Move,
        depth: i32,
    ) {
        let delta = depth * depth;
        for &(piece, mv) in pieces {
            if mv == cutoff {
                self.update(color, piece, mv, delta);
            } else {
                self.update(color, piece, mv, -delta);
            }
        }
    }

    pub fn clear(&mut self) {
        self.scores = Box::new([[[0; 64]; 6]; 2]);
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        HistoryTable::new()
    }
}

/// Two killer slots per search height. Insertion shifts the previous
/// primary down and never duplicates.
pub struct KillerTable {
    moves: [[Move; 2]; MAX_PLY],
}

impl KillerTable {
    #[must_use]
    pub fn new() -> Self {
        KillerTable {
            moves: [[NONE_MOVE; 2]; MAX_PLY],
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, height: usize) -> [Move; 2] {
        self.moves[height]
    }

    pub fn update(&mut self, height: usize, mv: Move) {
        if height < MAX_PLY && self.moves[height][0] != mv {
            self.moves[height][1] = self.moves[height][0];
            self.moves[height][0] = mv;
        }
    }

    pub fn clear(&mut self) {
        self.moves = [[NONE_MOVE; 2]; MAX_PLY];
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        KillerTable::new()
    }
}
