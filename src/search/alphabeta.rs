//! The alpha-beta kernel and quiescence search.
//!
//! Negamax with a principal-variation-style re-search discipline. A node
//! runs, in order: cancellation polls, mate-distance pruning, draw
//! detection, the horizon hand-off to quiescence, the transposition
//! probe, the static-eval pruning stack, and the staged move loop.
//! Aborts surface as an in-band zero; the iteration loop discards any
//! window that ended aborted, so the sentinel never reaches a result.

use std::sync::atomic::Ordering;

use crate::board::{Color, Move, MoveKind, Piece, MAX_PLY, NONE_MOVE, NULL_MOVE};
use crate::tt::{value_from_tt, value_to_tt, Bound};

use super::constants::{
    ABORT_POLL_MASK, BETA_PRUNING_DEPTH, FUTILITY_DEPTH, FUTILITY_MARGIN_PER_DEPTH, IID_DEPTH,
    LMP_COUNTS, LMP_DEPTH, MATE, MATE_IN_MAX, NULL_MOVE_DEPTH, QS_DELTA_MARGIN, RAZOR_DEPTH,
    RAZOR_MARGINS, VALUE_INFINITE,
};
use super::picker::MovePicker;
use super::{SearchThread, ABORT_NONE};

impl SearchThread {
    /// Poll the clock and peer flags. Runs every `ABORT_POLL_MASK + 1`
    /// nodes; returns true when this thread must unwind.
    fn should_abort(&mut self) -> bool {
        if self.nodes & ABORT_POLL_MASK == 0 {
            self.flush_nodes();
            if self.shared.external_stop.load(Ordering::Relaxed) {
                self.shared.abort_all();
            }
            let max_usage = self.shared.budget.max_usage.load(Ordering::Relaxed);
            if self.shared.elapsed_ms() >= max_usage {
                self.shared.abort_all();
            }
        }
        self.abort_state() != ABORT_NONE
    }

    /// Main search. `depth` may go negative on the way into quiescence.
    pub(crate) fn search(
        &mut self,
        mut alpha: i32,
        mut beta: i32,
        mut depth: i32,
        height: usize,
    ) -> i32 {
        let is_pv = beta > alpha + 1;
        let is_root = height == 0;

        // Step 1. Cancellation.
        if self.should_abort() {
            return 0;
        }

        if height >= MAX_PLY {
            return self.evaluate();
        }
        self.clear_pv(height);
        self.seldepth = self.seldepth.max(height);

        if !is_root {
            // Step 2. Mate-distance pruning.
            alpha = alpha.max(-MATE + height as i32);
            beta = beta.min(MATE - height as i32 - 1);
            if alpha >= beta {
                return alpha;
            }

            // Steps 3-4. Fifty-move and repetition draws.
            if self.pos.is_draw(height) {
                return 0;
            }
        }

        let in_check = self.pos.in_check();

        // Step 5. Horizon: drop to quiescence unless a check extends us.
        if depth <= 0 {
            if !in_check {
                return self.qsearch(alpha, beta, height);
            }
            depth = 0;
        }

        // Step 6. This node counts.
        self.nodes += 1;

        // Transposition probe.
        let mut tt_move = NONE_MOVE;
        let mut tt_tactical = false;
        if let Some(entry) = self.shared.tt.get(self.pos.hash()) {
            tt_move = entry.best_move;
            tt_tactical = self.pos.is_tactical(tt_move);

            if !is_pv && entry.depth >= depth {
                let value = value_from_tt(entry.value, height);
                match entry.bound {
                    Bound::Exact => return value,
                    Bound::Lower => alpha = alpha.max(value),
                    Bound::Upper => beta = beta.min(value),
                }
                if alpha >= beta {
                    return value;
                }
            }
        }

        // Static evaluation feeds the whole pruning stack.
        let eval = if in_check { -VALUE_INFINITE } else { self.evaluate() };
        let futility_margin = eval + depth * FUTILITY_MARGIN_PER_DEPTH;

        if !is_pv && !in_check && !is_root {
            // Razoring: hopeless nodes get a verification qsearch.
            if depth <= RAZOR_DEPTH && eval + RAZOR_MARGINS[depth as usize] < alpha {
                if depth <= 1 {
                    return self.qsearch(alpha, beta, height);
                }
                let razor_alpha = alpha - RAZOR_MARGINS[depth as usize];
                let value = self.qsearch(razor_alpha, razor_alpha + 1, height);
                if value <= razor_alpha {
                    return value;
                }
            }

            // Reverse futility: eval is already a safe margin over beta.
            if depth <= BETA_PRUNING_DEPTH
                && self.pos.has_non_pawn_material(self.pos.side_to_move())
            {
                let value = eval - depth * FUTILITY_MARGIN_PER_DEPTH;
                if value > beta {
                    return value;
                }
            }

            // Null move: hand over the move and search reduced.
            if depth >= NULL_MOVE_DEPTH
                && eval >= beta
                && self.pos.has_non_pawn_material(self.pos.side_to_move())
                && (height == 0 || self.current_move[height - 1] != NULL_MOVE)
            {
                let r = (4 + depth / 6 + (eval - beta + 200) / 400).min(7);
                let undo = self.pos.apply_null();
                self.current_move[height] = NULL_MOVE;
                let value = -self.search(-beta, -beta + 1, depth - r, height + 1);
                self.pos.revert_null(undo);

                if value >= beta {
                    return if value >= MATE_IN_MAX { beta } else { value };
                }
            }
        }

        // Internal iterative deepening: find a hash move the cheap way.
        if is_pv && tt_move == NONE_MOVE && depth >= IID_DEPTH {
            self.search(alpha, beta, depth - 2, height);
            if let Some(entry) = self.shared.tt.get(self.pos.hash()) {
                tt_move = entry.best_move;
                tt_tactical = self.pos.is_tactical(tt_move);
            }
        }

        // Check extension.
        if in_check && !is_root && (is_pv || depth <= 6) {
            depth += 1;
        }

        // Move loop.
        let old_alpha = alpha;
        let mut best = -VALUE_INFINITE;
        let mut best_move = NONE_MOVE;
        let mut played = 0usize;
        let mut quiets_tried: [(Piece, Move); 64] = [(Piece::Pawn, NONE_MOVE); 64];
        let mut quiets_count = 0usize;

        let mut picker = MovePicker::new(tt_move, self.killers.get(height));
        while let Some(mv) = picker.next(&self.pos, &self.history) {
            let is_quiet = !self.pos.is_tactical(mv);

            // Futility: quiet moves cannot lift a hopeless static eval.
            if !is_pv
                && !in_check
                && is_quiet
                && played >= 1
                && depth <= FUTILITY_DEPTH
                && futility_margin <= alpha
            {
                continue;
            }

            let moving_piece = self.pos.piece_at(mv.from()).map(|(_, p)| p);
            let Some(undo) = self.pos.apply(mv) else {
                continue;
            };

            // Late-move pruning: enough quiets seen at shallow depth, and
            // this one does not give check.
            if !is_pv
                && !in_check
                && is_quiet
                && played >= 1
                && depth <= LMP_DEPTH
                && quiets_count > LMP_COUNTS[depth as usize]
                && !self.pos.in_check()
            {
                self.pos.revert(mv, undo);
                continue;
            }

            played += 1;
            if is_quiet && quiets_count < quiets_tried.len() {
                quiets_tried[quiets_count] =
                    (moving_piece.unwrap_or(Piece::Pawn), mv);
                quiets_count += 1;
            }
            self.current_move[height] = mv;

            // Late-move reductions for well-ordered quiet tails.
            let r = if played >= 4 && depth >= 3 && is_quiet {
                let mut r = 2
                    + (played as i32 - 4) / 8
                    + (depth - 4) / 6
                    + 2 * i32::from(!is_pv)
                    + i32::from(tt_tactical && best_move == tt_move);
                let hist = self.history.score(
                    self.pos.side_to_move().opponent(),
                    moving_piece.unwrap_or(Piece::Pawn),
                    mv,
                );
                r -= hist / 24;
                r.clamp(1, depth - 1)
            } else {
                1
            };

            let value = if played == 1 || !is_pv {
                let mut value = -self.search(-beta, -alpha, depth - r, height + 1);
                if value > alpha && r > 1 {
                    value = -self.search(-beta, -alpha, depth - 1, height + 1);
                }
                value
            } else {
                let mut value = -self.search(-alpha - 1, -alpha, depth - r, height + 1);
                if value > alpha {
                    value = -self.search(-beta, -alpha, depth - 1, height + 1);
                }
                value
            };

            self.pos.revert(mv, undo);

            if self.abort_state() != ABORT_NONE {
                return 0;
            }

            if value > best {
                best = value;
                best_move = mv;

                if value > alpha {
                    alpha = value;
                    self.update_pv(height, mv);

                    if alpha >= beta {
                        if is_quiet {
                            self.killers.update(height, mv);
                        }
                        break;
                    }
                }
            }
        }

        // No legal move: mate or stalemate.
        if played == 0 {
            return if in_check { -MATE + height as i32 } else { 0 };
        }

        // A quiet cutoff teaches the history table.
        if best >= beta && !self.pos.is_tactical(best_move) {
            self.history.reward_cutoff(
                self.pos.side_to_move(),
                &quiets_tried[..quiets_count],
                best_move,
                depth,
            );
        }

        let bound = if best >= beta {
            Bound::Lower
        } else if best > old_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.shared.tt.store(
            self.pos.hash(),
            best_move,
            value_to_tt(best, height),
            depth,
            bound,
        );

        best
    }

    /// Quiescence: run the tactical exchanges out past the horizon.
    pub(crate) fn qsearch(&mut self, mut alpha: i32, beta: i32, height: usize) -> i32 {
        if self.should_abort() {
            return 0;
        }
        if height >= MAX_PLY {
            return self.evaluate();
        }

        self.nodes += 1;
        self.seldepth = self.seldepth.max(height);
        self.clear_pv(height);

        let stand_pat = self.evaluate();
        let mut best = stand_pat;
        alpha = alpha.max(stand_pat);
        if alpha >= beta {
            return stand_pat;
        }

        // Delta pruning: even the best capture cannot reach alpha, and no
        // pawn is a move from promoting.
        let us = self.pos.side_to_move();
        if stand_pat + self.best_possible_gain() < alpha && !self.has_near_promotion(us) {
            return stand_pat;
        }

        let mut picker = MovePicker::new_quiescence();
        while let Some(mv) = picker.next(&self.pos, &self.history) {
            if self.is_losing_capture(mv) {
                continue;
            }

            let Some(undo) = self.pos.apply(mv) else {
                continue;
            };
            self.current_move[height] = mv;
            let value = -self.qsearch(-beta, -alpha, height + 1);
            self.pos.revert(mv, undo);

            if value > best {
                best = value;
                if value > alpha {
                    alpha = value;
                    self.update_pv(height, mv);
                    if alpha >= beta {
                        break;
                    }
                }
            }
        }

        best
    }

    #[inline]
    pub(crate) fn evaluate(&mut self) -> i32 {
        self.pos.evaluate(&mut self.pawn_king)
    }

    /// Most optimistic single-move swing: capturing the heaviest enemy
    /// piece, with a safety margin.
    fn best_possible_gain(&self) -> i32 {
        let them = self.pos.side_to_move().opponent();
        let heaviest = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight, Piece::Pawn]
            .into_iter()
            .find(|&piece| self.pos.bitboard(them, piece) != 0)
            .map_or(0, |piece| crate::board::SEE_VALUES[piece.index()]);
        heaviest + QS_DELTA_MARGIN
    }

    fn has_near_promotion(&self, us: Color) -> bool {
        use crate::board::bitboard::{RANK_2, RANK_7};
        let near = match us {
            Color::White => RANK_7,
            Color::Black => RANK_2,
        };
        self.pos.bitboard(us, Piece::Pawn) & near != 0
    }

    /// Exchange-light filter: a capture of a weaker piece, onto a square
    /// the opponent defends, with no second friendly attacker behind it.
    fn is_losing_capture(&self, mv: Move) -> bool {
        if mv.kind() != MoveKind::Normal {
            return false;
        }
        let Some((_, victim)) = self.pos.piece_at(mv.to()) else {
            return false;
        };
        let Some((us, attacker)) = self.pos.piece_at(mv.from()) else {
            return false;
        };
        if crate::board::SEE_VALUES[victim.index()]
            >= crate::board::SEE_VALUES[attacker.index()]
        {
            return false;
        }

        let occupied = self.pos.occupied() & !mv.from().bit();
        let defended = self.pos.attackers_to(mv.to(), occupied, us.opponent()) != 0;
        if !defended {
            return false;
        }
        let support = self.pos.attackers_to(mv.to(), occupied, us) & !mv.from().bit();
        support == 0
    }
}
