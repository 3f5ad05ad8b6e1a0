//! Alpha-beta search: kernel, iterative-deepening controller, and the
//! Lazy SMP thread pool.
//!
//! Features:
//! - Iterative deepening with delta-tracked aspiration windows
//! - Negamax alpha-beta with mate-distance, razoring, reverse-futility,
//!   null-move, futility, and late-move pruning, plus late-move reductions
//! - Quiescence search with delta pruning and a light exchange filter
//! - Staged move ordering (hash move, MVV/LVA, killers, history)
//! - Shared lock-free transposition table across threads
//! - Cooperative cancellation by wall clock and peer depth coordination

mod alphabeta;
pub mod constants;
mod history;
mod iterative;
mod picker;
mod smp;
mod time;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::board::{Move, Position, MAX_PLY, NONE_MOVE};
use crate::pawn_king::PawnKingTable;
use crate::tt::TranspositionTable;

pub use history::{HistoryTable, KillerTable};
pub use picker::MovePicker;
pub use smp::smp_search;
pub use time::TimeConfig;

/// What bounds a `go` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Limits {
    /// Search until told to stop.
    #[default]
    Infinite,
    /// Search exactly to this depth.
    Depth(i32),
    /// Spend exactly this many milliseconds.
    MoveTime(u64),
    /// Manage a game clock ourselves.
    SelfClock {
        time_ms: u64,
        inc_ms: u64,
        moves_to_go: Option<u64>,
    },
}

/// Per-thread abort states. Plain relaxed words: a stale read only delays
/// termination by one poll interval.
pub(crate) const ABORT_NONE: u8 = 0;
pub(crate) const ABORT_DEPTH: u8 = 1;
pub(crate) const ABORT_ALL: u8 = 2;

/// One completed-iteration report for the UCI front-end.
#[derive(Debug, Clone)]
pub struct SearchInfo {
    pub depth: i32,
    pub seldepth: usize,
    pub nodes: u64,
    pub nps: u64,
    pub time_ms: u64,
    pub hashfull: u32,
    pub score: i32,
    pub mate_in: Option<i32>,
    pub pv: String,
}

/// Callback invoked by the main thread after each completed window.
pub type InfoCallback = Arc<dyn Fn(&SearchInfo) + Send + Sync>;

/// Final result of a search.
#[derive(Debug, Clone, Copy)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
    pub value: i32,
    pub depth: i32,
}

/// Time budget in milliseconds, written by the main thread's adaptive
/// logic and read by every worker poll. Single producer, tear-tolerant
/// readers.
pub(crate) struct TimeBudget {
    pub(crate) ideal_usage: AtomicU64,
    pub(crate) max_usage: AtomicU64,
    pub(crate) time_limit: AtomicU64,
}

/// State shared by the whole pool for the lifetime of one `go`.
pub(crate) struct SharedSearch {
    pub(crate) tt: Arc<TranspositionTable>,
    pub(crate) aborts: Vec<AtomicU8>,
    /// Current iteration depth per thread, behind the coordination lock.
    pub(crate) depths: Mutex<Vec<i32>>,
    pub(crate) start: Instant,
    pub(crate) budget: TimeBudget,
    pub(crate) limits: Limits,
    pub(crate) total_nodes: AtomicU64,
    pub(crate) info: Option<InfoCallback>,
    /// The UCI `stop` switch, polled alongside the clock.
    pub(crate) external_stop: Arc<AtomicBool>,
}

impl SharedSearch {
    pub(crate) fn new(
        tt: Arc<TranspositionTable>,
        num_threads: usize,
        limits: Limits,
        budget: TimeBudget,
        info: Option<InfoCallback>,
        external_stop: Arc<AtomicBool>,
    ) -> Self {
        SharedSearch {
            tt,
            aborts: (0..num_threads).map(|_| AtomicU8::new(ABORT_NONE)).collect(),
            depths: Mutex::new(vec![0; num_threads]),
            start: Instant::now(),
            budget,
            limits,
            total_nodes: AtomicU64::new(0),
            info,
            external_stop,
        }
    }

    #[inline]
    pub(crate) fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Terminate every worker.
    pub(crate) fn abort_all(&self) {
        for abort in &self.aborts {
            abort.store(ABORT_ALL, Ordering::Relaxed);
        }
    }

    /// Ask peers still at or below `depth` to wrap up their iteration.
    pub(crate) fn abort_peers_at_depth(&self, completer: usize, depth: i32) {
        let depths = self.depths.lock();
        for (id, abort) in self.aborts.iter().enumerate() {
            if id != completer && depths[id] <= depth {
                let _ = abort.compare_exchange(
                    ABORT_NONE,
                    ABORT_DEPTH,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                );
            }
        }
    }
}

/// One searcher: its own position copy, move-ordering tables, pawn-king
/// cache, and PV buffers. Only the transposition table is shared.
pub(crate) struct SearchThread {
    pub(crate) id: usize,
    pub(crate) pos: Position,
    pub(crate) shared: Arc<SharedSearch>,
    pub(crate) pawn_king: PawnKingTable,
    pub(crate) history: HistoryTable,
    pub(crate) killers: KillerTable,
    pub(crate) nodes: u64,
    nodes_flushed: u64,
    pub(crate) seldepth: usize,
    pub(crate) depth: i32,
    /// Triangular PV buffers, one line per height.
    pv_moves: Box<[[Move; MAX_PLY]; MAX_PLY]>,
    pv_lens: [usize; MAX_PLY],
    /// Move applied at each height on the current path; `NULL_MOVE` marks
    /// a null-move frame.
    pub(crate) current_move: [Move; MAX_PLY],
    /// Scores of completed iterations, for aspiration margins.
    pub(crate) scores: Vec<i32>,
    /// Best root move per completed iteration.
    pub(crate) best_moves: Vec<Move>,
}

impl SearchThread {
    pub(crate) fn new(id: usize, pos: Position, shared: Arc<SharedSearch>) -> Self {
        SearchThread {
            id,
            pos,
            shared,
            pawn_king: PawnKingTable::new(),
            history: HistoryTable::new(),
            killers: KillerTable::new(),
            nodes: 0,
            nodes_flushed: 0,
            seldepth: 0,
            depth: 0,
            pv_moves: Box::new([[NONE_MOVE; MAX_PLY]; MAX_PLY]),
            pv_lens: [0; MAX_PLY],
            current_move: [NONE_MOVE; MAX_PLY],
            scores: Vec::new(),
            best_moves: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn abort_state(&self) -> u8 {
        self.shared.aborts[self.id].load(Ordering::Relaxed)
    }

    /// Acknowledge a depth abort. A concurrent `ABORT_ALL` must win, so
    /// only the depth state is cleared.
    pub(crate) fn clear_depth_abort(&self) {
        let _ = self.shared.aborts[self.id].compare_exchange(
            ABORT_DEPTH,
            ABORT_NONE,
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
    }

    /// Fold locally counted nodes into the pool-wide counter.
    pub(crate) fn flush_nodes(&mut self) {
        let delta = self.nodes - self.nodes_flushed;
        if delta > 0 {
            self.shared.total_nodes.fetch_add(delta, Ordering::Relaxed);
            self.nodes_flushed = self.nodes;
        }
    }

    #[inline]
    pub(crate) fn clear_pv(&mut self, height: usize) {
        self.pv_lens[height] = 0;
    }

    /// Prepend `mv` to the child line one height down.
    pub(crate) fn update_pv(&mut self, height: usize, mv: Move) {
        let child_len = if height + 1 < MAX_PLY {
            self.pv_lens[height + 1]
        } else {
            0
        };
        self.pv_moves[height][0] = mv;
        if child_len > 0 {
            let (line, child) = {
                let (a, b) = self.pv_moves.split_at_mut(height + 1);
                (&mut a[height], &b[0])
            };
            line[1..=child_len].copy_from_slice(&child[..child_len]);
        }
        self.pv_lens[height] = child_len + 1;
    }

    /// The root principal variation from the last completed window.
    pub(crate) fn root_pv(&self) -> &[Move] {
        &self.pv_moves[0][..self.pv_lens[0]]
    }

    pub(crate) fn root_best_move(&self) -> Option<Move> {
        self.best_moves.last().copied().filter(|&mv| mv != NONE_MOVE)
    }
}
