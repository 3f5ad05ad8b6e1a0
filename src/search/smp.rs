//! Lazy SMP thread pool.
//!
//! Workers search the same position independently, sharing only the
//! transposition table, the abort words, and the time budget. Helpers
//! skew to greater depths via the coordination step in the deepening
//! loop, and their discoveries flow back to the main thread through the
//! table. The pool lives for exactly one `go`.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use crate::board::{Move, Position};
use crate::tt::TranspositionTable;

use super::iterative::iterative_deepening;
use super::time::{compute_budget, TimeConfig};
use super::{InfoCallback, Limits, SearchResult, SearchThread, SharedSearch};

/// Worker stack size; the kernel recursion is deep.
const SEARCH_STACK_SIZE: usize = 16 * 1024 * 1024;

struct WorkerOutcome {
    id: usize,
    best_move: Option<Move>,
    value: i32,
    depth: i32,
}

/// Run one search over `num_threads` workers and return the pool's answer.
pub fn smp_search(
    pos: &Position,
    tt: &Arc<TranspositionTable>,
    num_threads: usize,
    limits: Limits,
    time_config: &TimeConfig,
    info: Option<InfoCallback>,
    stop: Arc<AtomicBool>,
) -> SearchResult {
    let num_threads = num_threads.max(1);
    tt.new_search();

    let shared = Arc::new(SharedSearch::new(
        Arc::clone(tt),
        num_threads,
        limits,
        compute_budget(limits, time_config),
        info,
        stop,
    ));

    let mut outcomes: Vec<WorkerOutcome> = Vec::with_capacity(num_threads);

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(num_threads);
        for id in 0..num_threads {
            let shared = Arc::clone(&shared);
            let pos = pos.clone();
            let handle = thread::Builder::new()
                .name(format!("search-{id}"))
                .stack_size(SEARCH_STACK_SIZE)
                .spawn_scoped(scope, move || {
                    let mut worker = SearchThread::new(id, pos, shared);
                    iterative_deepening(&mut worker);
                    WorkerOutcome {
                        id,
                        best_move: worker.root_best_move(),
                        value: worker.scores.last().copied().unwrap_or(0),
                        depth: worker.depth,
                    }
                })
                .expect("failed to spawn search worker");
            handles.push(handle);
        }
        for handle in handles {
            if let Ok(outcome) = handle.join() {
                outcomes.push(outcome);
            }
        }
    });

    // The main worker's last completed depth is the answer; helpers only
    // stand in if it somehow never finished a window.
    let main = outcomes
        .iter()
        .find(|o| o.id == 0 && o.best_move.is_some());
    let chosen = main.or_else(|| {
        outcomes
            .iter()
            .filter(|o| o.best_move.is_some())
            .max_by_key(|o| o.depth)
    });

    let best_move = chosen.and_then(|o| o.best_move);
    let value = chosen.map_or(0, |o| o.value);
    let depth = chosen.map_or(0, |o| o.depth);

    // Expected reply for pondering, straight from the table.
    let ponder_move = best_move.and_then(|mv| extract_ponder_move(pos, tt, mv));

    SearchResult {
        best_move,
        ponder_move,
        value,
        depth,
    }
}

/// Apply the best move and probe the table for a legal reply.
fn extract_ponder_move(
    pos: &Position,
    tt: &TranspositionTable,
    best_move: Move,
) -> Option<Move> {
    let mut scratch = pos.clone();
    let undo = scratch.apply(best_move)?;
    let ponder = tt
        .get(scratch.hash())
        .map(|entry| entry.best_move)
        .filter(|&mv| scratch.legal_moves().contains(mv));
    scratch.revert(best_move, undo);
    ponder
}
