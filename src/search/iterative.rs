//! Iterative deepening controller.
//!
//! Every worker runs this loop; the Lazy SMP coordination step skews the
//! helpers to greater depths, and only the main thread reports info,
//! adapts the time budget, and decides termination. Aborted windows are
//! discarded; the last completed depth's result stands.

use std::sync::atomic::Ordering;

use crate::board::NONE_MOVE;

use super::constants::{
    ASPIRATION_MAX_MARGIN, ASPIRATION_MIN_DEPTH, MATE, MATE_IN_MAX, MAX_DEPTH, VALUE_INFINITE,
};
use super::{Limits, SearchInfo, SearchThread, ABORT_ALL, ABORT_DEPTH, ABORT_NONE};

/// Run the full deepening loop on one worker.
pub(crate) fn iterative_deepening(thread: &mut SearchThread) {
    let num_threads = thread.shared.aborts.len();
    let max_depth = match thread.shared.limits {
        Limits::Depth(d) => d.clamp(1, MAX_DEPTH),
        _ => MAX_DEPTH,
    };

    let mut completed = 0i32;
    let mut depth_times: Vec<u64> = Vec::new();

    loop {
        // Lazy SMP depth coordination: a helper whose next depth is
        // already covered by half the pool skips ahead and searches one
        // deeper instead. The main thread walks every depth in order.
        let depth = {
            let mut depths = thread.shared.depths.lock();
            let mut target = completed + 1;
            while thread.id != 0 && num_threads > 1 {
                let ahead = depths
                    .iter()
                    .enumerate()
                    .filter(|&(id, &d)| id != thread.id && d >= target)
                    .count();
                if 2 * ahead >= num_threads {
                    target += 1;
                } else {
                    break;
                }
            }
            depths[thread.id] = target;
            target
        };
        if depth > max_depth {
            break;
        }
        thread.depth = depth;

        let window_start = thread.shared.elapsed_ms();
        let value = aspiration_window(thread, depth);

        match thread.abort_state() {
            ABORT_ALL => break,
            ABORT_DEPTH => {
                // Drop the in-flight window and retry from coordination.
                thread.clear_depth_abort();
                continue;
            }
            _ => {}
        }

        let previous_score = thread.scores.last().copied();
        let previous_best = thread.best_moves.last().copied();

        let root_best = thread.root_pv().first().copied().unwrap_or(NONE_MOVE);
        thread.scores.push(value);
        thread.best_moves.push(root_best);
        thread.flush_nodes();
        completed = depth;
        depth_times.push(thread.shared.elapsed_ms() - window_start);

        // Peers still grinding a depth we just finished can move on.
        thread.shared.abort_peers_at_depth(thread.id, depth);

        if thread.id == 0 {
            report_iteration(thread, depth, value);
            adapt_time_budget(thread, value, previous_score, previous_best);
            if should_terminate(thread, depth, &depth_times) {
                thread.shared.abort_all();
                break;
            }
        }
    }

    thread.flush_nodes();
    if thread.id == 0 {
        thread.shared.abort_all();
    }
}

/// One aspiration-window search at `depth`, widening on failure.
fn aspiration_window(thread: &mut SearchThread, depth: i32) -> i32 {
    let mut alpha = -VALUE_INFINITE;
    let mut beta = VALUE_INFINITE;
    let mut margin = 0i32;

    // Seed a narrow window from the recent score volatility.
    if depth >= ASPIRATION_MIN_DEPTH {
        if let Some(&last) = thread.scores.last() {
            if last.abs() < MATE_IN_MAX {
                let delta = |back: usize| -> i32 {
                    let n = thread.scores.len();
                    if n > back {
                        (thread.scores[n - back] - thread.scores[n - back - 1]).abs()
                    } else {
                        0
                    }
                };
                margin = (delta(1) * 16 / 10)
                    .max(delta(2) * 2)
                    .max(delta(3) * 8 / 10)
                    .max(1);
                alpha = last - margin;
                beta = last + margin;
            }
        }
    }

    loop {
        let value = thread.search(alpha, beta, depth, 0);
        if thread.abort_state() != ABORT_NONE {
            return value;
        }
        if value > alpha && value < beta {
            return value;
        }

        // Mate scores get the full window straight away.
        if value.abs() >= MATE_IN_MAX {
            alpha = -MATE;
            beta = MATE;
            continue;
        }

        margin = (margin * 2).clamp(1, ASPIRATION_MAX_MARGIN);
        if margin >= ASPIRATION_MAX_MARGIN {
            alpha = -VALUE_INFINITE;
            beta = VALUE_INFINITE;
        } else {
            alpha = value - margin;
            beta = value + margin;
        }
    }
}

/// Emit a UCI info line through the callback.
fn report_iteration(thread: &mut SearchThread, depth: i32, value: i32) {
    let Some(callback) = thread.shared.info.clone() else {
        return;
    };

    let time_ms = thread.shared.elapsed_ms();
    let nodes = thread.shared.total_nodes.load(Ordering::Relaxed);
    let nps = if time_ms > 0 {
        nodes * 1000 / time_ms
    } else {
        0
    };
    let mate_in = if value.abs() < MATE_IN_MAX {
        None
    } else if value > 0 {
        Some((MATE - value + 1) / 2)
    } else {
        Some(-(MATE + value + 1) / 2)
    };
    let pv = thread
        .root_pv()
        .iter()
        .map(|&mv| thread.pos.move_to_uci(mv))
        .collect::<Vec<_>>()
        .join(" ");

    callback(&SearchInfo {
        depth,
        seldepth: thread.seldepth,
        nodes,
        nps,
        time_ms,
        hashfull: thread.shared.tt.hashfull(),
        score: value,
        mate_in,
        pv,
    });
}

/// Stretch the ideal budget when the iteration looks unstable.
fn adapt_time_budget(
    thread: &SearchThread,
    value: i32,
    previous_score: Option<i32>,
    previous_best: Option<crate::board::Move>,
) {
    if !matches!(thread.shared.limits, Limits::SelfClock { .. }) {
        return;
    }
    let budget = &thread.shared.budget;
    let max_usage = budget.max_usage.load(Ordering::Relaxed);
    let mut ideal = budget.ideal_usage.load(Ordering::Relaxed);

    if previous_score.is_some_and(|prev| value <= prev - 8) {
        ideal = ideal.saturating_mul(110) / 100;
    }
    let best = thread.best_moves.last().copied();
    if previous_best.is_some() && best != previous_best {
        ideal = ideal.saturating_mul(135) / 100;
    }

    budget
        .ideal_usage
        .store(ideal.min(max_usage), Ordering::Relaxed);
}

/// Main-thread termination decisions after a completed depth.
fn should_terminate(thread: &SearchThread, depth: i32, depth_times: &[u64]) -> bool {
    let shared = &thread.shared;
    let elapsed = shared.elapsed_ms();

    if let Limits::Depth(limit) = shared.limits {
        if depth >= limit {
            return true;
        }
    }
    if depth >= MAX_DEPTH {
        return true;
    }
    if elapsed >= shared.budget.time_limit.load(Ordering::Relaxed) {
        return true;
    }

    let max_usage = shared.budget.max_usage.load(Ordering::Relaxed);
    if elapsed >= max_usage {
        return true;
    }
    if elapsed >= shared.budget.ideal_usage.load(Ordering::Relaxed) {
        return true;
    }

    // Project the next depth from the growth of the last two; if it
    // cannot complete inside the hard budget, stop now.
    if depth_times.len() >= 2 && max_usage != u64::MAX {
        let last = depth_times[depth_times.len() - 1];
        let previous = depth_times[depth_times.len() - 2];
        if last > 0 && previous > 0 {
            let growth = last as f64 / previous as f64;
            let projected = elapsed as f64 + last as f64 * (growth + 0.25);
            if projected > max_usage as f64 {
                return true;
            }
        }
    }

    false
}
