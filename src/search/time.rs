//! Time budget computation.
//!
//! Turns a `go` limit into the pair the pool polls against: an ideal
//! usage the controller aims to stay under, and a max usage no thread may
//! exceed. Self-managed clocks also get panic handling when the flag is
//! nearly down.

use std::sync::atomic::AtomicU64;

use super::{Limits, TimeBudget};

/// Default moves-to-go estimate when the GUI does not send one.
const DEFAULT_MOVES_TO_GO: u64 = 30;

/// Remaining time below which we enter panic mode (ms).
const PANIC_THRESHOLD_MS: u64 = 5000;

/// Safety margin added to overhead for critical time detection.
const CRITICAL_TIME_MARGIN_MS: u64 = 50;

/// Knobs for time allocation.
#[derive(Debug, Clone, Copy)]
pub struct TimeConfig {
    /// Reserved per move for communication latency.
    pub move_overhead_ms: u64,
    /// Percentage of remaining time the ideal budget may reach.
    pub ideal_percent: u64,
    /// Percentage of remaining time the hard budget may reach.
    pub max_percent: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        TimeConfig {
            move_overhead_ms: 50,
            ideal_percent: 10,
            max_percent: 25,
        }
    }
}

/// Compute the budget for one `go`.
pub(crate) fn compute_budget(limits: Limits, config: &TimeConfig) -> TimeBudget {
    let (ideal, max, limit) = match limits {
        Limits::Infinite | Limits::Depth(_) => (u64::MAX, u64::MAX, u64::MAX),
        Limits::MoveTime(ms) => {
            let ms = ms.max(1);
            (u64::MAX, ms, ms)
        }
        Limits::SelfClock {
            time_ms,
            inc_ms,
            moves_to_go,
        } => {
            let (ideal, max) = self_clock_budget(time_ms, inc_ms, moves_to_go, config);
            (ideal, max, u64::MAX)
        }
    };

    TimeBudget {
        ideal_usage: AtomicU64::new(ideal),
        max_usage: AtomicU64::new(max),
        time_limit: AtomicU64::new(limit),
    }
}

fn self_clock_budget(
    time_ms: u64,
    inc_ms: u64,
    moves_to_go: Option<u64>,
    config: &TimeConfig,
) -> (u64, u64) {
    let safe_ms = time_ms.saturating_sub(config.move_overhead_ms);

    // Critical: barely more than the overhead itself remains.
    if time_ms <= config.move_overhead_ms + CRITICAL_TIME_MARGIN_MS {
        let fallback = (time_ms / 2).max(1);
        return (fallback, fallback);
    }

    // Panic: very low clock, spend a sliver plus the increment.
    if safe_ms < PANIC_THRESHOLD_MS {
        let ideal = (safe_ms / 20 + inc_ms).min(safe_ms / 4).max(1);
        let max = (safe_ms / 3).max(ideal);
        return (ideal, max);
    }

    let moves_to_go = moves_to_go.unwrap_or(DEFAULT_MOVES_TO_GO).max(1);
    let base = safe_ms / moves_to_go + inc_ms;

    let ideal_cap = safe_ms * config.ideal_percent / 100;
    let max_cap = safe_ms * config.max_percent / 100;

    let ideal = base.min(ideal_cap).max(1);
    let max = (base * 3).min(max_cap).max(ideal);
    (ideal, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn load(budget: &TimeBudget) -> (u64, u64, u64) {
        (
            budget.ideal_usage.load(Ordering::Relaxed),
            budget.max_usage.load(Ordering::Relaxed),
            budget.time_limit.load(Ordering::Relaxed),
        )
    }

    #[test]
    fn infinite_and_depth_are_unbounded() {
        let config = TimeConfig::default();
        for limits in [Limits::Infinite, Limits::Depth(12)] {
            let (ideal, max, limit) = load(&compute_budget(limits, &config));
            assert_eq!((ideal, max, limit), (u64::MAX, u64::MAX, u64::MAX));
        }
    }

    #[test]
    fn movetime_caps_the_hard_budget() {
        let budget = compute_budget(Limits::MoveTime(750), &TimeConfig::default());
        let (ideal, max, limit) = load(&budget);
        assert_eq!(max, 750);
        assert_eq!(limit, 750);
        assert_eq!(ideal, u64::MAX);
    }

    #[test]
    fn self_clock_is_a_fraction_of_remaining() {
        let budget = compute_budget(
            Limits::SelfClock {
                time_ms: 300_000,
                inc_ms: 2000,
                moves_to_go: None,
            },
            &TimeConfig::default(),
        );
        let (ideal, max, _) = load(&budget);
        assert!(ideal > 0 && ideal < 300_000);
        assert!(max >= ideal && max < 300_000);
    }

    #[test]
    fn moves_to_go_splits_evenly() {
        let budget = compute_budget(
            Limits::SelfClock {
                time_ms: 60_000,
                inc_ms: 0,
                moves_to_go: Some(10),
            },
            &TimeConfig::default(),
        );
        let (ideal, _, _) = load(&budget);
        assert!(ideal <= 6_000);
        assert!(ideal > 0);
    }

    #[test]
    fn nearly_flagged_clock_still_gets_a_budget() {
        let budget = compute_budget(
            Limits::SelfClock {
                time_ms: 80,
                inc_ms: 0,
                moves_to_go: None,
            },
            &TimeConfig::default(),
        );
        let (ideal, max, _) = load(&budget);
        assert!(ideal >= 1);
        assert!(max >= ideal);
        assert!(max <= 80);
    }

    #[test]
    fn panic_mode_spends_a_sliver() {
        let budget = compute_budget(
            Limits::SelfClock {
                time_ms: 3000,
                inc_ms: 0,
                moves_to_go: None,
            },
            &TimeConfig::default(),
        );
        let (ideal, max, _) = load(&budget);
        assert!(ideal < 1000);
        assert!(max <= 1000);
    }
}
