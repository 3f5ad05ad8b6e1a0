//! Engine facade: the interface the protocol front-end drives.
//!
//! Owns the position, the shared transposition table, and the settings a
//! GUI can change. `go` is synchronous; `stop` may be called from any
//! thread through the shared stop switch and takes effect within one
//! kernel poll interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::board::{FenError, MoveParseError, Position};
use crate::search::{smp_search, InfoCallback, Limits, SearchResult, TimeConfig};
use crate::tt::TranspositionTable;

/// Default transposition table size in MB.
pub const DEFAULT_HASH_MB: usize = 16;

pub struct Engine {
    pos: Position,
    tt: Arc<TranspositionTable>,
    stop: Arc<AtomicBool>,
    hash_mb: usize,
    threads: usize,
    chess960: bool,
    time_config: TimeConfig,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Engine {
            pos: Position::new(),
            tt: Arc::new(TranspositionTable::new(DEFAULT_HASH_MB)),
            stop: Arc::new(AtomicBool::new(false)),
            hash_mb: DEFAULT_HASH_MB,
            threads: 1,
            chess960: false,
            time_config: TimeConfig::default(),
        }
    }

    /// Forget everything learned from the previous game.
    pub fn new_game(&mut self) {
        #[cfg(feature = "logging")]
        log::info!("new game: clearing {} MB table", self.hash_mb);
        self.tt.clear();
        self.tt.new_search();
        self.set_startpos();
    }

    pub fn set_startpos(&mut self) {
        self.pos = Position::new();
        self.pos.set_chess960(self.chess960);
    }

    pub fn set_position(&mut self, fen: &str) -> Result<(), FenError> {
        let mut pos = Position::from_fen(fen)?;
        pos.set_chess960(self.chess960);
        self.pos = pos;
        Ok(())
    }

    /// Play a wire-format move onto the current position.
    pub fn apply_move(&mut self, uci: &str) -> Result<(), MoveParseError> {
        let mv = self.pos.parse_move(uci)?;
        // Moves from the GUI are legal by construction of parse_move.
        let _ = self.pos.apply(mv);
        Ok(())
    }

    #[must_use]
    pub fn position(&self) -> &Position {
        &self.pos
    }

    /// Search the current position under `limits` and return the best
    /// and ponder moves found.
    pub fn go(&mut self, limits: Limits, info: Option<InfoCallback>) -> SearchResult {
        #[cfg(feature = "logging")]
        log::debug!("go {:?} on {} threads", limits, self.threads);
        self.stop.store(false, Ordering::Relaxed);
        smp_search(
            &self.pos,
            &self.tt,
            self.threads,
            limits,
            &self.time_config,
            info,
            Arc::clone(&self.stop),
        )
    }

    /// Abort the search in flight, if any.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Switch another thread can use to stop a running `go`.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    // =========================================================================
    // Options
    // =========================================================================

    pub fn set_hash_mb(&mut self, mb: usize) {
        let mb = mb.max(1);
        if mb != self.hash_mb {
            self.hash_mb = mb;
            self.tt = Arc::new(TranspositionTable::new(mb));
        }
    }

    pub fn set_threads(&mut self, threads: usize) {
        self.threads = threads.max(1);
    }

    pub fn set_chess960(&mut self, enabled: bool) {
        self.chess960 = enabled;
        self.pos.set_chess960(enabled);
    }

    pub fn set_move_overhead(&mut self, ms: u64) {
        self.time_config.move_overhead_ms = ms;
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    #[must_use]
    pub fn hash_mb(&self) -> usize {
        self.hash_mb
    }

    #[must_use]
    pub fn chess960(&self) -> bool {
        self.chess960
    }

    #[must_use]
    pub fn transposition_table(&self) -> &Arc<TranspositionTable> {
        &self.tt
    }

    #[must_use]
    pub fn time_config(&self) -> &TimeConfig {
        &self.time_config
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}
