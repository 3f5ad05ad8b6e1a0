//! Pawn-king hash table.
//!
//! Pawn structure and king shelter only depend on pawn and king placement,
//! so their evaluation is cached under the pawn-king Zobrist hash. Each
//! search thread owns its table, so probes and stores need no
//! synchronisation. Entries are validated by a full-hash match; an index
//! collision simply misses.

/// Entry slots: indexed by the top 16 bits of the pawn-king hash.
const TABLE_SIZE: usize = 1 << 16;

#[derive(Clone, Copy)]
struct PawnKingEntry {
    pk_hash: u64,
    /// Passed pawns of both colours, for terms that depend on the rest
    /// of the board and are computed outside the cache.
    passed: u64,
    /// Packed (mg, eg) structure score, white-positive.
    eval: i32,
}

pub struct PawnKingTable {
    entries: Vec<PawnKingEntry>,
}

impl PawnKingTable {
    #[must_use]
    pub fn new() -> Self {
        PawnKingTable {
            entries: vec![
                PawnKingEntry {
                    pk_hash: 0,
                    passed: 0,
                    eval: 0,
                };
                TABLE_SIZE
            ],
        }
    }

    #[inline]
    fn index(pk_hash: u64) -> usize {
        (pk_hash >> 48) as usize
    }

    /// Look up `(passed_bitboard, packed_eval)` for a pawn-king hash.
    #[must_use]
    pub fn get(&self, pk_hash: u64) -> Option<(u64, i32)> {
        let entry = &self.entries[Self::index(pk_hash)];
        (entry.pk_hash == pk_hash && pk_hash != 0).then_some((entry.passed, entry.eval))
    }

    pub fn store(&mut self, pk_hash: u64, passed: u64, eval: i32) {
        self.entries[Self::index(pk_hash)] = PawnKingEntry {
            pk_hash,
            passed,
            eval,
        };
    }

    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.pk_hash = 0;
            entry.passed = 0;
            entry.eval = 0;
        }
    }
}

impl Default for PawnKingTable {
    fn default() -> Self {
        PawnKingTable::new()
    }
}
