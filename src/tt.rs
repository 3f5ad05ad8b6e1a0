//! Shared transposition table.
//!
//! The table is read and written by every search thread without locks.
//! Each entry packs into a single `u64` held in an `AtomicU64`, so a
//! reader sees either the old or the new entry, never a torn one. The
//! upper 16 bits of the position hash validate a probe; everything else
//! about the table is a probabilistic cache and may be wrong, stale, or
//! evicted at any time - callers re-validate hash moves before use.
//!
//! Entry layout (low to high bits):
//! - 16 bits: upper 16 bits of the position hash
//! - 16 bits: best move
//! - 16 bits: value (i16)
//! -  8 bits: depth
//! -  8 bits: info = (generation << 2) | bound kind
//!
//! A bucket is four entries on one 32-byte boundary.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::board::{Move, MAX_PLY};
use crate::search::constants::MATE;

/// How a stored value bounds the true score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    /// Exact value (PV node)
    Exact,
    /// Lower bound (fail high)
    Lower,
    /// Upper bound (fail low)
    Upper,
}

const BOUND_EMPTY: u8 = 0;
const BOUND_EXACT: u8 = 1;
const BOUND_LOWER: u8 = 2;
const BOUND_UPPER: u8 = 3;

const GENERATION_CYCLE: u8 = 64;

impl Bound {
    fn to_bits(self) -> u8 {
        match self {
            Bound::Exact => BOUND_EXACT,
            Bound::Lower => BOUND_LOWER,
            Bound::Upper => BOUND_UPPER,
        }
    }

    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            BOUND_EXACT => Some(Bound::Exact),
            BOUND_LOWER => Some(Bound::Lower),
            BOUND_UPPER => Some(Bound::Upper),
            _ => None,
        }
    }
}

/// Decoded copy of a table entry.
#[derive(Clone, Copy, Debug)]
pub struct TTEntry {
    pub best_move: Move,
    pub value: i32,
    pub depth: i32,
    pub bound: Bound,
}

#[derive(Clone, Copy)]
struct Packed {
    hash16: u16,
    mv: u16,
    value: i16,
    depth: u8,
    info: u8,
}

impl Packed {
    #[inline]
    fn encode(self) -> u64 {
        u64::from(self.hash16)
            | (u64::from(self.mv) << 16)
            | (u64::from(self.value as u16) << 32)
            | (u64::from(self.depth) << 48)
            | (u64::from(self.info) << 56)
    }

    #[inline]
    fn decode(bits: u64) -> Self {
        Packed {
            hash16: bits as u16,
            mv: (bits >> 16) as u16,
            value: (bits >> 32) as u16 as i16,
            depth: (bits >> 48) as u8,
            info: (bits >> 56) as u8,
        }
    }

    #[inline]
    fn bound_bits(self) -> u8 {
        self.info & 0x3
    }

    #[inline]
    fn generation(self) -> u8 {
        self.info >> 2
    }
}

#[repr(align(32))]
struct Bucket([AtomicU64; 4]);

pub struct TranspositionTable {
    buckets: Vec<Bucket>,
    mask: usize,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Allocate the largest power-of-two bucket count whose 32-byte
    /// buckets fit in `size_mb` megabytes.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        let bucket_size = std::mem::size_of::<Bucket>();
        let mut num_buckets = (size_mb.max(1) * 1024 * 1024) / bucket_size;
        num_buckets = (num_buckets + 1).next_power_of_two() / 2;
        if num_buckets == 0 {
            num_buckets = 1024;
        }

        let mut buckets = Vec::with_capacity(num_buckets);
        buckets.resize_with(num_buckets, || Bucket(Default::default()));

        TranspositionTable {
            buckets,
            mask: num_buckets - 1,
            generation: AtomicU8::new(0),
        }
    }

    #[inline]
    fn bucket(&self, hash: u64) -> &Bucket {
        &self.buckets[(hash as usize) & self.mask]
    }

    #[inline]
    fn current_generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Bump the generation counter at the start of a new search.
    pub fn new_search(&self) {
        let next = (self.current_generation() + 1) % GENERATION_CYCLE;
        self.generation.store(next, Ordering::Relaxed);
    }

    /// Zero every entry and reset the generation.
    pub fn clear(&self) {
        for bucket in &self.buckets {
            for slot in &bucket.0 {
                slot.store(0, Ordering::Relaxed);
            }
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Probe for `hash`. On a hit the entry's generation is refreshed so
    /// age-based replacement keeps it around.
    #[must_use]
    pub fn get(&self, hash: u64) -> Option<TTEntry> {
        let hash16 = (hash >> 48) as u16;
        let bucket = self.bucket(hash);

        for slot in &bucket.0 {
            let bits = slot.load(Ordering::Relaxed);
            let packed = Packed::decode(bits);
            if packed.hash16 != hash16 {
                continue;
            }
            let bound = Bound::from_bits(packed.bound_bits())?;

            let gen = self.current_generation();
            if packed.generation() != gen {
                let refreshed = Packed {
                    info: (gen << 2) | packed.bound_bits(),
                    ..packed
                };
                slot.store(refreshed.encode(), Ordering::Relaxed);
            }

            return Some(TTEntry {
                best_move: Move::from_u16(packed.mv),
                value: i32::from(packed.value),
                depth: i32::from(packed.depth),
                bound,
            });
        }
        None
    }

    /// Store an entry, replacing within the bucket by preference: an empty
    /// slot, then the same position, then the shallowest entry with age
    /// discounted (each generation of age costs two plies of depth).
    pub fn store(&self, hash: u64, best_move: Move, value: i32, depth: i32, bound: Bound) {
        let hash16 = (hash >> 48) as u16;
        let bucket = self.bucket(hash);
        let gen = self.current_generation();

        let mut victim = 0;
        let mut victim_priority = i32::MAX;

        for (idx, slot) in bucket.0.iter().enumerate() {
            let packed = Packed::decode(slot.load(Ordering::Relaxed));
            if packed.bound_bits() == BOUND_EMPTY || packed.hash16 == hash16 {
                victim = idx;
                break;
            }
            let age =
                i32::from((GENERATION_CYCLE + gen - packed.generation()) % GENERATION_CYCLE);
            let priority = i32::from(packed.depth) - 2 * age;
            if priority < victim_priority {
                victim = idx;
                victim_priority = priority;
            }
        }

        let packed = Packed {
            hash16,
            mv: best_move.as_u16(),
            value: value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16,
            depth: depth.clamp(0, 255) as u8,
            info: (gen << 2) | bound.to_bits(),
        };
        bucket.0[victim].store(packed.encode(), Ordering::Relaxed);
    }

    /// Per-mille occupancy, sampled over the first 1250 buckets.
    #[must_use]
    pub fn hashfull(&self) -> u32 {
        let sample = self.buckets.len().min(1250);
        let mut used = 0u32;
        for bucket in &self.buckets[..sample] {
            for slot in &bucket.0 {
                if Packed::decode(slot.load(Ordering::Relaxed)).bound_bits() != BOUND_EMPTY {
                    used += 1;
                }
            }
        }
        used * 1000 / (sample as u32 * 4)
    }
}

// =========================================================================
// Mate score plumbing
// =========================================================================

/// Fold the root distance out of a mate score so the stored value is
/// relative to the entry's own position.
#[inline]
#[must_use]
pub fn value_to_tt(value: i32, height: usize) -> i32 {
    if value >= MATE - MAX_PLY as i32 {
        value + height as i32
    } else if value <= -MATE + MAX_PLY as i32 {
        value - height as i32
    } else {
        value
    }
}

/// Inverse of `value_to_tt` at probe time.
#[inline]
#[must_use]
pub fn value_from_tt(value: i32, height: usize) -> i32 {
    if value >= MATE - MAX_PLY as i32 {
        value - height as i32
    } else if value <= -MATE + MAX_PLY as i32 {
        value + height as i32
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Move, Square};

    fn mv(a: usize, b: usize) -> Move {
        Move::normal(Square::from_index(a), Square::from_index(b))
    }

    #[test]
    fn store_then_get_round_trips() {
        let tt = TranspositionTable::new(1);
        let hash = 0xABCD_EF01_2345_6789;
        tt.store(hash, mv(12, 28), 153, 9, Bound::Exact);

        let entry = tt.get(hash).expect("entry present");
        assert_eq!(entry.best_move, mv(12, 28));
        assert_eq!(entry.value, 153);
        assert_eq!(entry.depth, 9);
        assert_eq!(entry.bound, Bound::Exact);
    }

    #[test]
    fn mismatched_hash16_misses() {
        let tt = TranspositionTable::new(1);
        let a = 0x1111_0000_0000_0042;
        let b = 0x2222_0000_0000_0042; // same bucket, different tag
        tt.store(a, mv(1, 2), 5, 3, Bound::Lower);
        assert!(tt.get(b).is_none());
    }

    #[test]
    fn same_position_is_overwritten_in_place() {
        let tt = TranspositionTable::new(1);
        let hash = 0x4242_4242_4242_4242;
        tt.store(hash, mv(1, 2), 10, 3, Bound::Upper);
        tt.store(hash, mv(3, 4), 20, 5, Bound::Exact);

        let entry = tt.get(hash).unwrap();
        assert_eq!(entry.best_move, mv(3, 4));
        assert_eq!(entry.depth, 5);
    }

    #[test]
    fn shallow_old_entries_are_evicted_first() {
        let tt = TranspositionTable::new(1);
        // Five distinct tags landing in the same bucket.
        let hashes: Vec<u64> = (1u64..=5).map(|tag| (tag << 48) | 0x77).collect();

        tt.store(hashes[0], mv(1, 2), 0, 2, Bound::Exact); // shallowest
        for (i, &h) in hashes[1..4].iter().enumerate() {
            tt.store(h, mv(1, 2), 0, 10 + i as i32, Bound::Exact);
        }
        tt.store(hashes[4], mv(5, 6), 0, 7, Bound::Exact);

        assert!(tt.get(hashes[0]).is_none(), "shallow entry evicted");
        assert!(tt.get(hashes[4]).is_some());
        for &h in &hashes[1..4] {
            assert!(tt.get(h).is_some(), "deep entries kept");
        }
    }

    #[test]
    fn hashfull_grows_with_stores() {
        let tt = TranspositionTable::new(1);
        assert_eq!(tt.hashfull(), 0);
        for i in 0..2000u64 {
            tt.store(i.wrapping_mul(0x9E37_79B9_7F4A_7C15), mv(1, 2), 0, 1, Bound::Exact);
        }
        assert!(tt.hashfull() > 0);
    }

    #[test]
    fn generation_wraps_within_six_bits() {
        let tt = TranspositionTable::new(1);
        for _ in 0..70 {
            tt.new_search();
        }
        assert!(tt.current_generation() < 64);
    }

    #[test]
    fn mate_values_are_height_relative() {
        for height in [0usize, 1, 5, 63, 127] {
            for value in [MATE - 3, MATE - 90, -MATE + 4, 250, -250, 0] {
                assert_eq!(value_from_tt(value_to_tt(value, height), height), value);
            }
        }
    }

    #[test]
    fn clear_empties_the_table() {
        let tt = TranspositionTable::new(1);
        let hash = 0x5555_0000_0000_0001;
        tt.store(hash, mv(1, 2), 1, 1, Bound::Exact);
        tt.clear();
        assert!(tt.get(hash).is_none());
        assert_eq!(tt.hashfull(), 0);
    }
}
